//! Candidate sets and the selection filter.

use std::collections::HashSet;

use flotilla_runtime::backend::ContainerSummary;

/// An ordered, ID-unique sequence of containers.
///
/// Order is discovery order; it carries no meaning for execution but fixes
/// which failure is reported when several containers fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Containers(Vec<ContainerSummary>);

impl Containers {
    /// Builds a set, keeping the first occurrence of each ID.
    #[must_use]
    pub fn new(containers: Vec<ContainerSummary>) -> Self {
        containers.into_iter().collect()
    }

    /// Keeps the containers matching `predicate`.
    #[must_use]
    pub fn filter(self, predicate: impl Fn(&ContainerSummary) -> bool) -> Self {
        Self(self.0.into_iter().filter(|c| predicate(c)).collect())
    }

    /// Returns canonical names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(canonical_name).collect()
    }

    /// Returns the number of containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, ContainerSummary> {
        self.0.iter()
    }

    /// Consumes the set, returning the underlying vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<ContainerSummary> {
        self.0
    }
}

impl FromIterator<ContainerSummary> for Containers {
    fn from_iter<T: IntoIterator<Item = ContainerSummary>>(iter: T) -> Self {
        let mut seen = HashSet::new();
        Self(
            iter.into_iter()
                .filter(|c| seen.insert(c.id.clone()))
                .collect(),
        )
    }
}

impl IntoIterator for Containers {
    type Item = ContainerSummary;
    type IntoIter = std::vec::IntoIter<ContainerSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Containers {
    type Item = &'a ContainerSummary;
    type IntoIter = std::slice::Iter<'a, ContainerSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Predicate matching containers whose service is one of `services`.
///
/// An empty list matches everything.
pub fn is_service(services: &[String]) -> impl Fn(&ContainerSummary) -> bool + '_ {
    move |c| {
        services.is_empty()
            || c
                .service()
                .is_some_and(|name| services.iter().any(|s| s == name))
    }
}

/// Predicate matching containers that are part of a service's replica set.
pub fn is_not_oneoff(container: &ContainerSummary) -> bool {
    !container.is_oneoff()
}

/// Narrows `containers` to the given service scope. An empty scope passes
/// everything through.
#[must_use]
pub fn select(containers: Containers, services: &[String]) -> Containers {
    containers.filter(is_service(services))
}

/// Returns the stable, human-readable name of a container.
///
/// The first runtime name with no `/` beyond the leading one; the ID when
/// there is none.
#[must_use]
pub fn canonical_name(container: &ContainerSummary) -> String {
    container
        .names
        .iter()
        .map(|n| n.strip_prefix('/').unwrap_or(n))
        .find(|n| !n.is_empty() && !n.contains('/'))
        .map_or_else(|| container.id.to_string(), str::to_string)
}

/// Returns the key used for a container's progress events.
#[must_use]
pub fn progress_name(container: &ContainerSummary) -> String {
    format!("Container {}", canonical_name(container))
}

#[cfg(test)]
mod tests {
    use flotilla_common::types::ContainerState;
    use flotilla_runtime::state::StateEntry;

    use super::*;

    fn replica(service: &str, number: u32) -> ContainerSummary {
        StateEntry::service_replica("shop", service, number)
            .with_state(ContainerState::Stopped)
            .summary()
    }

    #[test]
    fn duplicates_are_dropped_keeping_first() {
        let web = replica("web", 1);
        let db = replica("db", 1);
        let set = Containers::new(vec![web.clone(), db.clone(), web.clone()]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["shop-web-1", "shop-db-1"]);
    }

    #[test]
    fn empty_scope_passes_through() {
        let set = Containers::new(vec![replica("web", 1), replica("db", 1)]);
        assert_eq!(select(set, &[]).len(), 2);
    }

    #[test]
    fn scope_excludes_other_services() {
        let set = Containers::new(vec![replica("web", 1), replica("db", 1), replica("web", 2)]);
        let scoped = select(set, &["web".to_string()]);
        assert_eq!(scoped.names(), vec!["shop-web-1", "shop-web-2"]);
        assert!(scoped.iter().all(|c| c.service() == Some("web")));
    }

    #[test]
    fn oneoff_predicate() {
        let oneoff = StateEntry::oneoff("shop", "web").summary();
        assert!(!is_not_oneoff(&oneoff));
        assert!(is_not_oneoff(&replica("web", 1)));
    }

    #[test]
    fn canonical_name_skips_linked_aliases() {
        let mut c = replica("web", 1);
        c.names = vec!["/proxy/web".into(), "/shop-web-1".into()];
        assert_eq!(canonical_name(&c), "shop-web-1");
        assert_eq!(progress_name(&c), "Container shop-web-1");
    }

    #[test]
    fn canonical_name_falls_back_to_id() {
        let mut c = replica("web", 1);
        c.names.clear();
        assert_eq!(canonical_name(&c), c.id.to_string());
    }
}
