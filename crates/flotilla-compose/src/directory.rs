//! Container directory: the read path from a project to its containers.

use flotilla_common::constants::{ONEOFF_LABEL, PROJECT_LABEL, SERVICE_LABEL};
use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::ProjectName;
use flotilla_runtime::backend::{LabelFilter, ListFilter, RuntimeClient};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::containers::Containers;

/// Which containers to return with respect to the one-off role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OneOff {
    /// Service replicas and one-off containers.
    Include,
    /// Service replicas only.
    #[default]
    Exclude,
    /// One-off containers only.
    Only,
}

/// Parameters of a directory query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// One-off role filter.
    pub oneoff: OneOff,
    /// Only return containers the runtime reports as running.
    pub require_running: bool,
    /// Restrict to these services; empty means all.
    pub services: Vec<String>,
}

impl Query {
    /// Translates the query into runtime label filters.
    #[must_use]
    pub fn to_filter(&self, project: &ProjectName) -> ListFilter {
        let mut labels = vec![LabelFilter::equals(PROJECT_LABEL, project.as_str())];
        match self.oneoff {
            OneOff::Include => {}
            OneOff::Exclude => labels.push(LabelFilter::equals(ONEOFF_LABEL, "False")),
            OneOff::Only => labels.push(LabelFilter::equals(ONEOFF_LABEL, "True")),
        }
        labels.extend(
            self.services
                .iter()
                .map(|s| LabelFilter::equals(SERVICE_LABEL, s.as_str())),
        );
        ListFilter {
            labels,
            all: !self.require_running,
        }
    }
}

/// Lists the containers of `project` matching `query`.
///
/// # Errors
///
/// Returns `NotFound` (kind `project`) when nothing matches at all, and
/// propagates any listing failure unchanged.
pub async fn list(
    client: &dyn RuntimeClient,
    project: &ProjectName,
    query: &Query,
    cancel: &CancellationToken,
) -> Result<Containers> {
    let filter = query.to_filter(project);
    let containers = Containers::new(client.list(&filter, cancel).await?);
    tracing::debug!(
        project = %project,
        services = ?query.services,
        found = containers.len(),
        "listed project containers"
    );
    if containers.is_empty() {
        return Err(FlotillaError::NotFound {
            kind: "project",
            id: project.to_string(),
        });
    }
    Ok(containers)
}

/// Like [`list`], but maps the directory's `NotFound` to `None`.
///
/// # Errors
///
/// Propagates any listing failure other than "no containers".
pub async fn find(
    client: &dyn RuntimeClient,
    project: &ProjectName,
    query: &Query,
    cancel: &CancellationToken,
) -> Result<Option<Containers>> {
    match list(client, project, query, cancel).await {
        Ok(containers) => Ok(Some(containers)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use flotilla_common::types::ContainerState;
    use flotilla_runtime::backend::memory::{Fault, InMemoryRuntime};
    use flotilla_runtime::state::StateEntry;

    use super::*;

    fn runtime() -> InMemoryRuntime {
        let runtime = InMemoryRuntime::new();
        let _ = runtime
            .insert(StateEntry::service_replica("shop", "web", 1).with_state(ContainerState::Running));
        let _ = runtime
            .insert(StateEntry::service_replica("shop", "db", 1).with_state(ContainerState::Stopped));
        let _ = runtime.insert(StateEntry::oneoff("shop", "web").with_state(ContainerState::Stopped));
        let _ = runtime.insert(StateEntry::service_replica("blog", "web", 1));
        runtime
    }

    fn all(oneoff: OneOff) -> Query {
        Query {
            oneoff,
            ..Query::default()
        }
    }

    #[tokio::test]
    async fn lists_only_the_project() {
        let runtime = runtime();
        let found = list(&runtime, &"SHOP".into(), &all(OneOff::Include), &CancellationToken::new())
            .await
            .expect("list");
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|c| c.project() == Some("shop")));
    }

    #[tokio::test]
    async fn oneoff_roles() {
        let runtime = runtime();
        let cancel = CancellationToken::new();
        let project = ProjectName::new("shop");

        let replicas = list(&runtime, &project, &all(OneOff::Exclude), &cancel).await.expect("list");
        assert!(replicas.iter().all(|c| !c.is_oneoff()));
        assert_eq!(replicas.len(), 2);

        let oneoffs = list(&runtime, &project, &all(OneOff::Only), &cancel).await.expect("list");
        assert_eq!(oneoffs.len(), 1);
    }

    #[tokio::test]
    async fn require_running_and_services() {
        let runtime = runtime();
        let query = Query {
            oneoff: OneOff::Exclude,
            require_running: true,
            services: vec!["web".into(), "db".into()],
        };
        let found = list(&runtime, &"shop".into(), &query, &CancellationToken::new())
            .await
            .expect("list");
        assert_eq!(found.names(), vec!["shop-web-1"]);
    }

    #[tokio::test]
    async fn empty_project_is_not_found() {
        let runtime = runtime();
        let err = list(&runtime, &"nope".into(), &Query::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlotillaError::NotFound { kind: "project", .. }));

        let none = find(&runtime, &"nope".into(), &Query::default(), &CancellationToken::new())
            .await
            .expect("find");
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn listing_failure_propagates() {
        let runtime = runtime();
        runtime.fail_list(Fault::Runtime("daemon unreachable".into()));
        let err = find(&runtime, &"shop".into(), &Query::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlotillaError::Runtime { .. }));
    }
}
