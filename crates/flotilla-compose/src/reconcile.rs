//! State reconciliation.
//!
//! A directory listing is a snapshot that may already be stale when the
//! engine acts on it: containers get auto-removed, or stopped and started by
//! other actors. Every candidate is inspected again right before the
//! mutation phase and only kept if its live state satisfies the operation's
//! precondition.

use flotilla_common::error::Result;
use flotilla_common::types::ContainerId;
use flotilla_runtime::backend::{ContainerDetails, RuntimeClient};
use tokio_util::sync::CancellationToken;

use crate::containers::{Containers, canonical_name};

/// Result of reconciling a candidate set against live state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Containers that exist and satisfy the precondition, with refreshed state.
    pub actionable: Containers,
    /// Containers that exist but fail the precondition.
    pub unmet: Containers,
    /// Containers that vanished since listing.
    pub vanished: Vec<ContainerId>,
}

/// Re-inspects every candidate and partitions them by `precondition`.
///
/// A candidate that is no longer found is dropped silently.
///
/// # Errors
///
/// Any inspection failure other than "not found" aborts reconciliation
/// and is returned unchanged; no partial result is produced.
pub async fn reconcile(
    client: &dyn RuntimeClient,
    candidates: Containers,
    precondition: impl Fn(&ContainerDetails) -> bool,
    cancel: &CancellationToken,
) -> Result<Reconciled> {
    let mut actionable = Vec::new();
    let mut unmet = Vec::new();
    let mut vanished = Vec::new();

    for mut container in candidates {
        let details = match client.inspect(&container.id, cancel).await {
            Ok(details) => details,
            Err(e) if e.is_not_found() => {
                tracing::debug!(id = %container.id, name = %canonical_name(&container), "container already gone");
                vanished.push(container.id);
                continue;
            }
            Err(e) => return Err(e),
        };
        container.state = details.state;
        if precondition(&details) {
            actionable.push(container);
        } else {
            tracing::debug!(id = %container.id, state = %details.state, "precondition not met");
            unmet.push(container);
        }
    }

    Ok(Reconciled {
        actionable: Containers::new(actionable),
        unmet: Containers::new(unmet),
        vanished,
    })
}

#[cfg(test)]
mod tests {
    use flotilla_common::error::FlotillaError;
    use flotilla_common::types::ContainerState;
    use flotilla_runtime::backend::memory::{Fault, InMemoryRuntime, Operation};
    use flotilla_runtime::state::StateEntry;

    use super::*;

    fn candidates(runtime: &InMemoryRuntime) -> Containers {
        Containers::new(runtime.snapshot().containers.iter().map(StateEntry::summary).collect())
    }

    #[tokio::test]
    async fn partitions_by_live_state() {
        let runtime = InMemoryRuntime::new();
        let _ = runtime
            .insert(StateEntry::service_replica("shop", "web", 1).with_state(ContainerState::Running));
        let _ = runtime
            .insert(StateEntry::service_replica("shop", "web", 2).with_state(ContainerState::Stopped));

        let result = reconcile(
            &runtime,
            candidates(&runtime),
            |d| !d.is_running(),
            &CancellationToken::new(),
        )
        .await
        .expect("reconcile");
        assert_eq!(result.actionable.names(), vec!["shop-web-2"]);
        assert_eq!(result.unmet.names(), vec!["shop-web-1"]);
    }

    #[tokio::test]
    async fn stale_listing_state_is_refreshed() {
        let runtime = InMemoryRuntime::new();
        let id = runtime
            .insert(StateEntry::service_replica("shop", "web", 1).with_state(ContainerState::Running));
        let stale = candidates(&runtime);
        runtime
            .stop(&id, None, &CancellationToken::new())
            .await
            .expect("stop");

        let result = reconcile(&runtime, stale, |d| !d.is_running(), &CancellationToken::new())
            .await
            .expect("reconcile");
        assert_eq!(result.actionable.len(), 1);
        assert_eq!(
            result.actionable.iter().next().map(|c| c.state),
            Some(ContainerState::Stopped)
        );
    }

    #[tokio::test]
    async fn vanished_containers_are_dropped() {
        let runtime = InMemoryRuntime::new();
        let gone = runtime.insert(StateEntry::service_replica("shop", "web", 1));
        let _ = runtime.insert(StateEntry::service_replica("shop", "web", 2));
        let snapshot = candidates(&runtime);
        runtime.vanish_before(&gone, Operation::Inspect);

        let result = reconcile(&runtime, snapshot, |_| true, &CancellationToken::new())
            .await
            .expect("reconcile");
        assert_eq!(result.actionable.names(), vec!["shop-web-2"]);
        assert_eq!(result.vanished, vec![gone]);
    }

    #[tokio::test]
    async fn inspection_failure_aborts() {
        let runtime = InMemoryRuntime::new();
        let broken = runtime.insert(StateEntry::service_replica("shop", "web", 1));
        let _ = runtime.insert(StateEntry::service_replica("shop", "web", 2));
        runtime.fail(&broken, Operation::Inspect, Fault::Runtime("inspect timed out".into()));

        let err = reconcile(&runtime, candidates(&runtime), |_| true, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlotillaError::Runtime { .. }));
    }
}
