//! In-memory runtime with scriptable faults.
//!
//! Keeps a [`StateIndex`] behind a lock and lets callers inject failures,
//! latency, and vanishing containers per operation. Every call is recorded
//! in a journal so tests can assert on exactly what was issued.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::ContainerId;
use tokio_util::sync::CancellationToken;

use super::{
    ContainerDetails, ContainerSummary, ListFilter, RemoveContainerOptions, RuntimeClient,
    ensure_not_cancelled,
};
use crate::state::{StateEntry, StateIndex, Transition};

/// Runtime API operations, used to key scripted behaviour and the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `list`
    List,
    /// `inspect`
    Inspect,
    /// `stop`
    Stop,
    /// `remove`
    Remove,
    /// `kill`
    Kill,
    /// `pause`
    Pause,
    /// `unpause`
    Unpause,
}

impl Operation {
    /// Returns `true` for calls that change container state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::List | Self::Inspect)
    }
}

/// A failure to inject into a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail with `NotFound` without touching the record.
    NotFound,
    /// Fail with `Conflict`.
    Conflict(String),
    /// Fail with a generic runtime error.
    Runtime(String),
}

impl Fault {
    fn to_error(&self, id: &str) -> FlotillaError {
        match self {
            Self::NotFound => FlotillaError::container_not_found(id),
            Self::Conflict(message) => FlotillaError::Conflict {
                message: message.clone(),
            },
            Self::Runtime(message) => FlotillaError::Runtime {
                message: message.clone(),
            },
        }
    }
}

/// One journaled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Operation invoked.
    pub operation: Operation,
    /// Target container; `None` for `list`.
    pub id: Option<ContainerId>,
}

#[derive(Debug, Default)]
struct Inner {
    index: StateIndex,
    faults: HashMap<(ContainerId, Operation), Fault>,
    list_fault: Option<Fault>,
    vanish: HashSet<(ContainerId, Operation)>,
    delays: HashMap<ContainerId, Duration>,
    journal: Vec<Call>,
}

/// Scriptable in-memory runtime.
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    inner: Mutex<Inner>,
}

impl InMemoryRuntime {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a container record and returns its ID.
    pub fn insert(&self, entry: StateEntry) -> ContainerId {
        let id = entry.id.clone();
        self.lock().index.containers.push(entry);
        id
    }

    /// Makes `operation` on `id` fail with `fault`.
    pub fn fail(&self, id: &ContainerId, operation: Operation, fault: Fault) {
        let _ = self.lock().faults.insert((id.clone(), operation), fault);
    }

    /// Makes every `list` call fail with `fault`.
    pub fn fail_list(&self, fault: Fault) {
        self.lock().list_fault = Some(fault);
    }

    /// Deletes `id` just before `operation` executes on it, as if another
    /// actor removed it concurrently.
    pub fn vanish_before(&self, id: &ContainerId, operation: Operation) {
        let _ = self.lock().vanish.insert((id.clone(), operation));
    }

    /// Delays every mutation on `id` by `delay`.
    pub fn delay(&self, id: &ContainerId, delay: Duration) {
        let _ = self.lock().delays.insert(id.clone(), delay);
    }

    /// Returns a snapshot of the journal.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().journal.clone()
    }

    /// Returns how many times `operation` was invoked.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Returns the IDs `operation` was invoked on, in call order.
    #[must_use]
    pub fn targets(&self, operation: Operation) -> Vec<ContainerId> {
        self.lock()
            .journal
            .iter()
            .filter(|c| c.operation == operation)
            .filter_map(|c| c.id.clone())
            .collect()
    }

    /// Returns a copy of the current container records.
    #[must_use]
    pub fn snapshot(&self) -> StateIndex {
        self.lock().index.clone()
    }

    /// Journals the call and applies scripted vanish/fault behaviour.
    fn prepare(&self, id: &ContainerId, operation: Operation) -> Result<()> {
        let mut inner = self.lock();
        inner.journal.push(Call {
            operation,
            id: Some(id.clone()),
        });
        if inner.vanish.remove(&(id.clone(), operation)) {
            inner.index.containers.retain(|e| e.id != *id);
        }
        if let Some(fault) = inner.faults.get(&(id.clone(), operation)) {
            return Err(fault.to_error(id.as_str()));
        }
        Ok(())
    }

    async fn mutate(
        &self,
        id: &ContainerId,
        operation: Operation,
        transition: Transition,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        let delay = self.lock().delays.get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.prepare(id, operation)?;
        self.lock().index.apply(id, &transition)
    }
}

#[async_trait::async_trait]
impl RuntimeClient for InMemoryRuntime {
    async fn list(
        &self,
        filter: &ListFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>> {
        ensure_not_cancelled(cancel)?;
        let mut inner = self.lock();
        inner.journal.push(Call {
            operation: Operation::List,
            id: None,
        });
        if let Some(fault) = &inner.list_fault {
            return Err(fault.to_error("list"));
        }
        Ok(inner.index.list(filter))
    }

    async fn inspect(
        &self,
        id: &ContainerId,
        cancel: &CancellationToken,
    ) -> Result<ContainerDetails> {
        ensure_not_cancelled(cancel)?;
        self.prepare(id, Operation::Inspect)?;
        self.lock().index.inspect(id)
    }

    async fn stop(
        &self,
        id: &ContainerId,
        _timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.mutate(id, Operation::Stop, Transition::Stop, cancel).await
    }

    async fn remove(
        &self,
        id: &ContainerId,
        options: RemoveContainerOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.mutate(id, Operation::Remove, Transition::Remove(options), cancel)
            .await
    }

    async fn kill(&self, id: &ContainerId, signal: &str, cancel: &CancellationToken) -> Result<()> {
        self.mutate(id, Operation::Kill, Transition::Kill(signal.to_string()), cancel)
            .await
    }

    async fn pause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()> {
        self.mutate(id, Operation::Pause, Transition::Pause, cancel).await
    }

    async fn unpause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()> {
        self.mutate(id, Operation::Unpause, Transition::Unpause, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use flotilla_common::types::ContainerState;

    use super::*;

    #[tokio::test]
    async fn injected_fault_is_returned() {
        let runtime = InMemoryRuntime::new();
        let id = runtime.insert(StateEntry::service_replica("shop", "web", 1));
        runtime.fail(&id, Operation::Remove, Fault::Runtime("disk on fire".into()));

        let err = runtime
            .remove(&id, RemoveContainerOptions::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk on fire"));
        assert_eq!(runtime.snapshot().containers.len(), 1);
    }

    #[tokio::test]
    async fn vanish_before_inspect_reports_not_found() {
        let runtime = InMemoryRuntime::new();
        let id = runtime.insert(StateEntry::service_replica("shop", "web", 1));
        runtime.vanish_before(&id, Operation::Inspect);

        let err = runtime.inspect(&id, &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(runtime.snapshot().containers.is_empty());
    }

    #[tokio::test]
    async fn journal_records_calls_in_order() {
        let runtime = InMemoryRuntime::new();
        let id = runtime
            .insert(StateEntry::service_replica("shop", "web", 1).with_state(ContainerState::Running));
        let cancel = CancellationToken::new();

        runtime.pause(&id, &cancel).await.expect("pause");
        runtime.unpause(&id, &cancel).await.expect("unpause");

        let ops: Vec<_> = runtime.calls().into_iter().map(|c| c.operation).collect();
        assert_eq!(ops, vec![Operation::Pause, Operation::Unpause]);
        assert_eq!(runtime.targets(Operation::Pause), vec![id]);
    }

    #[tokio::test]
    async fn cancelled_mutation_is_not_journaled() {
        let runtime = InMemoryRuntime::new();
        let id = runtime.insert(StateEntry::service_replica("shop", "web", 1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runtime.stop(&id, None, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(runtime.count(Operation::Stop), 0);
    }

    #[tokio::test]
    async fn list_fault_fails_listing() {
        let runtime = InMemoryRuntime::new();
        runtime.fail_list(Fault::Runtime("daemon unreachable".into()));
        let err = runtime
            .list(&ListFilter::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlotillaError::Runtime { .. }));
    }

    #[test]
    fn mutation_classification() {
        assert!(Operation::Remove.is_mutation());
        assert!(!Operation::Inspect.is_mutation());
    }
}
