//! Local runtime backed by a JSON state index on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use flotilla_common::error::Result;
use flotilla_common::types::ContainerId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{
    ContainerDetails, ContainerSummary, ListFilter, RemoveContainerOptions, RuntimeClient,
    ensure_not_cancelled,
};
use crate::state::{self, StateEntry, Transition};

/// Runtime that tracks containers in a local state file.
///
/// Every mutation is a read-modify-write of the whole index, serialised by
/// an async lock so concurrent callers within one process never lose an
/// update.
pub struct LocalRuntime {
    state_file: PathBuf,
    lock: Mutex<()>,
}

impl LocalRuntime {
    /// Creates a runtime over the given state file.
    #[must_use]
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the state file path.
    #[must_use]
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Registers a container record.
    ///
    /// # Errors
    ///
    /// Returns an error if the state index cannot be read or written.
    pub async fn create(&self, entry: StateEntry) -> Result<ContainerId> {
        let _guard = self.lock.lock().await;
        let mut index = state::load_state(&self.state_file)?;
        let id = entry.id.clone();
        tracing::info!(id = %id, name = %entry.name, "registering container");
        index.containers.push(entry);
        state::save_state(&self.state_file, &index)?;
        Ok(id)
    }

    async fn transition(
        &self,
        id: &ContainerId,
        transition: Transition,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        let _guard = self.lock.lock().await;
        let mut index = state::load_state(&self.state_file)?;
        index.apply(id, &transition)?;
        state::save_state(&self.state_file, &index)?;
        tracing::info!(id = %id, ?transition, "container transitioned");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RuntimeClient for LocalRuntime {
    async fn list(
        &self,
        filter: &ListFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>> {
        ensure_not_cancelled(cancel)?;
        let _guard = self.lock.lock().await;
        Ok(state::load_state(&self.state_file)?.list(filter))
    }

    async fn inspect(
        &self,
        id: &ContainerId,
        cancel: &CancellationToken,
    ) -> Result<ContainerDetails> {
        ensure_not_cancelled(cancel)?;
        let _guard = self.lock.lock().await;
        state::load_state(&self.state_file)?.inspect(id)
    }

    async fn stop(
        &self,
        id: &ContainerId,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        tracing::debug!(id = %id, ?timeout, "stopping container");
        self.transition(id, Transition::Stop, cancel).await
    }

    async fn remove(
        &self,
        id: &ContainerId,
        options: RemoveContainerOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if options.volumes {
            tracing::debug!(id = %id, "anonymous volumes released with container");
        }
        self.transition(id, Transition::Remove(options), cancel).await
    }

    async fn kill(&self, id: &ContainerId, signal: &str, cancel: &CancellationToken) -> Result<()> {
        self.transition(id, Transition::Kill(signal.to_string()), cancel)
            .await
    }

    async fn pause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()> {
        self.transition(id, Transition::Pause, cancel).await
    }

    async fn unpause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()> {
        self.transition(id, Transition::Unpause, cancel).await
    }
}
