//! Dry-run decorator: reads hit the real runtime, mutations are simulated.

use std::sync::Arc;
use std::time::Duration;

use flotilla_common::error::Result;
use flotilla_common::types::ContainerId;
use tokio_util::sync::CancellationToken;

use super::{
    ContainerDetails, ContainerSummary, ListFilter, RemoveContainerOptions, RuntimeClient,
    ensure_not_cancelled,
};

/// Wraps a runtime so that every mutating call is logged and reported as
/// successful without reaching the runtime.
pub struct DryRunClient {
    inner: Arc<dyn RuntimeClient>,
}

impl DryRunClient {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn RuntimeClient>) -> Self {
        Self { inner }
    }

    fn simulate(action: &str, id: &ContainerId, cancel: &CancellationToken) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        tracing::info!(id = %id, action, "dry run: skipping mutation");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RuntimeClient for DryRunClient {
    async fn list(
        &self,
        filter: &ListFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>> {
        self.inner.list(filter, cancel).await
    }

    async fn inspect(
        &self,
        id: &ContainerId,
        cancel: &CancellationToken,
    ) -> Result<ContainerDetails> {
        self.inner.inspect(id, cancel).await
    }

    async fn stop(
        &self,
        id: &ContainerId,
        _timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        Self::simulate("stop", id, cancel)
    }

    async fn remove(
        &self,
        id: &ContainerId,
        _options: RemoveContainerOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        Self::simulate("remove", id, cancel)
    }

    async fn kill(&self, id: &ContainerId, _signal: &str, cancel: &CancellationToken) -> Result<()> {
        Self::simulate("kill", id, cancel)
    }

    async fn pause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()> {
        Self::simulate("pause", id, cancel)
    }

    async fn unpause(&self, id: &ContainerId, cancel: &CancellationToken) -> Result<()> {
        Self::simulate("unpause", id, cancel)
    }
}
