//! `stop`: stop running service containers, dependents first.

use std::sync::Arc;
use std::time::Duration;

use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::ProjectName;

use crate::containers::{self, Containers};
use crate::directory::{OneOff, Query};
use crate::progress::{self, STOPPING};
use crate::project::Project;
use crate::service::ComposeService;

/// Options of [`ComposeService::stop`].
#[derive(Debug, Clone, Default)]
pub struct StopOptions {
    /// Services to act on; empty means all.
    pub services: Vec<String>,
    /// Restrict to the services this project declares and stop them in
    /// reverse dependency order.
    pub project: Option<Project>,
    /// Grace period before the runtime kills the container.
    pub timeout: Option<Duration>,
}

impl ComposeService {
    /// Stops the running containers of a project.
    ///
    /// With a project, services are stopped level by level, dependents
    /// before their dependencies; containers within a level are stopped
    /// concurrently. A failed level aborts the remaining ones.
    ///
    /// # Errors
    ///
    /// Returns a listing or inspection failure, a dependency graph error,
    /// or the first stop failure in discovery order.
    pub async fn stop(&self, project_name: &str, options: StopOptions) -> Result<()> {
        let project_name = ProjectName::new(project_name);
        let query = Query {
            oneoff: OneOff::Exclude,
            require_running: false,
            services: options.services.clone(),
        };
        let Some(candidates) = self
            .candidates(&project_name, &query, options.project.as_ref())
            .await?
        else {
            tracing::debug!(project = %project_name, "no containers to stop");
            return Ok(());
        };

        let running = self
            .reconcile(candidates, |details| details.is_running())
            .await?
            .actionable;
        if running.is_empty() {
            tracing::debug!(project = %project_name, "no running containers");
            return Ok(());
        }

        let batches = match &options.project {
            Some(project) => teardown_batches(project, running)?,
            None => vec![running],
        };
        let timeout = options.timeout.or(self.stop_timeout);
        tracing::info!(project = %project_name, batches = batches.len(), "stopping containers");

        let executor = self.executor(STOPPING);
        progress::run_with_title(self.progress.as_ref(), STOPPING.title, async {
            for batch in &batches {
                let client = Arc::clone(&self.client);
                executor
                    .execute(batch, &self.cancel, move |container, token| {
                        let client = Arc::clone(&client);
                        async move { client.stop(&container.id, timeout, &token).await }
                    })
                    .await
                    .into_result()?;
            }
            Ok::<(), FlotillaError>(())
        })
        .await
    }
}

/// Splits `running` into batches following the project's teardown levels.
/// Empty batches are dropped.
fn teardown_batches(project: &Project, running: Containers) -> Result<Vec<Containers>> {
    let mut batches = Vec::new();
    for level in project.teardown_levels()? {
        let batch = running.clone().filter(containers::is_service(&level));
        if !batch.is_empty() {
            batches.push(batch);
        }
    }
    Ok(batches)
}
