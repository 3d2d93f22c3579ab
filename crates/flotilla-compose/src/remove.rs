//! `remove`: delete stopped service containers.

use flotilla_common::error::{FlotillaError, Result};
use flotilla_common::types::ProjectName;
use flotilla_runtime::backend::RemoveContainerOptions;

use crate::directory::{OneOff, Query};
use crate::progress::REMOVING;
use crate::project::Project;
use crate::service::ComposeService;
use crate::stop::StopOptions;

const NOTHING_TO_REMOVE: &str = "No stopped containers";

/// Options of [`ComposeService::remove`].
#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    /// Services to act on; empty means all.
    pub services: Vec<String>,
    /// Restrict to the services this project declares.
    pub project: Option<Project>,
    /// Skip the confirmation prompt and force the runtime removal.
    pub force: bool,
    /// Stop running containers first.
    pub stop: bool,
    /// Also remove anonymous volumes attached to the containers.
    pub volumes: bool,
}

impl ComposeService {
    /// Removes the stopped containers of a project.
    ///
    /// Running containers are left alone unless `stop` is set. When
    /// services are named explicitly, a running container among them is an
    /// error instead. Declining the confirmation is not an error.
    ///
    /// # Errors
    ///
    /// Returns the first error of the stop phase, a listing or inspection
    /// failure, `PreconditionUnmet`, a prompt failure, or the first
    /// removal failure in discovery order.
    pub async fn remove(&self, project_name: &str, options: RemoveOptions) -> Result<()> {
        let project_name = ProjectName::new(project_name);

        if options.stop {
            self.stop(
                project_name.as_str(),
                StopOptions {
                    services: options.services.clone(),
                    project: options.project.clone(),
                    timeout: None,
                },
            )
            .await?;
        }

        let query = Query {
            oneoff: OneOff::Exclude,
            require_running: false,
            services: options.services.clone(),
        };
        let Some(candidates) = self
            .candidates(&project_name, &query, options.project.as_ref())
            .await?
        else {
            self.progress.notice(NOTHING_TO_REMOVE);
            return Ok(());
        };

        // A dry-run stop leaves containers running; treat them as stopped.
        let assume_stopped = options.stop && self.dry_run;
        let reconciled = self
            .reconcile(candidates, |details| !details.is_running() || assume_stopped)
            .await?;

        if !options.stop && !options.services.is_empty() && !reconciled.unmet.is_empty() {
            return Err(FlotillaError::PreconditionUnmet {
                message: format!(
                    "cannot remove running containers {}: stop them first or use the stop option",
                    reconciled.unmet.names().join(", ")
                ),
            });
        }

        let stopped = reconciled.actionable;
        let names = stopped.names();
        if names.is_empty() {
            self.progress.notice(NOTHING_TO_REMOVE);
            return Ok(());
        }

        let message = format!("Going to remove {}", names.join(", "));
        if options.force {
            self.progress.notice(&message);
        } else if !self.confirm(message).await? {
            tracing::info!(project = %project_name, "removal declined");
            return Ok(());
        }

        tracing::info!(project = %project_name, containers = stopped.len(), "removing containers");
        let remove_options = RemoveContainerOptions {
            volumes: options.volumes,
            force: options.force,
        };
        self.apply(&stopped, REMOVING, move |client, container, token| async move {
            client.remove(&container.id, remove_options, &token).await
        })
        .await
    }
}
