//! `pause` and `unpause`: freeze and thaw service containers.

use flotilla_common::error::Result;
use flotilla_common::types::ContainerState;

use crate::progress::{PAUSING, UNPAUSING};
use crate::project::Project;
use crate::service::{ComposeService, SimplePlan};

/// Options of [`ComposeService::pause`] and [`ComposeService::unpause`].
#[derive(Debug, Clone, Default)]
pub struct PauseOptions {
    /// Services to act on; empty means all.
    pub services: Vec<String>,
    /// Restrict to the services this project declares.
    pub project: Option<Project>,
}

impl ComposeService {
    /// Freezes the running containers of a project.
    ///
    /// # Errors
    ///
    /// Returns a listing or inspection failure, or the first pause failure
    /// in discovery order.
    pub async fn pause(&self, project_name: &str, options: PauseOptions) -> Result<()> {
        let plan = SimplePlan {
            project_name,
            services: &options.services,
            project: options.project.as_ref(),
            require_running: true,
            labels: PAUSING,
            nothing_to_do: "No running containers to pause",
        };
        self.run_simple(
            plan,
            |details| details.state == ContainerState::Running,
            |client, container, token| async move { client.pause(&container.id, &token).await },
        )
        .await
    }

    /// Thaws the paused containers of a project.
    ///
    /// # Errors
    ///
    /// Returns a listing or inspection failure, or the first unpause
    /// failure in discovery order.
    pub async fn unpause(&self, project_name: &str, options: PauseOptions) -> Result<()> {
        let plan = SimplePlan {
            project_name,
            services: &options.services,
            project: options.project.as_ref(),
            require_running: false,
            labels: UNPAUSING,
            nothing_to_do: "No paused containers",
        };
        self.run_simple(
            plan,
            |details| details.is_paused(),
            |client, container, token| async move { client.unpause(&container.id, &token).await },
        )
        .await
    }
}
