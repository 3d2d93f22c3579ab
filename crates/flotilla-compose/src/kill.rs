//! `kill`: signal running service containers.

use flotilla_common::constants::DEFAULT_KILL_SIGNAL;
use flotilla_common::error::Result;
use flotilla_common::types::ContainerState;

use crate::progress::KILLING;
use crate::project::Project;
use crate::service::{ComposeService, SimplePlan};

/// Options of [`ComposeService::kill`].
#[derive(Debug, Clone)]
pub struct KillOptions {
    /// Services to act on; empty means all.
    pub services: Vec<String>,
    /// Restrict to the services this project declares.
    pub project: Option<Project>,
    /// Signal to send.
    pub signal: String,
}

impl Default for KillOptions {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            project: None,
            signal: DEFAULT_KILL_SIGNAL.to_string(),
        }
    }
}

impl ComposeService {
    /// Sends a signal to the running containers of a project.
    ///
    /// # Errors
    ///
    /// Returns a listing or inspection failure, or the first kill failure
    /// in discovery order.
    pub async fn kill(&self, project_name: &str, options: KillOptions) -> Result<()> {
        let plan = SimplePlan {
            project_name,
            services: &options.services,
            project: options.project.as_ref(),
            require_running: true,
            labels: KILLING,
            nothing_to_do: "No running containers to kill",
        };
        let signal = options.signal.clone();
        self.run_simple(
            plan,
            |details| details.state == ContainerState::Running,
            move |client, container, token| {
                let signal = signal.clone();
                async move { client.kill(&container.id, &signal, &token).await }
            },
        )
        .await
    }
}
