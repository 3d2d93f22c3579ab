//! `ps`: list project containers.

use flotilla_common::error::Result;
use flotilla_common::types::ProjectName;

use crate::containers::Containers;
use crate::directory::{OneOff, Query};
use crate::project::Project;
use crate::service::ComposeService;

/// Options of [`ComposeService::ps`].
#[derive(Debug, Clone, Default)]
pub struct PsOptions {
    /// Services to list; empty means all.
    pub services: Vec<String>,
    /// Include containers that are not running.
    pub all: bool,
    /// One-off role filter.
    pub oneoff: OneOff,
    /// Restrict to the services this project declares.
    pub project: Option<Project>,
}

impl ComposeService {
    /// Lists the containers of a project. A project without containers
    /// yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns any listing failure other than "no containers".
    pub async fn ps(&self, project_name: &str, options: PsOptions) -> Result<Containers> {
        let query = Query {
            oneoff: options.oneoff,
            require_running: !options.all,
            services: options.services,
        };
        let found = self
            .candidates(&ProjectName::new(project_name), &query, options.project.as_ref())
            .await?;
        Ok(found.unwrap_or_default())
    }
}
