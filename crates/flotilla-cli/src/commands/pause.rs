//! `flotilla pause` and `flotilla unpause`.

use clap::Args;
use flotilla_compose::pause::PauseOptions;

use crate::session::Session;

/// Arguments for the `pause` and `unpause` commands.
#[derive(Args, Debug)]
pub struct PauseArgs {
    /// Services to act on. If empty, acts on all.
    pub services: Vec<String>,
}

impl PauseArgs {
    fn into_options(self, session: &Session) -> PauseOptions {
        PauseOptions {
            services: self.services,
            project: session.project.clone(),
        }
    }
}

/// Executes the `pause` command.
///
/// # Errors
///
/// Returns an error if a container cannot be paused.
pub async fn execute_pause(args: PauseArgs, session: &Session) -> anyhow::Result<()> {
    let options = args.into_options(session);
    Ok(session.service.pause(&session.project_name, options).await?)
}

/// Executes the `unpause` command.
///
/// # Errors
///
/// Returns an error if a container cannot be unpaused.
pub async fn execute_unpause(args: PauseArgs, session: &Session) -> anyhow::Result<()> {
    let options = args.into_options(session);
    Ok(session.service.unpause(&session.project_name, options).await?)
}
