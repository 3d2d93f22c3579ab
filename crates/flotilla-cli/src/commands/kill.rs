//! `flotilla kill`: signal running service containers.

use clap::Args;
use flotilla_common::constants::DEFAULT_KILL_SIGNAL;
use flotilla_compose::kill::KillOptions;

use crate::session::Session;

/// Arguments for the `kill` command.
#[derive(Args, Debug)]
pub struct KillArgs {
    /// Services to kill. If empty, kills all.
    pub services: Vec<String>,

    /// Signal to send to the containers.
    #[arg(short, long, default_value = DEFAULT_KILL_SIGNAL)]
    pub signal: String,
}

/// Executes the `kill` command.
///
/// # Errors
///
/// Returns an error if a container cannot be signalled.
pub async fn execute(args: KillArgs, session: &Session) -> anyhow::Result<()> {
    let options = KillOptions {
        services: args.services,
        project: session.project.clone(),
        signal: args.signal,
    };
    Ok(session.service.kill(&session.project_name, options).await?)
}
