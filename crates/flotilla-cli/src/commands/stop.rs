//! `flotilla stop`: stop running service containers.

use std::time::Duration;

use clap::Args;
use flotilla_compose::stop::StopOptions;

use crate::session::Session;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Services to stop. If empty, stops all.
    pub services: Vec<String>,

    /// Shutdown timeout in seconds. Defaults to the configured value.
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if a container fails to stop.
pub async fn execute(args: StopArgs, session: &Session) -> anyhow::Result<()> {
    let options = StopOptions {
        services: args.services,
        project: session.project.clone(),
        timeout: args.timeout.map(Duration::from_secs),
    };
    Ok(session.service.stop(&session.project_name, options).await?)
}
