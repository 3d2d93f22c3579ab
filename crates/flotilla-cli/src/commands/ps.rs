//! `flotilla ps`: list service containers.

use std::io::Write;

use clap::{Args, ValueEnum};
use flotilla_compose::directory::OneOff;
use flotilla_compose::ps::PsOptions;

use crate::output;
use crate::session::Session;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Services to list. If empty, lists all.
    pub services: Vec<String>,

    /// Show all containers (including stopped).
    #[arg(short, long)]
    pub all: bool,

    /// Which containers to show with respect to one-off runs.
    #[arg(long, value_enum, default_value_t = OneOffArg::Exclude)]
    pub oneoff: OneOffArg,
}

/// CLI spelling of [`OneOff`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneOffArg {
    /// Service and one-off containers.
    Include,
    /// Service containers only.
    Exclude,
    /// One-off containers only.
    Only,
}

impl From<OneOffArg> for OneOff {
    fn from(arg: OneOffArg) -> Self {
        match arg {
            OneOffArg::Include => Self::Include,
            OneOffArg::Exclude => Self::Exclude,
            OneOffArg::Only => Self::Only,
        }
    }
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if listing fails or stdout is closed.
pub async fn execute(args: PsArgs, session: &Session) -> anyhow::Result<()> {
    let options = PsOptions {
        services: args.services,
        all: args.all,
        oneoff: args.oneoff.into(),
        project: session.project.clone(),
    };
    let containers = session
        .service
        .ps(&session.project_name, options)
        .await?;

    let mut out = std::io::stdout().lock();
    if containers.is_empty() {
        writeln!(out, "No containers found.")?;
        return Ok(());
    }
    for line in output::container_table(&containers, chrono::Utc::now()) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
