//! CLI command definitions and dispatch.

pub mod kill;
pub mod pause;
pub mod ps;
pub mod rm;
pub mod stop;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use flotilla_common::constants::ENV_PROJECT_NAME;

use crate::session::Session;

/// Flotilla: bulk lifecycle operations on project containers.
#[derive(Parser, Debug)]
#[command(name = "flotilla", version, about, long_about = None)]
pub struct Cli {
    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project name. Defaults to the current directory name.
    #[arg(short = 'p', long = "project-name", global = true, env = ENV_PROJECT_NAME)]
    pub project_name: Option<String>,

    /// JSON project definition (services and their dependencies).
    #[arg(long, global = true)]
    pub project_file: Option<PathBuf>,

    /// Path to the state file.
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Report what would be done without touching any container.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove stopped service containers.
    Rm(rm::RmArgs),
    /// Stop running service containers.
    Stop(stop::StopArgs),
    /// Send a signal to running service containers.
    Kill(kill::KillArgs),
    /// Pause running service containers.
    Pause(pause::PauseArgs),
    /// Unpause paused service containers.
    Unpause(pause::PauseArgs),
    /// List service containers.
    Ps(ps::PsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// Progress output is flushed before the command's result is returned.
///
/// # Errors
///
/// Returns an error if the session cannot be set up or the command fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let session = Session::open(&cli.global)?;
    let result = match cli.command {
        Command::Rm(args) => rm::execute(args, &session).await,
        Command::Stop(args) => stop::execute(args, &session).await,
        Command::Kill(args) => kill::execute(args, &session).await,
        Command::Pause(args) => pause::execute_pause(args, &session).await,
        Command::Unpause(args) => pause::execute_unpause(args, &session).await,
        Command::Ps(args) => ps::execute(args, &session).await,
    };
    session.close().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "flotilla", "rm", "web", "-f", "-p", "Shop", "--dry-run", "--log-format", "json",
        ])
        .expect("parse");
        assert_eq!(cli.global.project_name.as_deref(), Some("Shop"));
        assert!(cli.global.dry_run);
        assert_eq!(cli.global.log_format, LogFormat::Json);
        let Command::Rm(args) = cli.command else {
            panic!("expected rm");
        };
        assert_eq!(args.services, vec!["web"]);
        assert!(args.force);
    }

    #[test]
    fn kill_defaults_to_sigkill() {
        let cli = Cli::try_parse_from(["flotilla", "kill"]).expect("parse");
        let Command::Kill(args) = cli.command else {
            panic!("expected kill");
        };
        assert_eq!(args.signal, "SIGKILL");
    }
}
