//! # flotilla
//!
//! Bulk lifecycle operations on the containers of a multi-container project:
//! remove, stop, kill, pause, unpause, and list.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

mod commands;
mod output;
mod session;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::{Cli, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.log_format);
    commands::execute(cli).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
