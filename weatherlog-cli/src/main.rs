//! Binary crate for the `weatherlog` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Loading a `.env` file and logging setup
//! - Resolving configuration and running one collection pass

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before logging init so a .env can carry RUST_LOG as well as the API key.
    let dotenv = dotenvy::dotenv().ok();
    let cmd = cli::Cli::parse();

    let default_level = if cmd.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    cmd.run().await
}
