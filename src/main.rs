//! mlflow-cli - record experiment runs, parameters, metrics and artifacts.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mlflow_cli::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries results (e.g. the run ID from `run start`)
    let default_directive = if cli.global.verbose > 0 {
        "mlflow_cli=debug"
    } else {
        "mlflow_cli=warn"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)))
        .init();

    cli.run().await
}
