//! Command-line interface
//!
//! ```bash
//! # Start a run and keep its ID for later calls
//! RUN_ID=$(mlflow-cli run start --experiment-id 0 --run-name nightly --tag team=ml)
//!
//! mlflow-cli log params --run-id "$RUN_ID" --param lr=0.01 --from-file params.yaml
//! mlflow-cli log metrics --run-id "$RUN_ID" --from-file metrics.json --time-resolution 5m
//! mlflow-cli log artifact --run-id "$RUN_ID" --file model.pkl --file config.yaml
//!
//! mlflow-cli run end --run-id "$RUN_ID" --status FINISHED
//! ```

mod log;
mod run;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

pub use log::{
    LogArtifactCommand, LogCommand, LogMetricCommand, LogMetricsCommand, LogParamsCommand,
    LogSubcommand,
};
pub use run::{unescape_description, RunCommand, RunEndCommand, RunStartCommand, RunSubcommand};

use crate::client::ApiClient;
use crate::config::{ClientConfig, DEFAULT_TRACKING_URI};
use crate::tracking::HttpTracking;

/// Record runs, parameters, metrics and artifacts on a tracking server
#[derive(Parser, Debug)]
#[command(name = "mlflow-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start and end runs
    Run(RunCommand),

    /// Log parameters, metrics and artifacts to a run
    Log(LogCommand),
}

/// Connection options, each with an environment fallback.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Tracking server URL, or `databricks` / `databricks://<profile>`
    #[arg(long, global = true, env = "MLFLOW_TRACKING_URI", default_value = DEFAULT_TRACKING_URI)]
    pub tracking_uri: String,

    /// Experiment for new runs
    #[arg(long, global = true, env = "MLFLOW_EXPERIMENT_ID")]
    pub experiment_id: Option<String>,

    /// Managed workspace host
    #[arg(long, global = true, env = "DATABRICKS_HOST")]
    pub workspace_host: Option<String>,

    /// Managed workspace token
    #[arg(long, global = true, env = "DATABRICKS_TOKEN", hide = true, hide_env_values = true)]
    pub workspace_token: Option<String>,

    /// Verbose logging to stderr (-v for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Client configuration for these options.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.tracking_uri);
        config.experiment_id = self.experiment_id.clone().filter(|id| !id.is_empty());
        config.workspace_host = self.workspace_host.clone().filter(|h| !h.is_empty());
        if let Some(token) = &self.workspace_token {
            config = config.with_token(token.as_str());
        }
        config
    }
}

/// Configuration plus the clients built from it, shared by all commands.
#[derive(Debug, Clone)]
pub struct Session {
    /// Effective configuration
    pub config: ClientConfig,
    /// Channel to the tracking service
    pub api: ApiClient,
    /// Tracking backend over `api`
    pub tracking: HttpTracking,
}

impl Session {
    /// Build the clients for a configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(&config).context("Failed to create tracking client")?;
        Ok(Self {
            tracking: HttpTracking::new(api.clone()),
            api,
            config,
        })
    }
}

impl Cli {
    /// Execute the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error with user-facing context.
    pub async fn run(self) -> Result<()> {
        let session = Session::connect(self.global.client_config())?;
        match self.command {
            Commands::Run(cmd) => cmd.run(&session).await,
            Commands::Log(cmd) => cmd.run(&session).await,
        }
    }
}
