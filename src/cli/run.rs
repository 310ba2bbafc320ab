//! `run start` / `run end`

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use super::Session;
use crate::experiment::{RunConfig, RunStatus};
use crate::parser::parse_key_value;
use crate::tracking::TrackingBackend;

/// Manage run lifecycle
#[derive(Args, Debug, Clone)]
pub struct RunCommand {
    /// Run operation
    #[command(subcommand)]
    pub command: RunSubcommand,
}

/// Run operations
#[derive(Subcommand, Debug, Clone)]
pub enum RunSubcommand {
    /// Create a run and print its ID
    Start(RunStartCommand),

    /// Mark a run as ended
    End(RunEndCommand),
}

/// Start a new run. Only the run ID is printed, for shell capture.
///
/// The experiment comes from `--experiment-id` or `MLFLOW_EXPERIMENT_ID`.
#[derive(Args, Debug, Clone)]
pub struct RunStartCommand {
    /// Run name (default: run-YYYY-MM-DD-HH-MM-SS)
    #[arg(long)]
    pub run_name: Option<String>,

    /// Tag in key=value form (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Run description; \n, \t, \r and \\ are expanded
    #[arg(long)]
    pub description: Option<String>,
}

/// End a run with a terminal status.
#[derive(Args, Debug, Clone)]
pub struct RunEndCommand {
    /// Run to end
    #[arg(long)]
    pub run_id: String,

    /// End status (FINISHED, FAILED, KILLED)
    #[arg(long, default_value = "FINISHED")]
    pub status: String,
}

impl RunCommand {
    /// Execute the run operation.
    ///
    /// # Errors
    ///
    /// Propagates the operation's error.
    pub async fn run(&self, session: &Session) -> Result<()> {
        match &self.command {
            RunSubcommand::Start(cmd) => cmd.run(session).await,
            RunSubcommand::End(cmd) => cmd.run(session).await,
        }
    }
}

impl RunStartCommand {
    /// Build the run configuration from the flags.
    ///
    /// # Errors
    ///
    /// Fails when no experiment is configured or a tag is malformed.
    pub fn run_config(&self, experiment_id: Option<&str>) -> Result<RunConfig> {
        let Some(experiment_id) = experiment_id.filter(|id| !id.is_empty()) else {
            bail!(
                "experiment ID must be specified via --experiment-id flag or MLFLOW_EXPERIMENT_ID environment variable"
            );
        };

        let mut tags = BTreeMap::new();
        for tag in &self.tags {
            let (key, value) =
                parse_key_value(tag).with_context(|| format!("Invalid tag format: {tag}"))?;
            tags.insert(key, value);
        }

        Ok(RunConfig {
            experiment_id: experiment_id.to_string(),
            run_name: self.run_name.clone().filter(|n| !n.is_empty()),
            tags,
            description: self
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(unescape_description),
        })
    }

    /// Create the run and print its ID.
    ///
    /// # Errors
    ///
    /// Fails on invalid flags or when the tracking service rejects the run.
    pub async fn run(&self, session: &Session) -> Result<()> {
        let config = self.run_config(session.config.experiment_id.as_deref())?;
        let run = session
            .tracking
            .create_run(&config)
            .await
            .context("Failed to create run")?;

        info!(run_id = run.run_id(), run_name = ?run.run_name(), "run started");
        println!("{}", run.run_id());
        Ok(())
    }
}

impl RunEndCommand {
    /// Parse `--status`; only terminal statuses are accepted.
    ///
    /// # Errors
    ///
    /// Fails for anything other than FINISHED, FAILED or KILLED.
    pub fn end_status(&self) -> Result<RunStatus> {
        match self.status.parse::<RunStatus>() {
            Ok(status) if status.is_terminal() => Ok(status),
            _ => bail!("invalid status: {} (valid: FINISHED, FAILED, KILLED)", self.status),
        }
    }

    /// End the run.
    ///
    /// # Errors
    ///
    /// Fails on an invalid status or when the update is rejected.
    pub async fn run(&self, session: &Session) -> Result<()> {
        let status = self.end_status()?;
        session
            .tracking
            .update_run(&self.run_id, status)
            .await
            .context("Failed to end run")?;

        println!("Run ended successfully");
        println!("Run ID: {}", self.run_id);
        println!("Status: {status}");
        Ok(())
    }
}

/// Expand `\n`, `\t`, `\r` and `\\` in a description typed on the command line.
/// Other backslash sequences are kept as written.
#[must_use]
pub fn unescape_description(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
