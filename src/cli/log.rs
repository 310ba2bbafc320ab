//! `log params` / `log metric` / `log metrics` / `log artifact`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use super::Session;
use crate::artifact::{ArtifactRouter, UploadRequest};
use crate::experiment::{MetricRecord, ParamRecord};
use crate::parser::{parse_metrics_file, parse_params_file};
use crate::timeseries::process_metrics;
use crate::tracking::TrackingBackend;

/// Log data to an existing run
#[derive(Args, Debug, Clone)]
pub struct LogCommand {
    /// What to log
    #[command(subcommand)]
    pub command: LogSubcommand,
}

/// Log operations
#[derive(Subcommand, Debug, Clone)]
pub enum LogSubcommand {
    /// Log parameters from flags and/or a file
    Params(LogParamsCommand),

    /// Log a single metric value
    Metric(LogMetricCommand),

    /// Normalize and log metrics from a file
    Metrics(LogMetricsCommand),

    /// Upload files as run artifacts
    Artifact(LogArtifactCommand),
}

/// Log parameters to a run.
#[derive(Args, Debug, Clone)]
pub struct LogParamsCommand {
    /// Run to log to
    #[arg(long)]
    pub run_id: String,

    /// Parameter in key=value form (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Parameters file (.json, .yaml, .yml)
    #[arg(long)]
    pub from_file: Option<PathBuf>,
}

/// Log one metric to a run.
#[derive(Args, Debug, Clone)]
pub struct LogMetricCommand {
    /// Run to log to
    #[arg(long)]
    pub run_id: String,

    /// Metric name
    #[arg(long)]
    pub name: String,

    /// Metric value
    #[arg(long, allow_negative_numbers = true)]
    pub value: f64,

    /// Step number (default 0)
    #[arg(long)]
    pub step: Option<i64>,

    /// Timestamp, RFC 3339 (default now)
    #[arg(long)]
    pub timestamp: Option<String>,
}

/// Log metrics from a file, aligned to a time grid.
///
/// # Example
///
/// ```bash
/// mlflow-cli log metrics --run-id <run-id> --from-file metrics.yaml \
///     --time-resolution 5m --time-alignment round --step-mode timestamp
/// ```
#[derive(Args, Debug, Clone)]
pub struct LogMetricsCommand {
    /// Run to log to
    #[arg(long)]
    pub run_id: String,

    /// Metrics file (.json, .yaml, .yml)
    #[arg(long)]
    pub from_file: PathBuf,

    /// Time resolution (1m, 5m, 1h)
    #[arg(long, env = "MLFLOW_TIME_RESOLUTION")]
    pub time_resolution: Option<String>,

    /// Time alignment (floor, ceil, round)
    #[arg(long, env = "MLFLOW_TIME_ALIGNMENT")]
    pub time_alignment: Option<String>,

    /// Step mode (auto, timestamp, sequence)
    #[arg(long, env = "MLFLOW_STEP_MODE")]
    pub step_mode: Option<String>,
}

/// Upload files as artifacts of a run.
///
/// # Example
///
/// ```bash
/// mlflow-cli log artifact --run-id <run-id> --file model.pkl --artifact-path models/final_model.pkl
/// mlflow-cli log artifact --run-id <run-id> --file model.pkl --file config.yaml
/// ```
#[derive(Args, Debug, Clone)]
pub struct LogArtifactCommand {
    /// Run to upload to
    #[arg(long)]
    pub run_id: String,

    /// File to upload (repeatable)
    #[arg(long = "file", required = true)]
    pub files: Vec<PathBuf>,

    /// Artifact path; only with a single file
    #[arg(long)]
    pub artifact_path: Option<String>,
}

impl LogCommand {
    /// Execute the log operation.
    ///
    /// # Errors
    ///
    /// Propagates the operation's error.
    pub async fn run(&self, session: &Session) -> Result<()> {
        match &self.command {
            LogSubcommand::Params(cmd) => cmd.run(session).await,
            LogSubcommand::Metric(cmd) => cmd.run(session).await,
            LogSubcommand::Metrics(cmd) => cmd.run(session).await,
            LogSubcommand::Artifact(cmd) => cmd.run(session).await,
        }
    }
}

fn print_params(params: &[ParamRecord]) {
    for param in params {
        println!("  {}: {}", param.key(), param.value());
    }
}

impl LogParamsCommand {
    /// Parameters given with `--param`.
    ///
    /// # Errors
    ///
    /// Fails on a malformed pair.
    pub fn flag_params(&self) -> Result<Vec<ParamRecord>> {
        self.params
            .iter()
            .map(|pair| {
                pair.parse::<ParamRecord>()
                    .with_context(|| format!("invalid parameter format: {pair} (expected key=value)"))
            })
            .collect()
    }

    /// Log the parameters.
    ///
    /// # Errors
    ///
    /// Fails when neither source is given, on bad input, or when logging fails.
    pub async fn run(&self, session: &Session) -> Result<()> {
        if self.params.is_empty() && self.from_file.is_none() {
            bail!("either --param or --from-file must be specified");
        }

        if !self.params.is_empty() {
            let params = self.flag_params()?;
            session
                .tracking
                .log_params(&self.run_id, &params)
                .await
                .context("Failed to log parameters")?;
            println!("Successfully logged {} parameters", params.len());
            print_params(&params);
        }

        if let Some(path) = &self.from_file {
            let params = parse_params_file(path)
                .with_context(|| format!("Failed to parse parameters file {}", path.display()))?;
            session
                .tracking
                .log_params(&self.run_id, &params)
                .await
                .context("Failed to log parameters from file")?;
            println!(
                "Successfully logged {} parameters from {}",
                params.len(),
                path.display()
            );
            print_params(&params);
        }

        Ok(())
    }
}

impl LogMetricCommand {
    /// The metric described by the flags.
    ///
    /// # Errors
    ///
    /// Fails if `--timestamp` is not RFC 3339.
    pub fn metric(&self) -> Result<MetricRecord> {
        let mut builder = MetricRecord::builder(&self.name, self.value).step(self.step.unwrap_or(0));
        if let Some(raw) = &self.timestamp {
            let timestamp = DateTime::parse_from_rfc3339(raw)
                .with_context(|| format!("invalid timestamp format: {raw} (expected RFC 3339)"))?
                .with_timezone(&Utc);
            builder = builder.timestamp(timestamp);
        }
        Ok(builder.build())
    }

    /// Log the metric.
    ///
    /// # Errors
    ///
    /// Fails on bad input or when logging fails.
    pub async fn run(&self, session: &Session) -> Result<()> {
        let metric = self.metric()?;
        session
            .tracking
            .log_metric(&self.run_id, &metric)
            .await
            .context("Failed to log metric")?;

        println!(
            "Successfully logged metric: {} = {} (step: {}) (timestamp: {})",
            metric.key(),
            metric.value(),
            metric.step(),
            metric.timestamp().to_rfc3339()
        );
        Ok(())
    }
}

impl LogMetricsCommand {
    /// Read, normalize and log the metrics file.
    ///
    /// # Errors
    ///
    /// Fails on an invalid time configuration (before reading the file), on
    /// bad input, or when logging fails.
    pub async fn run(&self, session: &Session) -> Result<()> {
        let time_config = session
            .config
            .time_config(
                self.time_resolution.as_deref(),
                self.time_alignment.as_deref(),
                self.step_mode.as_deref(),
            )
            .context("Invalid time configuration")?;

        let points = parse_metrics_file(&self.from_file).with_context(|| {
            format!("Failed to parse metrics file {}", self.from_file.display())
        })?;
        let metrics = process_metrics(&points, &time_config, None);

        session
            .tracking
            .log_batch(&self.run_id, &metrics)
            .await
            .context("Failed to log metrics")?;

        let mut per_key: BTreeMap<&str, usize> = BTreeMap::new();
        for metric in &metrics {
            *per_key.entry(metric.key()).or_default() += 1;
        }

        println!(
            "Successfully logged {} metrics from {} points in {} ({time_config})",
            metrics.len(),
            points.len(),
            self.from_file.display()
        );
        for (key, count) in per_key {
            println!("  {key}: {count}");
        }
        Ok(())
    }
}

/// One stderr line per failed file; local problems are reported as skips.
fn failure_line(path: &Path, error: &crate::Error) -> String {
    if error.is_upload_error() {
        format!("Failed to upload {}: {error}", path.display())
    } else {
        format!("Skipped {}: {error}", path.display())
    }
}

impl LogArtifactCommand {
    /// Upload requests for the given files.
    ///
    /// # Errors
    ///
    /// Fails if `--artifact-path` is combined with several files.
    pub fn requests(&self) -> Result<Vec<UploadRequest>> {
        if self.files.is_empty() {
            bail!("at least one file must be specified");
        }
        if self.files.len() > 1 && self.artifact_path.is_some() {
            bail!("--artifact-path can only be used when uploading a single file");
        }

        Ok(self
            .files
            .iter()
            .map(|file| {
                let request = UploadRequest::new(file);
                match &self.artifact_path {
                    Some(path) => request.with_artifact_path(path),
                    None => request,
                }
            })
            .collect())
    }

    /// Upload the files.
    ///
    /// # Errors
    ///
    /// Fails on bad flags, when the artifact root cannot be resolved, or when
    /// no file was uploaded.
    pub async fn run(&self, session: &Session) -> Result<()> {
        let requests = self.requests()?;
        let router = ArtifactRouter::new(session.tracking.clone(), session.api.clone());

        let report = router
            .upload_many(&self.run_id, &requests)
            .await
            .context("Failed to upload artifacts")?;

        for (path, error) in report.failed() {
            eprintln!("{}", failure_line(path, error));
        }

        match report.succeeded() {
            [only] if report.total() == 1 => {
                println!("Successfully uploaded artifact: {}", only.local_path().display());
                println!("  Artifact path: {}", only.artifact_path());
            }
            succeeded => {
                println!(
                    "Successfully uploaded {}/{} artifacts",
                    succeeded.len(),
                    report.total()
                );
            }
        }
        Ok(())
    }
}
