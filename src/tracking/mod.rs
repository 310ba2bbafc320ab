//! Tracking backend seam
//!
//! Run lifecycle, parameter and metric logging, and artifact-root lookup are
//! plain request/response calls. [`TrackingBackend`] abstracts them so the
//! artifact router and the CLI work the same against the REST service
//! ([`HttpTracking`]) and an in-process store ([`MemoryTracking`]).
//!
//! # Example
//!
//! ```rust
//! use mlflow_cli::experiment::{MetricRecord, RunConfig, RunStatus};
//! use mlflow_cli::tracking::{MemoryTracking, TrackingBackend};
//!
//! # async fn example() -> mlflow_cli::Result<()> {
//! let backend = MemoryTracking::new();
//!
//! let run = backend.create_run(&RunConfig::new("0")).await?;
//! backend.log_param(run.run_id(), "lr", "0.01").await?;
//! backend.log_metric(run.run_id(), &MetricRecord::new("loss", 0.5, 0)).await?;
//! backend.update_run(run.run_id(), RunStatus::Finished).await?;
//!
//! assert_eq!(backend.get_run(run.run_id()).await?.status(), RunStatus::Finished);
//! # Ok(())
//! # }
//! ```

mod http;
mod memory;

pub use http::{HttpTracking, MAX_METRICS_PER_BATCH};
pub use memory::MemoryTracking;

use std::future::Future;

use crate::experiment::{MetricRecord, ParamRecord, RunConfig, RunRecord, RunStatus};
use crate::{Error, Result};

/// Tracking service operations used by the CLI and the artifact router.
pub trait TrackingBackend: Send + Sync {
    /// Create a run in `config.experiment_id`, started now.
    fn create_run(&self, config: &RunConfig) -> impl Future<Output = Result<RunRecord>> + Send;

    /// Change a run's status. Terminal statuses record the end time.
    fn update_run(&self, run_id: &str, status: RunStatus) -> impl Future<Output = Result<()>> + Send;

    /// Fetch a run.
    fn get_run(&self, run_id: &str) -> impl Future<Output = Result<RunRecord>> + Send;

    /// Log one parameter.
    fn log_param(
        &self,
        run_id: &str,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Log one metric.
    fn log_metric(
        &self,
        run_id: &str,
        metric: &MetricRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Artifact root of a run.
    ///
    /// Fails with [`Error::InvalidArtifactUri`] when the run has none.
    fn artifact_uri(&self, run_id: &str) -> impl Future<Output = Result<String>> + Send {
        async move {
            let run = self.get_run(run_id).await?;
            run.artifact_uri()
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidArtifactUri {
                    uri: String::new(),
                    reason: format!("artifact URI not found for run {run_id}"),
                })
        }
    }

    /// Log several parameters, stopping at the first failure.
    fn log_params(
        &self,
        run_id: &str,
        params: &[ParamRecord],
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            for param in params {
                self.log_param(run_id, param.key(), param.value()).await?;
            }
            Ok(())
        }
    }

    /// Log several metrics, stopping at the first failure.
    ///
    /// The default issues one call per metric; backends with a batch endpoint override it.
    fn log_batch(
        &self,
        run_id: &str,
        metrics: &[MetricRecord],
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            for metric in metrics {
                self.log_metric(run_id, metric).await?;
            }
            Ok(())
        }
    }
}
