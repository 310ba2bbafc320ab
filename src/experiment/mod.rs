//! Experiment Tracking Records
//!
//! Data structures exchanged with the tracking service.
//!
//! ## Schema Overview
//!
//! ```text
//! experiment (id) ──< RunRecord (N)
//!                        │
//!                        ├──< ParamRecord (N)
//!                        ├──< MetricRecord (N) [time-series]
//!                        └──< ArtifactRecord (N) [under artifact_uri]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use mlflow_cli::experiment::{MetricRecord, RunRecord, RunStatus};
//!
//! let mut run = RunRecord::builder("run-001", "0")
//!     .artifact_uri("mlflow-artifacts:/0/run-001/artifacts")
//!     .build();
//!
//! let metric = MetricRecord::new("execution_time", 1.5, 0);
//! assert_eq!(metric.step(), 0);
//!
//! run.set_status(RunStatus::Finished);
//! assert!(run.ended_at().is_some());
//! ```

mod artifact_record;
mod metric_record;
mod param_record;
mod run_record;

pub use artifact_record::{ArtifactRecord, StorageKind};
pub use metric_record::{MetricRecord, MetricRecordBuilder};
pub use param_record::ParamRecord;
pub use run_record::{
    RunConfig, RunRecord, RunRecordBuilder, RunStatus, DESCRIPTION_TAG, RUN_NAME_TAG,
};
