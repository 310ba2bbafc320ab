//! Run Record - execution instance of an experiment

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tag carrying the human-readable run name.
pub const RUN_NAME_TAG: &str = "mlflow.runName";

/// Tag carrying the run description.
pub const DESCRIPTION_TAG: &str = "mlflow.note.content";

/// Status of a run, with the tracking service's wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is currently executing.
    Running,
    /// Run is queued but not yet started.
    Scheduled,
    /// Run completed successfully.
    Finished,
    /// Run failed with an error.
    Failed,
    /// Run was killed by user or system.
    Killed,
}

impl RunStatus {
    /// Whether the run has ended (an end time is recorded).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Scheduled => "SCHEDULED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "SCHEDULED" => Ok(Self::Scheduled),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "KILLED" => Ok(Self::Killed),
            other => Err(Error::InvalidInput(format!(
                "invalid status: {other} (valid: RUNNING, SCHEDULED, FINISHED, FAILED, KILLED)"
            ))),
        }
    }
}

/// Run Record represents a single execution of an experiment.
///
/// Each experiment can have multiple runs. A run tracks the execution
/// lifecycle from start to completion, and points at the artifact root
/// where its files are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    run_id: String,
    experiment_id: String,
    run_name: Option<String>,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    artifact_uri: Option<String>,
    tags: BTreeMap<String, String>,
}

impl RunRecord {
    /// Create a new run record in Running status, started now.
    ///
    /// # Arguments
    ///
    /// * `run_id` - Unique identifier for the run
    /// * `experiment_id` - ID of the parent experiment
    #[must_use]
    pub fn new(run_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self::builder(run_id, experiment_id).build()
    }

    /// Create a builder for constructing a run record with optional fields.
    #[must_use]
    pub fn builder(
        run_id: impl Into<String>,
        experiment_id: impl Into<String>,
    ) -> RunRecordBuilder {
        RunRecordBuilder::new(run_id, experiment_id)
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the parent experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the run name, falling back to the run-name tag.
    #[must_use]
    pub fn run_name(&self) -> Option<&str> {
        self.run_name
            .as_deref()
            .or_else(|| self.tags.get(RUN_NAME_TAG).map(String::as_str))
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if known.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has ended.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Get the artifact root URI, if the service reported one.
    #[must_use]
    pub fn artifact_uri(&self) -> Option<&str> {
        self.artifact_uri.as_deref().filter(|uri| !uri.is_empty())
    }

    /// Get all tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Get the description stored in the description tag.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.tags.get(DESCRIPTION_TAG).map(String::as_str)
    }

    /// Move the run to `status`. Terminal statuses record the end time.
    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        if status.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
    }
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    record: RunRecord,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(run_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            record: RunRecord {
                run_id: run_id.into(),
                experiment_id: experiment_id.into(),
                run_name: None,
                status: RunStatus::Running,
                started_at: Some(Utc::now()),
                ended_at: None,
                artifact_uri: None,
                tags: BTreeMap::new(),
            },
        }
    }

    /// Set the run name.
    #[must_use]
    pub fn run_name(mut self, name: impl Into<String>) -> Self {
        self.record.run_name = Some(name.into());
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: RunStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Set the start time.
    #[must_use]
    pub const fn started_at(mut self, started_at: Option<DateTime<Utc>>) -> Self {
        self.record.started_at = started_at;
        self
    }

    /// Set the end time.
    #[must_use]
    pub const fn ended_at(mut self, ended_at: Option<DateTime<Utc>>) -> Self {
        self.record.ended_at = ended_at;
        self
    }

    /// Set the artifact root URI.
    #[must_use]
    pub fn artifact_uri(mut self, uri: impl Into<String>) -> Self {
        self.record.artifact_uri = Some(uri.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.record.tags.insert(key.into(), value.into());
        self
    }

    /// Build the `RunRecord`.
    #[must_use]
    pub fn build(self) -> RunRecord {
        self.record
    }
}

/// Input of run creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Experiment the run belongs to
    pub experiment_id: String,
    /// Run name; generated from the start time when absent
    pub run_name: Option<String>,
    /// User tags
    pub tags: BTreeMap<String, String>,
    /// Free-form description, stored as a tag
    pub description: Option<String>,
}

impl RunConfig {
    /// Config for a run in `experiment_id`.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            ..Self::default()
        }
    }

    /// Run name, or `run-YYYY-MM-DD-HH-MM-SS` for `started_at`.
    #[must_use]
    pub fn resolved_run_name(&self, started_at: DateTime<Utc>) -> String {
        self.run_name
            .clone()
            .unwrap_or_else(|| format!("run-{}", started_at.format("%Y-%m-%d-%H-%M-%S")))
    }

    /// User tags plus the run-name and description tags.
    #[must_use]
    pub fn resolved_tags(&self, run_name: &str) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.insert(RUN_NAME_TAG.to_string(), run_name.to_string());
        if let Some(description) = &self.description {
            tags.insert(DESCRIPTION_TAG.to_string(), description.clone());
        }
        tags
    }
}
