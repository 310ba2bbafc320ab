//! In-memory tracking backend using `DashMap`.
//!
//! Data is lost on process restart. Useful for tests and for embedding the
//! artifact router without a tracking server.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;

use super::TrackingBackend;
use crate::experiment::{MetricRecord, RunConfig, RunRecord, RunStatus};
use crate::{Error, Result};

/// In-memory tracking store.
///
/// Thread-safe; runs, parameters and metrics are keyed by run ID.
///
/// # Example
///
/// ```rust
/// use mlflow_cli::experiment::RunRecord;
/// use mlflow_cli::tracking::{MemoryTracking, TrackingBackend};
///
/// # async fn example() -> mlflow_cli::Result<()> {
/// let backend = MemoryTracking::new();
/// backend.insert_run(
///     RunRecord::builder("abc", "0").artifact_uri("/tmp/artifacts").build(),
/// );
/// assert_eq!(backend.artifact_uri("abc").await?, "/tmp/artifacts");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryTracking {
    artifact_root: Option<String>,
    next_id: AtomicU64,
    runs: DashMap<String, RunRecord>,
    params: DashMap<String, BTreeMap<String, String>>,
    metrics: DashMap<String, Vec<MetricRecord>>,
}

impl MemoryTracking {
    /// Create an empty store. Created runs get no artifact root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose runs live under
    /// `{root}/{experiment_id}/{run_id}/artifacts`.
    #[must_use]
    pub fn with_artifact_root(root: impl Into<String>) -> Self {
        Self {
            artifact_root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Insert or replace a run as-is.
    pub fn insert_run(&self, run: RunRecord) {
        self.runs.insert(run.run_id().to_string(), run);
    }

    /// Get the number of runs in the store.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Check if the store has no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Parameters logged to a run.
    #[must_use]
    pub fn params_for_run(&self, run_id: &str) -> BTreeMap<String, String> {
        self.params
            .get(run_id)
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }

    /// Metrics for a run and key, ordered by step.
    #[must_use]
    pub fn metrics_for_run(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .get(run_id)
            .map(|m| m.iter().filter(|m| m.key() == key).cloned().collect())
            .unwrap_or_default();

        // Stable: equal steps keep logging order
        metrics.sort_by_key(MetricRecord::step);

        metrics
    }

    fn ensure_run(&self, run_id: &str) -> Result<()> {
        if self.runs.contains_key(run_id) {
            Ok(())
        } else {
            Err(Error::RunNotFound(run_id.to_string()))
        }
    }
}

impl TrackingBackend for MemoryTracking {
    async fn create_run(&self, config: &RunConfig) -> Result<RunRecord> {
        if config.experiment_id.is_empty() {
            return Err(Error::InvalidInput("experiment ID must be provided".to_string()));
        }

        let run_id = format!("{:032x}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let started_at = Utc::now();
        let run_name = config.resolved_run_name(started_at);

        let mut builder = RunRecord::builder(&run_id, &config.experiment_id)
            .run_name(&run_name)
            .started_at(Some(started_at));
        for (key, value) in config.resolved_tags(&run_name) {
            builder = builder.tag(key, value);
        }
        if let Some(root) = &self.artifact_root {
            builder = builder.artifact_uri(format!(
                "{}/{}/{}/artifacts",
                root.trim_end_matches('/'),
                config.experiment_id,
                run_id
            ));
        }

        let run = builder.build();
        self.insert_run(run.clone());
        Ok(run)
    }

    async fn update_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        run.set_status(status);
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.runs
            .get(run_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.ensure_run(run_id)?;
        self.params
            .entry(run_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn log_metric(&self, run_id: &str, metric: &MetricRecord) -> Result<()> {
        self.ensure_run(run_id)?;
        self.metrics
            .entry(run_id.to_string())
            .or_default()
            .push(metric.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_run_generates_unique_ids() {
        let store = MemoryTracking::new();
        let a = store.create_run(&RunConfig::new("0")).await.unwrap();
        let b = store.create_run(&RunConfig::new("0")).await.unwrap();
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 32);
        assert_eq!(store.run_count(), 2);
    }

    #[tokio::test]
    async fn test_create_run_requires_experiment() {
        let store = MemoryTracking::new();
        let err = store.create_run(&RunConfig::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_run_sets_name_and_description() {
        let store = MemoryTracking::new();
        let mut config = RunConfig::new("0");
        config.run_name = Some("baseline".to_string());
        config.description = Some("first try".to_string());

        let run = store.create_run(&config).await.unwrap();
        assert_eq!(run.run_name(), Some("baseline"));
        assert_eq!(run.description(), Some("first try"));
        assert!(run.artifact_uri().is_none());
    }

    #[tokio::test]
    async fn test_update_run_missing() {
        let store = MemoryTracking::new();
        let err = store.update_run("x", RunStatus::Killed).await.unwrap_err();
        assert!(matches!(err, Error::RunNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_run_terminal_sets_end() {
        let store = MemoryTracking::new();
        let run = store.create_run(&RunConfig::new("0")).await.unwrap();
        store.update_run(run.run_id(), RunStatus::Failed).await.unwrap();
        let run = store.get_run(run.run_id()).await.unwrap();
        assert_eq!(run.status(), RunStatus::Failed);
        assert!(run.ended_at().is_some());
    }

    #[tokio::test]
    async fn test_param_overwrite() {
        let store = MemoryTracking::new();
        store.insert_run(RunRecord::new("r", "0"));
        store.log_param("r", "lr", "0.1").await.unwrap();
        store.log_param("r", "lr", "0.2").await.unwrap();
        assert_eq!(store.params_for_run("r").get("lr").map(String::as_str), Some("0.2"));
    }

    #[tokio::test]
    async fn test_metrics_for_run_ordering() {
        let store = MemoryTracking::new();
        store.insert_run(RunRecord::new("r", "0"));

        // Add out of order
        store.log_metric("r", &MetricRecord::new("loss", 0.2, 2)).await.unwrap();
        store.log_metric("r", &MetricRecord::new("loss", 0.0, 0)).await.unwrap();
        store.log_metric("r", &MetricRecord::new("acc", 0.9, 1)).await.unwrap();
        store.log_metric("r", &MetricRecord::new("loss", 0.1, 1)).await.unwrap();

        let metrics = store.metrics_for_run("r", "loss");
        let steps: Vec<i64> = metrics.iter().map(MetricRecord::step).collect();
        assert_eq!(steps, [0, 1, 2]);
    }

    #[tokio::test]
    async fn test_concurrent_metric_logging() {
        use std::sync::Arc;

        let store = Arc::new(MemoryTracking::new());
        store.insert_run(RunRecord::new("r", "0"));
        let mut handles = vec![];

        for step in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .log_metric("r", &MetricRecord::new("loss", 1.0, step))
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.metrics_for_run("r", "loss").len(), 50);
    }
}
