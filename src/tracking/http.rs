//! REST tracking backend
//!
//! Talks to the tracking service's `/api/2.0/mlflow/` endpoints. Timestamps
//! travel as epoch milliseconds; int64 fields may come back as JSON numbers or
//! strings, both are accepted.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use super::TrackingBackend;
use crate::client::ApiClient;
use crate::experiment::{MetricRecord, RunConfig, RunRecord, RunStatus};
use crate::{Error, Result};

const RUNS_CREATE: &str = "/api/2.0/mlflow/runs/create";
const RUNS_UPDATE: &str = "/api/2.0/mlflow/runs/update";
const RUNS_GET: &str = "/api/2.0/mlflow/runs/get";
const LOG_PARAMETER: &str = "/api/2.0/mlflow/runs/log-parameter";
const LOG_METRIC: &str = "/api/2.0/mlflow/runs/log-metric";
const LOG_BATCH: &str = "/api/2.0/mlflow/runs/log-batch";

/// Service-side cap on metrics per log-batch request.
pub const MAX_METRICS_PER_BATCH: usize = 1000;

#[derive(Debug, Serialize, Deserialize)]
struct RunTag {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    experiment_id: &'a str,
    run_name: &'a str,
    start_time: i64,
    tags: Vec<RunTag>,
}

#[derive(Debug, Serialize)]
struct UpdateRunRequest<'a> {
    run_id: &'a str,
    status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<i64>,
}

#[derive(Debug, Serialize)]
struct LogParamRequest<'a> {
    run_id: &'a str,
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct WireMetric<'a> {
    key: &'a str,
    value: f64,
    timestamp: i64,
    step: i64,
}

impl<'a> From<&'a MetricRecord> for WireMetric<'a> {
    fn from(metric: &'a MetricRecord) -> Self {
        Self {
            key: metric.key(),
            value: metric.value(),
            timestamp: metric.timestamp().timestamp_millis(),
            step: metric.step(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LogMetricRequest<'a> {
    run_id: &'a str,
    #[serde(flatten)]
    metric: WireMetric<'a>,
}

#[derive(Debug, Serialize)]
struct LogBatchRequest<'a> {
    run_id: &'a str,
    metrics: Vec<WireMetric<'a>>,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    run: WireRun,
}

#[derive(Debug, Deserialize)]
struct WireRun {
    info: WireRunInfo,
    #[serde(default)]
    data: WireRunData,
}

#[derive(Debug, Deserialize)]
struct WireRunInfo {
    run_id: String,
    #[serde(default)]
    experiment_id: String,
    #[serde(default)]
    run_name: Option<String>,
    #[serde(default)]
    status: Option<RunStatus>,
    #[serde(default, deserialize_with = "millis")]
    start_time: Option<i64>,
    #[serde(default, deserialize_with = "millis")]
    end_time: Option<i64>,
    #[serde(default)]
    artifact_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireRunData {
    #[serde(default)]
    tags: Vec<RunTag>,
}

/// Epoch millis as number or string.
fn millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.filter(|&ms| ms > 0).and_then(DateTime::from_timestamp_millis)
}

impl From<WireRun> for RunRecord {
    fn from(wire: WireRun) -> Self {
        let info = wire.info;
        let mut builder = Self::builder(info.run_id, info.experiment_id)
            .status(info.status.unwrap_or(RunStatus::Running))
            .started_at(from_millis(info.start_time))
            .ended_at(from_millis(info.end_time));
        if let Some(name) = info.run_name.filter(|n| !n.is_empty()) {
            builder = builder.run_name(name);
        }
        if let Some(uri) = info.artifact_uri.filter(|u| !u.is_empty()) {
            builder = builder.artifact_uri(uri);
        }
        for tag in wire.data.tags {
            builder = builder.tag(tag.key, tag.value);
        }
        builder.build()
    }
}

/// Tracking backend over the REST API.
#[derive(Debug, Clone)]
pub struct HttpTracking {
    api: ApiClient,
}

impl HttpTracking {
    /// Wrap an API client.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The underlying API client.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        self.api
            .send(self.api.request(Method::POST, path).json(body))
            .await
    }
}

impl TrackingBackend for HttpTracking {
    async fn create_run(&self, config: &RunConfig) -> Result<RunRecord> {
        if config.experiment_id.is_empty() {
            return Err(Error::InvalidInput("experiment ID must be provided".to_string()));
        }

        let started_at = Utc::now();
        let run_name = config.resolved_run_name(started_at);
        let tags = config
            .resolved_tags(&run_name)
            .into_iter()
            .map(|(key, value)| RunTag { key, value })
            .collect();

        let request = CreateRunRequest {
            experiment_id: &config.experiment_id,
            run_name: &run_name,
            start_time: started_at.timestamp_millis(),
            tags,
        };
        let response: RunResponse = self.post(RUNS_CREATE, &request).await?.json().await?;
        let run = RunRecord::from(response.run);
        info!(run_id = run.run_id(), experiment_id = %config.experiment_id, "created run");
        Ok(run)
    }

    async fn update_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let request = UpdateRunRequest {
            run_id,
            status,
            end_time: status.is_terminal().then(|| Utc::now().timestamp_millis()),
        };
        self.post(RUNS_UPDATE, &request).await?;
        info!(run_id, %status, "updated run");
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let request = self
            .api
            .request(Method::GET, RUNS_GET)
            .query(&[("run_id", run_id)]);
        let response: RunResponse = match self.api.send(request).await {
            Ok(response) => response.json().await?,
            Err(Error::Api { status: 404, .. }) => return Err(Error::RunNotFound(run_id.to_string())),
            Err(e) => return Err(e),
        };
        Ok(response.run.into())
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post(LOG_PARAMETER, &LogParamRequest { run_id, key, value })
            .await?;
        debug!(run_id, key, "logged param");
        Ok(())
    }

    async fn log_metric(&self, run_id: &str, metric: &MetricRecord) -> Result<()> {
        let request = LogMetricRequest {
            run_id,
            metric: metric.into(),
        };
        self.post(LOG_METRIC, &request).await?;
        debug!(run_id, key = metric.key(), step = metric.step(), "logged metric");
        Ok(())
    }

    async fn log_batch(&self, run_id: &str, metrics: &[MetricRecord]) -> Result<()> {
        for chunk in metrics.chunks(MAX_METRICS_PER_BATCH) {
            let request = LogBatchRequest {
                run_id,
                metrics: chunk.iter().map(WireMetric::from).collect(),
            };
            self.post(LOG_BATCH, &request).await?;
            debug!(run_id, count = chunk.len(), "logged metric batch");
        }
        Ok(())
    }
}
