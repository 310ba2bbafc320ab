//! Metric point expansion: alignment, step assignment, field fan-out

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{align_timestamp, StepMode, TimeConfig};
use crate::experiment::MetricRecord;

/// One input record from a metrics file.
///
/// The three well-known fields default to 0 when absent or null. Any other
/// numeric field is collected into `extra` and logged under its own name;
/// non-numeric fields (labels, nulls, nested values) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Observation time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Explicit step; always wins over the step mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
    /// Logged only when non-zero
    #[serde(default, deserialize_with = "null_as_zero")]
    pub execution_time: f64,
    /// Logged only when non-zero
    #[serde(default, deserialize_with = "null_as_zero")]
    pub success_rate: f64,
    /// Always logged, zero included
    #[serde(default, deserialize_with = "null_as_zero")]
    pub error_count: f64,
    /// Additional scalar fields, logged only when non-zero
    #[serde(flatten, deserialize_with = "numeric_fields")]
    pub extra: BTreeMap<String, f64>,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

fn numeric_fields<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let fields = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(fields
        .into_iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
        .collect())
}

impl MetricPoint {
    /// Set the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set an explicit step.
    #[must_use]
    pub const fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Set `execution_time`.
    #[must_use]
    pub const fn with_execution_time(mut self, value: f64) -> Self {
        self.execution_time = value;
        self
    }

    /// Set `success_rate`.
    #[must_use]
    pub const fn with_success_rate(mut self, value: f64) -> Self {
        self.success_rate = value;
        self
    }

    /// Set `error_count`.
    #[must_use]
    pub const fn with_error_count(mut self, value: f64) -> Self {
        self.error_count = value;
        self
    }

    /// Add an extra named field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Scalar fields in emission order. `error_count` is unconditional.
    fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
        let known = [
            ("execution_time", self.execution_time, false),
            ("success_rate", self.success_rate, false),
            ("error_count", self.error_count, true),
        ];
        known
            .into_iter()
            .chain(self.extra.iter().map(|(k, v)| (k.as_str(), *v, false)))
            .filter(|&(_, value, always)| always || value != 0.0)
            .map(|(key, value, _)| (key, value))
    }
}

/// Normalize `points` into metrics, using the current instant for
/// timestamp-less points.
///
/// `base_time` defaults to the first point's timestamp, else now.
#[must_use]
pub fn process_metrics(
    points: &[MetricPoint],
    config: &TimeConfig,
    base_time: Option<DateTime<Utc>>,
) -> Vec<MetricRecord> {
    process_metrics_at(points, config, base_time, Utc::now())
}

/// [`process_metrics`] with an explicit "now".
#[must_use]
pub fn process_metrics_at(
    points: &[MetricPoint],
    config: &TimeConfig,
    base_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<MetricRecord> {
    let base = base_time
        .or_else(|| points.first().and_then(|p| p.timestamp))
        .unwrap_or(now);

    let mut result: Vec<MetricRecord> = Vec::with_capacity(points.len() * 3);

    for point in points {
        let timestamp = point
            .timestamp
            .map_or(now, |ts| align_timestamp(ts, config.resolution, config.alignment));

        let emitted = i64::try_from(result.len()).unwrap_or(i64::MAX);
        let minutes = (timestamp - base).num_minutes();
        let step = point.step.unwrap_or(match config.step_mode {
            StepMode::Timestamp => minutes,
            StepMode::Sequence => emitted,
            StepMode::Auto if point.timestamp.is_some() => minutes,
            StepMode::Auto => emitted,
        });

        result.extend(point.fields().map(|(key, value)| {
            MetricRecord::builder(key, value)
                .timestamp(timestamp)
                .step(step)
                .build()
        }));
    }

    result
}
