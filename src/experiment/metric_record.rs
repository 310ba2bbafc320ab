//! Metric Record - one scalar observation logged to a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric Record represents a single metric data point.
///
/// This is the unit the tracking service stores: the time-series normalizer
/// produces these, and both single-metric and batch logging consume them.
///
/// ## Time-Series Semantics
///
/// - `key` + `step` order repeated measurements for plotting
/// - `timestamp` correlates with wall-clock time (sent as epoch millis)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    key: String,
    value: f64,
    timestamp: DateTime<Utc>,
    step: i64,
}

impl MetricRecord {
    /// Create a new metric record.
    ///
    /// # Arguments
    ///
    /// * `key` - Metric name/key (e.g., "`execution_time`", "`error_count`")
    /// * `value` - Metric value
    /// * `step` - Step number
    ///
    /// # Returns
    ///
    /// A new `MetricRecord` with the current timestamp.
    #[must_use]
    pub fn new(key: impl Into<String>, value: f64, step: i64) -> Self {
        Self {
            key: key.into(),
            value,
            timestamp: Utc::now(),
            step,
        }
    }

    /// Create a builder for constructing a metric record with optional fields.
    #[must_use]
    pub fn builder(key: impl Into<String>, value: f64) -> MetricRecordBuilder {
        MetricRecordBuilder::new(key, value)
    }

    /// Get the metric key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the (aligned) timestamp of the observation.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Get the step number.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }
}

/// Builder for `MetricRecord`.
#[derive(Debug)]
pub struct MetricRecordBuilder {
    key: String,
    value: f64,
    timestamp: Option<DateTime<Utc>>,
    step: i64,
}

impl MetricRecordBuilder {
    /// Create a new builder with required fields. Step defaults to 0.
    #[must_use]
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            timestamp: None,
            step: 0,
        }
    }

    /// Set a custom timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the step number.
    #[must_use]
    pub const fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Build the `MetricRecord`. Timestamp defaults to now.
    #[must_use]
    pub fn build(self) -> MetricRecord {
        MetricRecord {
            key: self.key,
            value: self.value,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            step: self.step,
        }
    }
}
