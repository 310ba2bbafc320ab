//! Time-series normalization scenarios
//!
//! End-to-end: metrics file -> points -> aligned, stepped metric records.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use mlflow_cli::config::ClientConfig;
use mlflow_cli::experiment::MetricRecord;
use mlflow_cli::parser::metrics_from_json;
use mlflow_cli::timeseries::{process_metrics, process_metrics_at, MetricPoint, TimeConfig};
use mlflow_cli::Error;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn summary(metrics: &[MetricRecord]) -> Vec<(&str, f64, DateTime<Utc>, i64)> {
    metrics
        .iter()
        .map(|m| (m.key(), m.value(), m.timestamp(), m.step()))
        .collect()
}

#[test]
fn test_two_points_floor_timestamp_mode() {
    let points = vec![
        MetricPoint::default()
            .with_timestamp(t0())
            .with_execution_time(1.5)
            .with_error_count(2.0),
        MetricPoint::default()
            .with_timestamp(t0() + TimeDelta::seconds(90))
            .with_execution_time(1.3)
            .with_error_count(1.0),
    ];
    let config = TimeConfig::parse("1m", "floor", "timestamp").unwrap();

    let metrics = process_metrics(&points, &config, Some(t0()));

    assert_eq!(
        summary(&metrics),
        [
            ("execution_time", 1.5, t0(), 0),
            ("error_count", 2.0, t0(), 0),
            ("execution_time", 1.3, t0() + TimeDelta::seconds(60), 1),
            ("error_count", 1.0, t0() + TimeDelta::seconds(60), 1),
        ]
    );
}

#[test]
fn test_file_to_metrics_five_minute_round() {
    let json = r#"{"metrics": [
        {"timestamp": "2024-03-01T12:02:29Z", "success_rate": 0.98, "error_count": 0},
        {"timestamp": "2024-03-01T12:07:30Z", "success_rate": 0.95, "error_count": 3},
        {"timestamp": "2024-03-01T12:14:00Z", "step": 100, "error_count": 1}
    ]}"#;
    let points = metrics_from_json(json.as_bytes()).unwrap();
    let config = TimeConfig::parse("5m", "round", "auto").unwrap();

    let metrics = process_metrics(&points, &config, None);
    let rows = summary(&metrics);

    // Base is the first raw timestamp (12:02:29); 12:00 is 2m29s before it.
    assert_eq!(rows[0], ("success_rate", 0.98, t0(), -2));
    assert_eq!(rows[1], ("error_count", 0.0, t0(), -2));
    assert_eq!(rows[2].2, t0() + TimeDelta::minutes(10));
    assert_eq!(rows[2].3, 7);
    assert_eq!(rows[4], ("error_count", 1.0, t0() + TimeDelta::minutes(15), 100));
    assert_eq!(rows.len(), 5);
}

#[test]
fn test_hourly_ceil_sequence() {
    let points = vec![
        MetricPoint::default()
            .with_timestamp(t0() + TimeDelta::minutes(1))
            .with_execution_time(2.0)
            .with_error_count(0.0),
        MetricPoint::default()
            .with_timestamp(t0() + TimeDelta::hours(1))
            .with_error_count(5.0),
    ];
    let config = TimeConfig::parse("1h", "ceil", "sequence").unwrap();

    let metrics = process_metrics(&points, &config, None);

    assert_eq!(
        summary(&metrics),
        [
            ("execution_time", 2.0, t0() + TimeDelta::hours(1), 0),
            ("error_count", 0.0, t0() + TimeDelta::hours(1), 0),
            ("error_count", 5.0, t0() + TimeDelta::hours(1), 2),
        ]
    );
}

#[test]
fn test_mixed_timestamps_auto_mode() {
    let now = t0() + TimeDelta::days(1);
    let points = vec![
        MetricPoint::default().with_timestamp(t0()).with_error_count(1.0),
        MetricPoint::default().with_error_count(2.0),
        MetricPoint::default()
            .with_timestamp(t0() + TimeDelta::minutes(3))
            .with_error_count(3.0),
    ];
    let config = TimeConfig::default();

    let metrics = process_metrics_at(&points, &config, None, now);

    assert_eq!(
        summary(&metrics),
        [
            ("error_count", 1.0, t0(), 0),
            ("error_count", 2.0, now, 1),
            ("error_count", 3.0, t0() + TimeDelta::minutes(3), 3),
        ]
    );
}

#[test]
fn test_invalid_configuration_rejected_before_processing() {
    let config = ClientConfig::default();
    assert!(matches!(
        config.time_config(Some("10m"), None, None),
        Err(Error::UnsupportedResolution(_))
    ));
    assert!(matches!(
        config.time_config(None, Some("up"), None),
        Err(Error::UnsupportedAlignment(_))
    ));
    assert_eq!(
        config.time_config(None, None, None).unwrap(),
        TimeConfig::default()
    );
}
