//! # mlflow-cli: Experiment Tracking from the Command Line
//!
//! **Version**: 0.1.0
//!
//! Records runs, parameters, time-aligned metrics and artifacts on an MLflow
//! tracking server or a managed workspace.
//!
//! ## Core Components
//!
//! - **Artifact router** ([`artifact`]): classifies a run's artifact root and
//!   uploads to the tracking server, to cloud storage through signed URIs, or
//!   to a local directory
//! - **Time-series normalizer** ([`timeseries`]): snaps timestamps onto a
//!   1m/5m/1h grid and assigns steps under one of three policies
//! - **Tracking backend** ([`tracking`]): run lifecycle and logging over REST
//!   or in memory
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use mlflow_cli::timeseries::{process_metrics, MetricPoint, TimeConfig};
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let points = vec![
//!     MetricPoint::default().with_timestamp(t0).with_execution_time(1.5).with_error_count(2.0),
//!     MetricPoint::default()
//!         .with_timestamp(t0 + chrono::TimeDelta::seconds(90))
//!         .with_execution_time(1.3)
//!         .with_error_count(1.0),
//! ];
//!
//! let config = TimeConfig::parse("1m", "floor", "timestamp")?;
//! let metrics = process_metrics(&points, &config, Some(t0));
//!
//! assert_eq!(metrics.len(), 4);
//! assert_eq!(metrics[2].step(), 1);
//! # Ok::<(), mlflow_cli::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifact;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod experiment;
pub mod parser;
pub mod timeseries;
pub mod tracking;

pub use error::{Error, Result};
