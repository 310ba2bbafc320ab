//! Time-series metric normalization
//!
//! Snaps metric timestamps onto a fixed resolution grid and derives step
//! numbers, expanding each input [`MetricPoint`] into one
//! [`MetricRecord`](crate::experiment::MetricRecord) per scalar field.
//!
//! ## Alignment
//!
//! ```text
//!            floor          t        ceil
//!   ───────────┼────────────●──────────┼──────────
//!              │<─ rem ────>│          │
//!              │<──────── resolution ─>│
//!
//!   round = floor if rem < resolution/2, else ceil
//! ```
//!
//! The grid is anchored at the Unix epoch, so every resolution divides a day
//! evenly.
//!
//! ## Usage
//!
//! ```rust
//! use mlflow_cli::timeseries::{process_metrics, MetricPoint, TimeConfig};
//!
//! let config = TimeConfig::parse("1m", "floor", "sequence")?;
//! let points = vec![MetricPoint::default().with_error_count(2.0)];
//! let metrics = process_metrics(&points, &config, None);
//! assert_eq!(metrics.len(), 1);
//! assert_eq!(metrics[0].key(), "error_count");
//! # Ok::<(), mlflow_cli::Error>(())
//! ```

mod normalizer;

pub use normalizer::{process_metrics, process_metrics_at, MetricPoint};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{Error, Result};

/// Width of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `1m`
    OneMinute,
    /// `5m`
    FiveMinutes,
    /// `1h`
    OneHour,
}

impl Resolution {
    /// Grid width in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinutes => 5 * 60,
            Self::OneHour => 60 * 60,
        }
    }

    /// Grid width as a duration.
    #[must_use]
    pub fn duration(self) -> TimeDelta {
        TimeDelta::seconds(self.seconds())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "1h" => Ok(Self::OneHour),
            other => Err(Error::UnsupportedResolution(other.to_string())),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneMinute => write!(f, "1m"),
            Self::FiveMinutes => write!(f, "5m"),
            Self::OneHour => write!(f, "1h"),
        }
    }
}

/// How a timestamp is snapped onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Previous grid point (or itself when aligned)
    Floor,
    /// Next grid point (or itself when aligned)
    Ceil,
    /// Nearest grid point, ties go up
    Round,
}

impl FromStr for Alignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "floor" => Ok(Self::Floor),
            "ceil" => Ok(Self::Ceil),
            "round" => Ok(Self::Round),
            other => Err(Error::UnsupportedAlignment(other.to_string())),
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Floor => write!(f, "floor"),
            Self::Ceil => write!(f, "ceil"),
            Self::Round => write!(f, "round"),
        }
    }
}

/// How steps are derived for points without an explicit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Timestamp rule when the point has a timestamp, sequence rule otherwise
    Auto,
    /// Whole minutes since the base time
    Timestamp,
    /// Count of metrics emitted so far
    Sequence,
}

impl FromStr for StepMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "timestamp" => Ok(Self::Timestamp),
            "sequence" => Ok(Self::Sequence),
            other => Err(Error::UnsupportedStepMode(other.to_string())),
        }
    }
}

impl fmt::Display for StepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Sequence => write!(f, "sequence"),
        }
    }
}

/// Normalization settings for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeConfig {
    /// Grid width
    pub resolution: Resolution,
    /// Snapping policy
    pub alignment: Alignment,
    /// Step derivation policy
    pub step_mode: StepMode,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::OneMinute,
            alignment: Alignment::Floor,
            step_mode: StepMode::Auto,
        }
    }
}

impl TimeConfig {
    /// Parse all three settings. Nothing is normalized until every value is recognized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedResolution`], [`Error::UnsupportedAlignment`]
    /// or [`Error::UnsupportedStepMode`].
    pub fn parse(resolution: &str, alignment: &str, step_mode: &str) -> Result<Self> {
        Ok(Self {
            resolution: resolution.parse()?,
            alignment: alignment.parse()?,
            step_mode: step_mode.parse()?,
        })
    }
}

impl fmt::Display for TimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resolution={}, alignment={}, step_mode={}",
            self.resolution, self.alignment, self.step_mode
        )
    }
}

/// Distance from the previous grid point.
fn remainder(ts: DateTime<Utc>, resolution: Resolution) -> TimeDelta {
    let secs = ts.timestamp().rem_euclid(resolution.seconds());
    TimeDelta::seconds(secs) + TimeDelta::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
}

/// Snap `ts` onto the `resolution` grid using `alignment`.
#[must_use]
pub fn align_timestamp(ts: DateTime<Utc>, resolution: Resolution, alignment: Alignment) -> DateTime<Utc> {
    let rem = remainder(ts, resolution);
    let floor = ts - rem;
    let advance = match alignment {
        Alignment::Floor => false,
        Alignment::Ceil => rem > TimeDelta::zero(),
        Alignment::Round => rem * 2 >= resolution.duration(),
    };
    if advance {
        floor + resolution.duration()
    } else {
        floor
    }
}
