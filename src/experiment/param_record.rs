//! Param Record - one run parameter

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single `key=value` run parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParamRecord {
    key: String,
    value: String,
}

impl ParamRecord {
    /// Create a new parameter record.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the parameter key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the parameter value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for ParamRecord {
    type Err = Error;

    /// Parse `key=value`, splitting on the first `=`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(Error::InvalidInput(format!(
                "invalid parameter format: {s} (expected key=value)"
            ))),
        }
    }
}
