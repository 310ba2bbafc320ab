//! Client configuration
//!
//! A [`ClientConfig`] is built once per invocation (by the CLI from flags and
//! environment variables, or directly by embedders and tests) and handed to
//! every component that talks to the tracking service. Nothing reads ambient
//! global state.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::timeseries::TimeConfig;
use crate::{Error, Result};

/// Default tracking server for local development.
pub const DEFAULT_TRACKING_URI: &str = "http://localhost:5000";

/// Managed workspace host suffixes.
const WORKSPACE_DOMAINS: [&str; 3] = [
    ".cloud.databricks.com",
    ".azuredatabricks.net",
    ".gcp.databricks.com",
];

const WORKSPACE_SCHEME: &str = "databricks";
const WORKSPACE_PROFILE_PREFIX: &str = "databricks://";

/// A string that is zeroized on drop and redacted in `Debug`/`Display`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self { inner: secret }
    }

    /// Expose the secret value. Only call this when building the request that needs it.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Whether the secret is empty, without exposing it.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretString")
            .field("inner", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl From<&str> for SecretString {
    fn from(secret: &str) -> Self {
        Self::new(secret.to_string())
    }
}

/// Configuration shared by the tracking client, the credential broker and the uploaders.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Tracking server URL, or `databricks` / `databricks://<profile>` for a managed workspace
    pub tracking_uri: String,
    /// Default experiment for new runs
    pub experiment_id: Option<String>,
    /// Default time resolution for metric files (`1m`, `5m`, `1h`)
    pub time_resolution: String,
    /// Default time alignment for metric files (`floor`, `ceil`, `round`)
    pub time_alignment: String,
    /// Default step mode for metric files (`auto`, `timestamp`, `sequence`)
    pub step_mode: String,
    /// Managed workspace host
    pub workspace_host: Option<String>,
    /// Managed workspace token; the only credential source for credentialed uploads
    pub workspace_token: Option<SecretString>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tracking_uri: DEFAULT_TRACKING_URI.to_string(),
            experiment_id: None,
            time_resolution: "1m".to_string(),
            time_alignment: "floor".to_string(),
            step_mode: "auto".to_string(),
            workspace_host: None,
            workspace_token: None,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at the given tracking URI, everything else default.
    #[must_use]
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            ..Self::default()
        }
    }

    /// Set the workspace token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<SecretString>) -> Self {
        self.workspace_token = Some(token.into());
        self
    }

    /// Set the workspace host.
    #[must_use]
    pub fn with_workspace_host(mut self, host: impl Into<String>) -> Self {
        self.workspace_host = Some(host.into());
        self
    }

    /// Set the default experiment.
    #[must_use]
    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = Some(experiment_id.into());
        self
    }

    /// Check that the configuration can reach a tracking service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the tracking URI is empty or a workspace
    /// URI has no resolvable host.
    pub fn validate(&self) -> Result<()> {
        if self.tracking_uri.trim().is_empty() {
            return Err(Error::Config("tracking URI is required".to_string()));
        }
        self.api_base_url().map(|_| ())
    }

    /// Whether the tracking URI points at a managed workspace.
    #[must_use]
    pub fn is_workspace(&self) -> bool {
        let uri = self.tracking_uri.as_str();
        if uri == WORKSPACE_SCHEME || uri.starts_with(WORKSPACE_PROFILE_PREFIX) {
            return true;
        }
        uri.strip_prefix("https://")
            .map(|rest| rest.split('/').next().unwrap_or_default())
            .is_some_and(|host| WORKSPACE_DOMAINS.iter().any(|d| host.ends_with(d)))
    }

    /// Profile name of a `databricks://<profile>` tracking URI.
    #[must_use]
    pub fn workspace_profile(&self) -> Option<&str> {
        let profile = self.tracking_uri.strip_prefix(WORKSPACE_PROFILE_PREFIX)?;
        let profile = profile.split('/').next().unwrap_or_default();
        (!profile.is_empty()).then_some(profile)
    }

    /// Base URL of the REST API, without trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a workspace URI (`databricks`,
    /// `databricks://<profile>`) is used without an explicit workspace host.
    /// Profiles are not resolved from local profile files.
    pub fn api_base_url(&self) -> Result<String> {
        let base = if let Some(host) = self.workspace_host.as_deref().filter(|_| self.is_workspace()) {
            host
        } else if self.tracking_uri == WORKSPACE_SCHEME
            || self.tracking_uri.starts_with(WORKSPACE_PROFILE_PREFIX)
        {
            let target = self
                .workspace_profile()
                .map_or_else(String::new, |profile| format!(" for profile '{profile}'"));
            return Err(Error::Config(format!(
                "workspace host is required{target}: set DATABRICKS_HOST or use the workspace URL as tracking URI"
            )));
        } else {
            self.tracking_uri.as_str()
        };

        let base = base.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(Error::Config("tracking URI is required".to_string()));
        }
        Ok(base.to_string())
    }

    /// Token used for authenticated calls, if any.
    #[must_use]
    pub fn credential_source(&self) -> Option<&SecretString> {
        self.workspace_token.as_ref().filter(|t| !t.is_empty())
    }

    /// Time configuration for metric normalization: overrides win over the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns the matching time-series error for any unrecognized value.
    pub fn time_config(
        &self,
        resolution: Option<&str>,
        alignment: Option<&str>,
        step_mode: Option<&str>,
    ) -> Result<TimeConfig> {
        TimeConfig::parse(
            resolution.unwrap_or(&self.time_resolution),
            alignment.unwrap_or(&self.time_alignment),
            step_mode.unwrap_or(&self.step_mode),
        )
    }
}
