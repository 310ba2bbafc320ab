//! Error types for mlflow-cli
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mlflow-cli error types
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid tracking endpoint / credential source
    #[error("Configuration error: {0}")]
    Config(String),

    /// Artifact root does not match any known storage scheme
    #[error("Unsupported artifact URI scheme: {uri}\nSupported: mlflow-artifacts:/, dbfs:/databricks/mlflow-tracking/, file://, absolute paths")]
    UnsupportedScheme {
        /// The artifact root as returned by the tracking service
        uri: String,
    },

    /// Known scheme, but identifiers could not be extracted
    #[error("Invalid artifact URI {uri}: {reason}")]
    InvalidArtifactUri {
        /// The offending URI
        uri: String,
        /// What was missing or malformed
        reason: String,
    },

    /// Local file to upload does not exist
    #[error("File not found: {}", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Credential exchange not permitted with the active configuration
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Credential broker answered with no credential for a requested path
    #[error("No write credentials returned for path: {path}")]
    MissingCredentials {
        /// Artifact path the credential was requested for
        path: String,
    },

    /// Storage endpoint answered an upload with a non-2xx status
    #[error("Upload rejected with HTTP {status}: {body}")]
    UploadRejected {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Transport or local I/O failure while uploading
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Multi-file upload where no file succeeded
    #[error(
        "Failed to upload any artifacts ({} of {total} failed){}",
        failures.len(),
        render_failures(failures)
    )]
    PartialFailure {
        /// Each failed file with its cause, in request order
        failures: Vec<(PathBuf, Error)>,
        /// Number of files requested
        total: usize,
    },

    /// Time resolution other than 1m, 5m, 1h
    #[error("Unsupported resolution: {0} (valid: 1m, 5m, 1h)")]
    UnsupportedResolution(String),

    /// Time alignment other than floor, ceil, round
    #[error("Unsupported alignment: {0} (valid: floor, ceil, round)")]
    UnsupportedAlignment(String),

    /// Step mode other than auto, timestamp, sequence
    #[error("Unsupported step mode: {0} (valid: auto, timestamp, sequence)")]
    UnsupportedStepMode(String),

    /// Tracking REST API answered with a non-2xx status
    #[error("Tracking API returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Run does not exist
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Invalid user input (flags, key=value pairs)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input file extension is not understood
    #[error("Unsupported file format: {0} (supported: .json, .yaml, .yml)")]
    UnsupportedFormat(String),

    /// Malformed value in an input or response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn render_failures(failures: &[(PathBuf, Error)]) -> String {
    failures
        .iter()
        .map(|(path, error)| format!("\n  {}: {error}", path.display()))
        .collect()
}

impl Error {
    /// Whether this error belongs to the upload failure class (rejected, transport, no credential).
    #[must_use]
    pub const fn is_upload_error(&self) -> bool {
        matches!(
            self,
            Self::UploadRejected { .. } | Self::Upload(_) | Self::MissingCredentials { .. }
        )
    }
}
