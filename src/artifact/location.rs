//! Artifact root classification

use std::path::PathBuf;

use crate::experiment::StorageKind;
use crate::{Error, Result};

const DIRECT_STORE_SCHEME: &str = "mlflow-artifacts:";
const CREDENTIALED_SCHEME: &str = "dbfs:";
const FILE_SCHEME: &str = "file://";

/// Fixed namespace credentialed-store roots live under.
const CREDENTIALED_NAMESPACE: [&str; 2] = ["databricks", "mlflow-tracking"];

/// Where a run's artifacts are stored, decoded from its artifact root URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    /// Tracking server's artifact endpoint.
    DirectStore {
        /// Experiment the run belongs to
        experiment_id: String,
        /// Run ID
        run_id: String,
    },
    /// Cloud storage reached through broker-issued signed URIs.
    CredentialedStore {
        /// Experiment the run belongs to
        experiment_id: String,
        /// Run ID
        run_id: String,
    },
    /// Directory on the local filesystem.
    LocalFilesystem {
        /// Artifact root directory
        root: PathBuf,
    },
}

impl ArtifactLocation {
    /// Classify an artifact root URI.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheme`] if no known scheme matches
    /// - [`Error::InvalidArtifactUri`] if the scheme matches but the
    ///   experiment or run segment is missing
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(rest) = uri.strip_prefix(DIRECT_STORE_SCHEME) {
            let mut segments = path_segments(rest);
            let (experiment_id, run_id) = run_segments(uri, &mut segments)?;
            return Ok(Self::DirectStore {
                experiment_id: experiment_id.to_string(),
                run_id: run_id.to_string(),
            });
        }

        if let Some(rest) = uri.strip_prefix(CREDENTIALED_SCHEME) {
            let mut segments = path_segments(rest);
            if !CREDENTIALED_NAMESPACE
                .iter()
                .all(|expected| segments.next() == Some(*expected))
            {
                return Err(invalid(uri, "expected databricks/mlflow-tracking/ namespace"));
            }
            let (experiment_id, run_id) = run_segments(uri, &mut segments)?;
            return Ok(Self::CredentialedStore {
                experiment_id: experiment_id.to_string(),
                run_id: run_id.to_string(),
            });
        }

        if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
            if path.is_empty() {
                return Err(invalid(uri, "empty file path"));
            }
            return Ok(Self::LocalFilesystem {
                root: PathBuf::from(path),
            });
        }

        if uri.starts_with('/') {
            return Ok(Self::LocalFilesystem {
                root: PathBuf::from(uri),
            });
        }

        Err(Error::UnsupportedScheme {
            uri: uri.to_string(),
        })
    }

    /// Storage kind of this location.
    #[must_use]
    pub const fn kind(&self) -> StorageKind {
        match self {
            Self::DirectStore { .. } => StorageKind::DirectStore,
            Self::CredentialedStore { .. } => StorageKind::CredentialedStore,
            Self::LocalFilesystem { .. } => StorageKind::LocalFilesystem,
        }
    }
}

/// `/`-separated segments; leading `/` (one or many) is ignored.
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').skip_while(|s| s.is_empty())
}

/// Next two segments as `(experiment_id, run_id)`; both must be non-empty.
fn run_segments<'a>(
    uri: &str,
    segments: &mut impl Iterator<Item = &'a str>,
) -> Result<(&'a str, &'a str)> {
    match (segments.next(), segments.next()) {
        (Some(experiment_id), Some(run_id)) if !experiment_id.is_empty() && !run_id.is_empty() => {
            Ok((experiment_id, run_id))
        }
        (Some(experiment_id), _) if !experiment_id.is_empty() => {
            Err(invalid(uri, "run ID not found"))
        }
        _ => Err(invalid(uri, "expected {experiment_id}/{run_id} path segments")),
    }
}

fn invalid(uri: &str, reason: &str) -> Error {
    Error::InvalidArtifactUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_store_with_leading_slash() {
        let location = ArtifactLocation::parse("mlflow-artifacts:/0/abc123/artifacts").unwrap();
        assert_eq!(
            location,
            ArtifactLocation::DirectStore {
                experiment_id: "0".to_string(),
                run_id: "abc123".to_string(),
            }
        );
        assert_eq!(location.kind(), StorageKind::DirectStore);
    }

    #[test]
    fn test_direct_store_without_leading_slash() {
        let location = ArtifactLocation::parse("mlflow-artifacts:5/r9/artifacts").unwrap();
        assert!(matches!(
            location,
            ArtifactLocation::DirectStore { experiment_id, run_id }
                if experiment_id == "5" && run_id == "r9"
        ));
    }

    #[test]
    fn test_direct_store_missing_run() {
        let err = ArtifactLocation::parse("mlflow-artifacts:/0").unwrap_err();
        assert!(matches!(err, Error::InvalidArtifactUri { .. }));
    }

    #[test]
    fn test_credentialed_store() {
        for uri in [
            "dbfs:/databricks/mlflow-tracking/42/run7/artifacts",
            "dbfs:///databricks/mlflow-tracking/42/run7/artifacts",
            "dbfs:databricks/mlflow-tracking/42/run7",
        ] {
            let location = ArtifactLocation::parse(uri).unwrap();
            assert_eq!(
                location,
                ArtifactLocation::CredentialedStore {
                    experiment_id: "42".to_string(),
                    run_id: "run7".to_string()
                },
                "{uri}"
            );
        }
    }

    #[test]
    fn test_credentialed_store_wrong_namespace() {
        let err = ArtifactLocation::parse("dbfs:/tmp/42/run7").unwrap_err();
        assert!(matches!(err, Error::InvalidArtifactUri { .. }));
    }

    #[test]
    fn test_credentialed_store_missing_run() {
        let err = ArtifactLocation::parse("dbfs:/databricks/mlflow-tracking/42").unwrap_err();
        assert!(matches!(err, Error::InvalidArtifactUri { .. }));
    }

    #[test]
    fn test_empty_run_segment_rejected() {
        for uri in [
            "mlflow-artifacts:/0/",
            "mlflow-artifacts:/0//artifacts",
            "dbfs:/databricks/mlflow-tracking/42/",
            "dbfs:/databricks/mlflow-tracking/42//artifacts",
        ] {
            let err = ArtifactLocation::parse(uri).unwrap_err();
            assert!(
                matches!(&err, Error::InvalidArtifactUri { reason, .. } if reason == "run ID not found"),
                "{uri}: {err:?}"
            );
        }
    }

    #[test]
    fn test_empty_experiment_segment_rejected() {
        let err = ArtifactLocation::parse("dbfs:/databricks/mlflow-tracking//run7").unwrap_err();
        assert!(matches!(err, Error::InvalidArtifactUri { .. }));
    }

    #[test]
    fn test_local_filesystem() {
        assert_eq!(
            ArtifactLocation::parse("file:///tmp/mlruns/0/abc/artifacts").unwrap(),
            ArtifactLocation::LocalFilesystem {
                root: PathBuf::from("/tmp/mlruns/0/abc/artifacts")
            }
        );
        assert_eq!(
            ArtifactLocation::parse("/srv/artifacts").unwrap().kind(),
            StorageKind::LocalFilesystem
        );
    }

    #[test]
    fn test_unsupported_schemes() {
        for uri in ["s3://bucket/path", "gs://bucket", "relative/path", ""] {
            let err = ArtifactLocation::parse(uri).unwrap_err();
            assert!(matches!(err, Error::UnsupportedScheme { .. }), "{uri}");
        }
    }
}
