//! Artifact Record - outcome of one successful artifact upload

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of storage an artifact landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    /// The tracking server's own artifact endpoint
    DirectStore,
    /// Cloud object storage through a broker-issued signed URI
    CredentialedStore,
    /// A directory on the local filesystem
    LocalFilesystem,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectStore => write!(f, "direct-store"),
            Self::CredentialedStore => write!(f, "credentialed-store"),
            Self::LocalFilesystem => write!(f, "local-filesystem"),
        }
    }
}

/// Artifact Record represents a file stored for a run.
///
/// `artifact_path` is relative to the run's artifact root, e.g.
/// `models/final_model.pkl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    local_path: PathBuf,
    artifact_path: String,
    size_bytes: u64,
    destination: StorageKind,
    uploaded_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create a new artifact record.
    ///
    /// # Arguments
    ///
    /// * `local_path` - File that was uploaded
    /// * `artifact_path` - Path relative to the run's artifact root
    /// * `size_bytes` - Bytes transferred
    /// * `destination` - Storage the file went to
    ///
    /// # Returns
    ///
    /// A new `ArtifactRecord` with the current timestamp.
    #[must_use]
    pub fn new(
        local_path: impl Into<PathBuf>,
        artifact_path: impl Into<String>,
        size_bytes: u64,
        destination: StorageKind,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            artifact_path: artifact_path.into(),
            size_bytes,
            destination,
            uploaded_at: Utc::now(),
        }
    }

    /// Get the uploaded local file.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Get the path relative to the artifact root.
    #[must_use]
    pub fn artifact_path(&self) -> &str {
        &self.artifact_path
    }

    /// Get the artifact size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the storage kind.
    #[must_use]
    pub const fn destination(&self) -> StorageKind {
        self.destination
    }

    /// Get the upload timestamp.
    #[must_use]
    pub const fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }
}
