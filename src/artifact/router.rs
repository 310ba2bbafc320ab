//! Storage router
//!
//! Resolves a run's artifact root once, classifies it, and dispatches each
//! file to the matching uploader.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::credentials::CredentialBroker;
use super::direct::{copy_to_local, DirectStoreUploader};
use super::location::ArtifactLocation;
use super::signed::SignedUriUploader;
use crate::client::ApiClient;
use crate::experiment::ArtifactRecord;
use crate::tracking::TrackingBackend;
use crate::{Error, Result};

/// Default number of uploads in flight during a multi-file upload.
pub const MAX_IN_FLIGHT_UPLOADS: usize = 4;

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    local_path: PathBuf,
    artifact_path: Option<String>,
}

impl UploadRequest {
    /// Upload `local_path` under its base name.
    #[must_use]
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            artifact_path: None,
        }
    }

    /// Store under `artifact_path` instead of the base name.
    #[must_use]
    pub fn with_artifact_path(mut self, artifact_path: impl Into<String>) -> Self {
        self.artifact_path = Some(artifact_path.into());
        self
    }

    /// Get the local file.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Destination path relative to the artifact root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no path was given and the file has no base name.
    pub fn resolved_artifact_path(&self) -> Result<String> {
        if let Some(path) = &self.artifact_path {
            return Ok(path.clone());
        }
        self.local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidInput(format!("{} has no file name", self.local_path.display()))
            })
    }
}

/// Outcome of a multi-file upload, in request order.
#[derive(Debug, Default)]
pub struct UploadReport {
    succeeded: Vec<ArtifactRecord>,
    failed: Vec<(PathBuf, Error)>,
}

impl UploadReport {
    /// Uploaded artifacts.
    #[must_use]
    pub fn succeeded(&self) -> &[ArtifactRecord] {
        &self.succeeded
    }

    /// Files that failed, with their errors.
    #[must_use]
    pub fn failed(&self) -> &[(PathBuf, Error)] {
        &self.failed
    }

    /// Number of files requested.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Whether every file was uploaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Uploads run artifacts to whichever storage the run's artifact root names.
///
/// # Example
///
/// ```rust,no_run
/// use mlflow_cli::artifact::{ArtifactRouter, UploadRequest};
/// use mlflow_cli::client::ApiClient;
/// use mlflow_cli::config::ClientConfig;
/// use mlflow_cli::tracking::HttpTracking;
///
/// # async fn example() -> mlflow_cli::Result<()> {
/// let api = ApiClient::new(&ClientConfig::default())?;
/// let router = ArtifactRouter::new(HttpTracking::new(api.clone()), api);
///
/// let report = router
///     .upload_many("run-id", &[UploadRequest::new("model.pkl"), UploadRequest::new("plot.png")])
///     .await?;
/// println!("{}/{} uploaded", report.succeeded().len(), report.total());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArtifactRouter<B> {
    backend: B,
    broker: CredentialBroker,
    direct: DirectStoreUploader,
    signed: SignedUriUploader,
    max_in_flight: usize,
}

impl<B: TrackingBackend> ArtifactRouter<B> {
    /// Create a router that resolves artifact roots through `backend` and
    /// talks to the tracking service through `api`.
    #[must_use]
    pub fn new(backend: B, api: ApiClient) -> Self {
        Self {
            backend,
            broker: CredentialBroker::new(api.clone()),
            direct: DirectStoreUploader::new(api),
            signed: SignedUriUploader::new(),
            max_in_flight: MAX_IN_FLIGHT_UPLOADS,
        }
    }

    /// Use a specific client for signed-URI uploads.
    #[must_use]
    pub fn with_signed_uploader(mut self, signed: SignedUriUploader) -> Self {
        self.signed = signed;
        self
    }

    /// Limit concurrent uploads in [`Self::upload_many`] (minimum 1).
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Get the tracking backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve and classify a run's artifact root.
    ///
    /// # Errors
    ///
    /// Propagates tracking errors, [`Error::UnsupportedScheme`] and
    /// [`Error::InvalidArtifactUri`].
    pub async fn resolve(&self, run_id: &str) -> Result<ArtifactLocation> {
        let root = self.backend.artifact_uri(run_id).await?;
        let location = ArtifactLocation::parse(&root)?;
        info!(run_id, destination = %location.kind(), "resolved artifact root");
        Ok(location)
    }

    /// Upload one file. `artifact_path` defaults to the file's base name.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the file does not exist (checked first)
    /// - resolution errors from [`Self::resolve`]
    /// - upload errors from the selected uploader
    pub async fn upload(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<ArtifactRecord> {
        ensure_exists(local_path).await?;
        let location = self.resolve(run_id).await?;

        let mut request = UploadRequest::new(local_path);
        if let Some(path) = artifact_path {
            request = request.with_artifact_path(path);
        }
        self.upload_to(&location, &request).await
    }

    /// Upload several files to one run.
    ///
    /// The artifact root is resolved once; a resolution failure is returned
    /// before any file is touched. Files are then uploaded independently and
    /// one failure never aborts the others.
    ///
    /// # Errors
    ///
    /// - resolution errors from [`Self::resolve`]
    /// - [`Error::InvalidInput`] if `requests` is empty
    /// - [`Error::PartialFailure`] if no file was uploaded
    pub async fn upload_many(&self, run_id: &str, requests: &[UploadRequest]) -> Result<UploadReport> {
        if requests.is_empty() {
            return Err(Error::InvalidInput("no files to upload".to_string()));
        }

        let location = self.resolve(run_id).await?;

        let outcomes: Vec<(PathBuf, Result<ArtifactRecord>)> = stream::iter(requests)
            .map(|request| {
                let location = &location;
                async move {
                    (
                        request.local_path().to_path_buf(),
                        self.upload_to(location, request).await,
                    )
                }
            })
            .buffered(self.max_in_flight)
            .collect()
            .await;

        let mut report = UploadReport::default();
        for (path, outcome) in outcomes {
            match outcome {
                Ok(record) => report.succeeded.push(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "artifact upload failed");
                    report.failed.push((path, e));
                }
            }
        }

        if report.succeeded.is_empty() {
            let total = report.total();
            return Err(Error::PartialFailure {
                failures: report.failed,
                total,
            });
        }
        Ok(report)
    }

    async fn upload_to(
        &self,
        location: &ArtifactLocation,
        request: &UploadRequest,
    ) -> Result<ArtifactRecord> {
        let local_path = request.local_path();
        ensure_exists(local_path).await?;
        let artifact_path = request.resolved_artifact_path()?;

        let size = match location {
            ArtifactLocation::DirectStore {
                experiment_id,
                run_id,
            } => {
                self.direct
                    .upload(experiment_id, run_id, &artifact_path, local_path)
                    .await?
            }
            ArtifactLocation::CredentialedStore { run_id, .. } => {
                let credential = self.broker.credential_for(run_id, &artifact_path).await?;
                self.signed.upload(&credential, local_path).await?
            }
            ArtifactLocation::LocalFilesystem { root } => {
                copy_to_local(root, &artifact_path, local_path).await?
            }
        };

        info!(
            path = %local_path.display(),
            artifact_path = %artifact_path,
            size,
            destination = %location.kind(),
            "uploaded artifact"
        );
        Ok(ArtifactRecord::new(
            local_path,
            artifact_path,
            size,
            location.kind(),
        ))
    }
}

async fn ensure_exists(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        _ => Err(Error::NotFound {
            path: path.to_path_buf(),
        }),
    }
}
