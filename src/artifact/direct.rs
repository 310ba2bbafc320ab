//! Direct-store and local filesystem uploads

use std::path::{Path, PathBuf};

use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method};
use tracing::debug;

use crate::client::ApiClient;
use crate::{Error, Result};

const ARTIFACTS_API: &str = "/api/2.0/mlflow-artifacts/artifacts";

/// Endpoint path for one artifact on the tracking server.
#[must_use]
pub fn direct_store_path(experiment_id: &str, run_id: &str, artifact_path: &str) -> String {
    format!(
        "{ARTIFACTS_API}/{experiment_id}/{run_id}/artifacts/{}",
        artifact_path.trim_start_matches('/')
    )
}

/// Uploads through the tracking server's artifact endpoint.
#[derive(Debug, Clone)]
pub struct DirectStoreUploader {
    api: ApiClient,
}

impl DirectStoreUploader {
    /// Create an uploader over an API channel.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// PUT `local_path` as `artifact_path` of the run. Returns bytes sent.
    ///
    /// # Errors
    ///
    /// - [`Error::Upload`] on local I/O or transport failure
    /// - [`Error::UploadRejected`] on a non-2xx answer
    pub async fn upload(
        &self,
        experiment_id: &str,
        run_id: &str,
        artifact_path: &str,
        local_path: &Path,
    ) -> Result<u64> {
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| Error::Upload(format!("{}: {e}", local_path.display())))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| Error::Upload(format!("{}: {e}", local_path.display())))?
            .len();

        let path = direct_store_path(experiment_id, run_id, artifact_path);
        debug!(%path, size, "direct-store upload");

        let response = self
            .api
            .request(Method::PUT, &path)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
            .header(CONTENT_LENGTH, size)
            .body(Body::from(file))
            .send()
            .await
            .map_err(|e| Error::Upload(format!("{}: {e}", local_path.display())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(size)
    }
}

/// Copy `local_path` to `root/artifact_path`, creating directories as needed.
/// Returns bytes copied.
///
/// # Errors
///
/// Returns [`Error::Upload`] if the directory cannot be created or the copy fails.
pub async fn copy_to_local(root: &Path, artifact_path: &str, local_path: &Path) -> Result<u64> {
    let target: PathBuf = root.join(artifact_path.trim_start_matches('/'));

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Upload(format!("failed to create directory {}: {e}", parent.display()))
        })?;
    }

    let copied = tokio::fs::copy(local_path, &target).await.map_err(|e| {
        Error::Upload(format!(
            "failed to copy {} to {}: {e}",
            local_path.display(),
            target.display()
        ))
    })?;
    debug!(target = %target.display(), bytes = copied, "copied artifact");
    Ok(copied)
}
