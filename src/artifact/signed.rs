//! Signed-URI uploader
//!
//! One PUT of the full file to a pre-authorized URL. Header rules depend on
//! the storage provider:
//!
//! ```text
//! ┌──────────────────────────┬───────────────────────────────────────────┐
//! │ credential type          │ defaults                                  │
//! ├──────────────────────────┼───────────────────────────────────────────┤
//! │ AWS_PRESIGNED_URL        │ octet-stream, no Transfer-Encoding        │
//! │ AZURE_SAS_URI            │ octet-stream, x-ms-blob-type: BlockBlob   │
//! │ GCP_SIGNED_URL           │ octet-stream                              │
//! │ AZURE_ADLS_GEN2_SAS_URI  │ octet-stream                              │
//! │ anything else            │ octet-stream                              │
//! └──────────────────────────┴───────────────────────────────────────────┘
//! ```
//!
//! Broker-supplied headers are overlaid after the defaults. The tracking
//! service token is never sent to a signed URI.

use std::path::Path;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING,
};
use reqwest::{Body, Client};
use tracing::{debug, warn};

use super::credentials::{CredentialType, UploadCredential};
use crate::{Error, Result};

const OCTET_STREAM: &str = "application/octet-stream";

const AZURE_BLOB_HEADERS: &[(&str, &str)] =
    &[("content-type", OCTET_STREAM), ("x-ms-blob-type", "BlockBlob")];
const GENERIC_HEADERS: &[(&str, &str)] = &[("content-type", OCTET_STREAM)];

/// Default headers for a credential type.
#[must_use]
pub fn default_headers(credential_type: &CredentialType) -> &'static [(&'static str, &'static str)] {
    match credential_type {
        CredentialType::AzureSasUri => AZURE_BLOB_HEADERS,
        CredentialType::AwsPresignedUrl
        | CredentialType::GcpSignedUrl
        | CredentialType::AzureAdlsGen2SasUri
        | CredentialType::Other(_) => GENERIC_HEADERS,
    }
}

/// Full header set for uploading `content_length` bytes with `credential`.
///
/// # Errors
///
/// Returns [`Error::Upload`] if a broker-supplied header is not a valid HTTP header.
pub fn upload_headers(credential: &UploadCredential, content_length: u64) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));

    for (name, value) in default_headers(&credential.credential_type) {
        headers.insert(*name, HeaderValue::from_static(*value));
    }

    for header in &credential.headers {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| Error::Upload(format!("invalid header name {:?}: {e}", header.name)))?;
        let value = HeaderValue::from_str(&header.value)
            .map_err(|e| Error::Upload(format!("invalid value for header {}: {e}", header.name)))?;
        headers.insert(name, value);
    }

    // S3 rejects chunked PUTs
    if credential.credential_type == CredentialType::AwsPresignedUrl {
        headers.remove(TRANSFER_ENCODING);
    }

    if let CredentialType::Other(name) = &credential.credential_type {
        warn!(credential_type = %name, "unknown credential type, using generic headers");
    }

    Ok(headers)
}

/// Signed URI with the query string (the signature) removed, for logs.
fn display_uri(uri: &str) -> String {
    url::Url::parse(uri).map_or_else(
        |_| "<unparseable uri>".to_string(),
        |mut url| {
            url.set_query(None);
            url.to_string()
        },
    )
}

/// Uploads files to signed URIs.
#[derive(Debug, Clone, Default)]
pub struct SignedUriUploader {
    http: Client,
}

impl SignedUriUploader {
    /// Create an uploader with a fresh, unauthenticated HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an uploader around an existing client.
    #[must_use]
    pub const fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// PUT `local_path` to `credential.signed_uri`. Returns bytes sent.
    ///
    /// # Errors
    ///
    /// - [`Error::Upload`] on local I/O or transport failure
    /// - [`Error::UploadRejected`] on a non-2xx answer
    pub async fn upload(&self, credential: &UploadCredential, local_path: &Path) -> Result<u64> {
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| Error::Upload(format!("{}: {e}", local_path.display())))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| Error::Upload(format!("{}: {e}", local_path.display())))?
            .len();

        let headers = upload_headers(credential, size)?;
        debug!(
            uri = %display_uri(&credential.signed_uri),
            credential_type = %credential.credential_type,
            size,
            "signed upload"
        );

        let response = self
            .http
            .put(&credential.signed_uri)
            .headers(headers)
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
