//! Credential broker client
//!
//! Exchanges `(run_id, paths)` for short-lived signed upload URIs. Each
//! credential is used for one upload attempt and then dropped.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::client::ApiClient;
use crate::{Error, Result};

const CREDENTIALS_FOR_WRITE: &str = "/api/2.0/mlflow/artifacts/credentials-for-write";

/// Storage provider behind a signed URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialType {
    /// AWS S3 presigned URL
    AwsPresignedUrl,
    /// Azure Blob Storage SAS URI
    AzureSasUri,
    /// Google Cloud Storage signed URL
    GcpSignedUrl,
    /// Azure Data Lake Storage Gen2 SAS URI
    AzureAdlsGen2SasUri,
    /// Any type this client does not know about
    Other(String),
}

impl CredentialType {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AwsPresignedUrl => "AWS_PRESIGNED_URL",
            Self::AzureSasUri => "AZURE_SAS_URI",
            Self::GcpSignedUrl => "GCP_SIGNED_URL",
            Self::AzureAdlsGen2SasUri => "AZURE_ADLS_GEN2_SAS_URI",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for CredentialType {
    fn from(name: &str) -> Self {
        match name {
            "AWS_PRESIGNED_URL" => Self::AwsPresignedUrl,
            "AZURE_SAS_URI" => Self::AzureSasUri,
            "GCP_SIGNED_URL" => Self::GcpSignedUrl,
            "AZURE_ADLS_GEN2_SAS_URI" => Self::AzureAdlsGen2SasUri,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CredentialType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

/// Header the storage provider expects on the upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpHeader {
    /// Header name
    pub name: String,
    /// Header value
    pub value: String,
}

/// Pre-authorized write access to one artifact path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadCredential {
    /// Run the credential was issued for
    #[serde(default)]
    pub run_id: String,
    /// Artifact path relative to the run's root
    #[serde(default)]
    pub path: String,
    /// URL to PUT the file to
    pub signed_uri: String,
    /// Provider-required headers, applied after the defaults
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
    /// Storage provider
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    run_id: &'a str,
    path: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CredentialsResponse {
    #[serde(default)]
    credential_infos: Vec<UploadCredential>,
}

/// Client for the credentials-for-write exchange.
#[derive(Debug, Clone)]
pub struct CredentialBroker {
    api: ApiClient,
}

impl CredentialBroker {
    /// Create a broker client over an API channel.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Request write credentials for several artifact paths of a run.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] if the channel has no credential source (no request is sent)
    /// - [`Error::Api`] / [`Error::Http`] if the exchange fails
    pub async fn request_write_credentials(
        &self,
        run_id: &str,
        paths: &[String],
    ) -> Result<Vec<UploadCredential>> {
        if !self.api.is_authenticated() {
            return Err(Error::Auth(
                "credential exchange requires a workspace token (set DATABRICKS_TOKEN)".to_string(),
            ));
        }

        let request = self
            .api
            .request(Method::POST, CREDENTIALS_FOR_WRITE)
            .json(&CredentialsRequest { run_id, path: paths });
        let response: CredentialsResponse = self.api.send(request).await?.json().await?;

        debug!(
            run_id,
            requested = paths.len(),
            returned = response.credential_infos.len(),
            "received write credentials"
        );
        Ok(response.credential_infos)
    }

    /// Request the credential for exactly one artifact path.
    ///
    /// # Errors
    ///
    /// As [`Self::request_write_credentials`], plus
    /// [`Error::MissingCredentials`] if the broker returned none.
    pub async fn credential_for(&self, run_id: &str, path: &str) -> Result<UploadCredential> {
        self.request_write_credentials(run_id, &[path.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingCredentials {
                path: path.to_string(),
            })
    }
}
