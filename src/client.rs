//! Authenticated channel to the tracking service
//!
//! [`ApiClient`] owns the base URL and the optional bearer token taken from
//! [`ClientConfig`]. The tracking backend, the credential broker and the
//! direct-store uploader all go through it. Signed-URI uploads never do;
//! those URLs are pre-authorized and never carry the token.

use reqwest::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use crate::config::{ClientConfig, SecretString};
use crate::{Error, Result};

const CLIENT_USER_AGENT: &str = concat!("mlflow-cli/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to one tracking service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl ApiClient {
    /// Build a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_http(
            Client::new(),
            config.api_base_url()?,
            config.credential_source().cloned(),
        ))
    }

    /// Build a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http(http: Client, base_url: impl Into<String>, token: Option<SecretString>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token,
        }
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a credential source is configured.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Underlying HTTP client, without authentication.
    #[must_use]
    pub const fn http(&self) -> &Client {
        &self.http
    }

    /// Absolute URL for an API path (`/api/2.0/...`).
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with the user agent and, when configured, the bearer token.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(%method, %url, "tracking request");
        let mut builder = self
            .http
            .request(method, url)
            .header(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }
        builder
    }

    /// Send a request and turn non-2xx answers into [`Error::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport failure, [`Error::Api`] on non-2xx.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_single_slash() {
        let client = ApiClient::with_http(Client::new(), "http://localhost:5000/", None);
        assert_eq!(
            client.endpoint("/api/2.0/mlflow/runs/get"),
            "http://localhost:5000/api/2.0/mlflow/runs/get"
        );
        assert_eq!(client.endpoint("api/x"), "http://localhost:5000/api/x");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(matches!(
            ApiClient::new(&ClientConfig::new("")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_authenticated_only_with_token() {
        let anonymous = ApiClient::new(&ClientConfig::default()).unwrap();
        assert!(!anonymous.is_authenticated());
        let authed = ApiClient::new(&ClientConfig::default().with_token("t")).unwrap();
        assert!(authed.is_authenticated());
    }

    #[test]
    fn test_request_carries_bearer_token() {
        let client = ApiClient::new(&ClientConfig::default().with_token("abc")).unwrap();
        let request = client
            .request(reqwest::Method::GET, "/api/2.0/mlflow/runs/get")
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc"
        );
        assert!(request.headers().get(USER_AGENT).is_some());
    }

    #[test]
    fn test_request_without_token_has_no_authorization() {
        let client = ApiClient::new(&ClientConfig::default()).unwrap();
        let request = client.request(reqwest::Method::GET, "/x").build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
