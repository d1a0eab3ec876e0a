//! Relist backend HTTP client
//!
//! Provides a typed HTTP client for the Relist backend. Handles the
//! bearer header, per-request timeouts, endpoint construction, and the
//! normalization of every failure onto [`ApiError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relist_api::client::ApiClient;
//! use relist_api::jobs;
//! use relist_core::ports::JobRequest;
//!
//! # async fn example() -> Result<(), relist_core::domain::ApiError> {
//! let client = ApiClient::with_base_url("http://localhost:8000", Some("token".into()))?;
//! let job = jobs::start_job(&client, JobRequest::InventoryFetch).await?;
//! println!("started {job}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use relist_core::{config::ApiConfig, domain::errors::ApiError};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Request timeout used when no configuration is supplied
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How non-success statuses other than 401/403 are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMapping {
    /// `ApiError::Server { status, body }`
    Server,
    /// `ApiError::Protocol` carrying the raw body (job store reads)
    Protocol,
}

// ============================================================================
// ApiClient
// ============================================================================

/// HTTP client for Relist backend calls
///
/// Wraps `reqwest::Client` with the base URL and an optional bearer
/// token. Calls that need a credential fail with `ApiError::Auth` before
/// any network I/O when the token is absent.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL without a trailing slash
    base_url: String,
    /// Bearer token for authenticated endpoints
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client from the `api` configuration section
    ///
    /// # Arguments
    /// * `config` - Base URL and request timeout
    /// * `token` - Bearer token, if the user is logged in
    ///
    /// # Errors
    /// `ApiError::Network` if the TLS backend cannot be initialised
    pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self, ApiError> {
        Self::build(&config.base_url, token, config.request_timeout())
    }

    /// Creates a client with a custom base URL and the default timeout (useful for testing)
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, ApiError> {
        Self::build(&base_url.into(), token, DEFAULT_TIMEOUT)
    }

    fn build(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Replaces the bearer token (e.g. after `auth login`)
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
        debug!(has_token = self.token.is_some(), "Updated ApiClient token");
    }

    /// Returns true if a bearer token is configured
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an anonymous request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, DELETE, ...)
    /// * `path` - API path relative to base URL (e.g. "/api/auth/pairing-status/123456")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Creates an authenticated request builder
    ///
    /// # Errors
    /// `ApiError::Auth` when no token is configured
    pub fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ApiError::Auth("Not logged in: no access token available".into()))?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Sends a request and returns the body of a success response
    ///
    /// # Errors
    /// - `ApiError::Network` when no response arrives (including timeouts)
    /// - `ApiError::Auth` on 401/403
    /// - `ApiError::Server` or `ApiError::Protocol` on other non-success
    ///   statuses, depending on `mapping`
    pub async fn send(
        &self,
        request: RequestBuilder,
        mapping: StatusMapping,
    ) -> Result<String, ApiError> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await.map_err(network_error)?;
        debug!(path = %url, status = status.as_u16(), "Backend response");

        if status.is_success() {
            return Ok(body);
        }
        Err(map_status(status, body, mapping))
    }

    /// Sends a request and decodes the JSON body of a success response
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        mapping: StatusMapping,
    ) -> Result<T, ApiError> {
        let body = self.send(request, mapping).await?;
        decode(&body)
    }
}

// ============================================================================
// Error mapping
// ============================================================================

/// Maps a transport failure onto `ApiError::Network`
pub(crate) fn network_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network(format!("request timed out: {err}"))
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Maps a non-success status onto the matching `ApiError` variant
pub(crate) fn map_status(status: StatusCode, body: String, mapping: StatusMapping) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let server = ApiError::Server {
                status: status.as_u16(),
                body,
            };
            ApiError::Auth(server.message())
        }
        _ => match mapping {
            StatusMapping::Server => ApiError::Server {
                status: status.as_u16(),
                body,
            },
            StatusMapping::Protocol => ApiError::protocol_with_body(
                format!("unexpected status {}", status.as_u16()),
                body,
            ),
        },
    }
}

/// Decodes a JSON body, keeping the raw text on failure
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::protocol_with_body(format!("malformed response: {e}"), body))
}
