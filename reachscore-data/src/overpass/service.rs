//! Transport for Overpass interpreter requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use thiserror::Error;

/// Public Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Default user agent for Overpass requests.
pub const DEFAULT_USER_AGENT: &str = "reachscore-overpass/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl ServiceResponse {
    /// Construct a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures that prevented any HTTP status from being observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Request URL.
        url: String,
    },
    /// The connection could not be established or was dropped.
    #[error("failed to reach {url}: {message}")]
    Connect {
        /// Request URL.
        url: String,
        /// Description from the HTTP client.
        message: String,
    },
    /// The response body could not be read.
    #[error("failed to read response body from {url}: {message}")]
    Body {
        /// Request URL.
        url: String,
        /// Description from the HTTP client.
        message: String,
    },
}

/// Executes Overpass QL queries.
///
/// Implementations report every HTTP status as a [`ServiceResponse`] and
/// reserve [`TransportError`] for exchanges that produced no status.
#[async_trait]
pub trait AmenityService: Send + Sync {
    /// Send `query` and return the raw response.
    async fn execute(&self, query: &str) -> Result<ServiceResponse, TransportError>;
}

#[async_trait]
impl<T: AmenityService + ?Sized> AmenityService for &T {
    async fn execute(&self, query: &str) -> Result<ServiceResponse, TransportError> {
        (**self).execute(query).await
    }
}

#[async_trait]
impl<T: AmenityService + ?Sized> AmenityService for Arc<T> {
    async fn execute(&self, query: &str) -> Result<ServiceResponse, TransportError> {
        (**self).execute(query).await
    }
}

/// Configuration for [`HttpAmenityService`].
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    /// Interpreter endpoint URL.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_ENDPOINT.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OverpassConfig {
    /// Configuration targeting `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// reqwest-backed [`AmenityService`] that POSTs queries to the interpreter.
#[derive(Debug, Clone)]
pub struct HttpAmenityService {
    client: Client,
    config: OverpassConfig,
}

impl HttpAmenityService {
    /// Build a service from `config`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error when the HTTP client cannot be built.
    pub fn new(config: OverpassConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &OverpassConfig {
        &self.config
    }
}

#[async_trait]
impl AmenityService for HttpAmenityService {
    async fn execute(&self, query: &str) -> Result<ServiceResponse, TransportError> {
        let url = self.config.endpoint.as_str();
        let response = self
            .client
            .post(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(query.to_owned())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, url))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout {
                    url: url.to_owned(),
                }
            } else {
                TransportError::Body {
                    url: url.to_owned(),
                    message: err.to_string(),
                }
            }
        })?;
        Ok(ServiceResponse { status, body })
    }
}

fn convert_reqwest_error(error: &reqwest::Error, url: &str) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_owned(),
        }
    } else {
        TransportError::Connect {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}
