//! Errors returned by [`super::ResilientFetcher`].

use thiserror::Error;

use super::TransportError;

/// Maximum number of body characters kept in an upstream error.
pub(crate) const EXCERPT_CHARS: usize = 200;

/// Reasons a fetch gave up.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// A retry budget ran out.
    #[error(
        "retries exhausted after {timeout_attempts} timeout and \
         {rate_limit_attempts} rate-limit attempts"
    )]
    RetriesExhausted {
        /// Attempts charged to the timeout budget.
        timeout_attempts: u32,
        /// Attempts charged to the rate-limit budget.
        rate_limit_attempts: u32,
        /// Transport failure seen on the final attempt, if any.
        #[source]
        last_transport: Option<TransportError>,
    },
    /// The service answered with a non-retryable status.
    #[error("Overpass returned status {status}: {excerpt}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Leading characters of the response body.
        excerpt: String,
    },
    /// A 200 response did not match the expected payload shape.
    #[error("Overpass response failed validation: {source}")]
    Schema {
        /// Deserialisation failure.
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Whether the error came from running out of retries.
    #[must_use]
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}

pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_CHARS).collect()
}
