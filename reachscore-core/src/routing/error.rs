use thiserror::Error;

/// Errors from [`crate::routing::RoutingEngine::reachable_points`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The routing engine has no network data covering the origin.
    ///
    /// Isochrone computation treats this as "nothing is reachable" and
    /// degrades to an empty polygon.
    #[error("routing data unavailable: {message}")]
    DataUnavailable {
        /// Description reported by the engine.
        message: String,
    },

    /// Network error connecting to the routing service.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// The URL that was being requested.
        url: String,
        /// Description of the network error.
        message: String,
    },

    /// Request to routing service timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// The URL that was being requested.
        url: String,
        /// The timeout duration in seconds.
        timeout_secs: u64,
    },

    /// Routing service returned a non-success HTTP status.
    #[error("HTTP {status} from {url}: {message}")]
    HttpError {
        /// The URL that was being requested.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Description or body excerpt.
        message: String,
    },

    /// Routing service reported an error in its response payload.
    #[error("routing service error {code}: {message}")]
    ServiceError {
        /// Service-specific error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The routing response could not be parsed.
    #[error("failed to parse routing response: {message}")]
    ParseError {
        /// Description of the parse failure.
        message: String,
    },
}

impl RoutingError {
    /// Report whether this error means the origin lies outside the data the
    /// engine has loaded.
    pub const fn is_data_unavailable(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. })
    }
}
