//! HTTP-based `RoutingEngine` using OSRM's Table API.
//!
//! The engine samples a grid of candidate destinations around the origin,
//! asks OSRM for the travel time from the origin to each candidate, and
//! keeps the candidates reachable within the budget.
//!
//! # Architecture
//!
//! The [`RoutingEngine`] trait is synchronous to keep the core library
//! embeddable in synchronous contexts. This engine bridges the async HTTP
//! calls to the sync interface by blocking on a Tokio runtime internally.

use std::time::Duration;

use geo::Coord;
use log::debug;
use reachscore_core::{RoutingEngine, RoutingError, TravelMode};
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::grid::sample_destinations;
use super::osrm::{NO_SEGMENT, TableResponse};

/// Error type for [`HttpRoutingEngine`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default user agent for OSRM requests.
pub const DEFAULT_USER_AGENT: &str = "reachscore-routing/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default spacing between sampled destinations in metres.
const DEFAULT_GRID_RESOLUTION_M: f64 = 100.0;

/// Default cap on samples along one side of the grid.
const DEFAULT_MAX_GRID_SIDE: u32 = 201;

/// Default number of destinations per Table request.
const DEFAULT_BATCH_SIZE: usize = 99;

/// Configuration for [`HttpRoutingEngine`].
#[derive(Debug, Clone)]
pub struct HttpRoutingEngineConfig {
    /// Base URL for the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Spacing between sampled destinations in metres.
    pub grid_resolution_m: f64,
    /// Maximum number of samples along one side of the grid. Longer budgets
    /// widen the spacing rather than shrink the sampled radius.
    pub max_grid_side: u32,
    /// Destinations sent per Table request.
    pub batch_size: usize,
}

impl Default for HttpRoutingEngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            grid_resolution_m: DEFAULT_GRID_RESOLUTION_M,
            max_grid_side: DEFAULT_MAX_GRID_SIDE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl HttpRoutingEngineConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
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

    /// Set the spacing between sampled destinations.
    #[must_use]
    pub fn with_grid_resolution(mut self, metres: f64) -> Self {
        self.grid_resolution_m = metres;
        self
    }

    /// Set the maximum number of samples along one side of the grid.
    #[must_use]
    pub fn with_max_grid_side(mut self, side: u32) -> Self {
        self.max_grid_side = side;
        self
    }

    /// Set the number of destinations per Table request. Zero is treated
    /// as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// OSRM profile name used for `mode`.
pub fn osrm_profile(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Walk => "walking",
        TravelMode::Bike => "cycling",
        TravelMode::Car => "driving",
    }
}

/// HTTP-based routing engine using the OSRM Table API.
///
/// It owns a Tokio runtime that is reused across calls.
///
/// # Runtime behaviour
///
/// When called from outside any Tokio runtime, the engine uses its own
/// stored runtime. When called from within an existing multi-threaded Tokio
/// runtime (detected via [`Handle::try_current()`] and
/// [`RuntimeFlavor::MultiThread`]), it uses that runtime's handle with
/// [`tokio::task::block_in_place`] to avoid nested runtime panics.
///
/// When called from within a `current_thread` Tokio runtime, the engine
/// falls back to its own internal runtime, which may deadlock if the
/// caller's runtime is driving IO this request depends on.
pub struct HttpRoutingEngine {
    client: Client,
    config: HttpRoutingEngineConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpRoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRoutingEngine")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpRoutingEngine {
    /// Create a new engine with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpRoutingEngineConfig::new(base_url))
    }

    /// Create a new engine with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpRoutingEngineConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Build the Table API URL measuring from `origin` to `destinations`.
    ///
    /// The format is
    /// `{base_url}/table/v1/{profile}/{origin};{destinations}?sources=0`
    /// where coordinates are `lon,lat` pairs.
    fn build_table_url(
        &self,
        origin: Coord<f64>,
        mode: TravelMode,
        destinations: &[Coord<f64>],
    ) -> String {
        let coords = std::iter::once(&origin)
            .chain(destinations)
            .map(|coord| format!("{},{}", coord.x, coord.y))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?sources=0",
            self.config.base_url.trim_end_matches('/'),
            osrm_profile(mode),
            coords
        )
    }

    async fn reachable_points_async(
        &self,
        origin: Coord<f64>,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Vec<Coord<f64>>, RoutingError> {
        let budget_secs = f64::from(minutes) * 60.0;
        let candidates = sample_destinations(
            origin,
            mode,
            minutes,
            self.config.grid_resolution_m,
            self.config.max_grid_side,
        );
        debug!(
            "measuring {} candidate destinations for a {minutes} minute {mode} trip",
            candidates.len()
        );

        let mut reachable = vec![origin];
        for batch in candidates.chunks(self.config.batch_size.max(1)) {
            let url = self.build_table_url(origin, mode, batch);
            let response = self.fetch_table(&url).await?;
            let durations = self.convert_response(response)?;
            reachable.extend(
                batch
                    .iter()
                    .zip(durations)
                    .filter(|(_, duration)| {
                        duration.is_some_and(|secs| secs.is_finite() && secs <= budget_secs)
                    })
                    .map(|(point, _)| *point),
            );
        }
        Ok(reachable)
    }

    /// Send one Table request.
    ///
    /// OSRM reports routing failures such as `NoSegment` in the body of a
    /// 4xx response, so the body is parsed before the status is judged.
    async fn fetch_table(&self, url: &str) -> Result<TableResponse, RoutingError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;

        match serde_json::from_str::<TableResponse>(&body) {
            Ok(table) => Ok(table),
            Err(_) if !status.is_success() => Err(RoutingError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            }),
            Err(err) => Err(RoutingError::ParseError {
                message: err.to_string(),
            }),
        }
    }

    /// Convert a reqwest error to a `RoutingError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> RoutingError {
        if error.is_timeout() {
            return RoutingError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return RoutingError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        RoutingError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    /// Extract the origin row of durations, skipping the origin itself.
    ///
    /// Invalid values (negative, NaN, infinite) are treated as unreachable.
    fn convert_response(&self, response: TableResponse) -> Result<Vec<Option<f64>>, RoutingError> {
        if !response.is_ok() {
            let message = response.message.unwrap_or_default();
            if response.code == NO_SEGMENT {
                return Err(RoutingError::DataUnavailable { message });
            }
            return Err(RoutingError::ServiceError {
                code: response.code,
                message,
            });
        }

        let row = response
            .durations
            .and_then(|rows| rows.into_iter().next())
            .ok_or_else(|| RoutingError::ParseError {
                message: "OSRM response missing durations row".to_owned(),
            })?;

        Ok(row
            .into_iter()
            .skip(1)
            .map(|cell| cell.filter(|&secs| secs >= 0.0 && secs.is_finite()))
            .collect())
    }
}

impl RoutingEngine for HttpRoutingEngine {
    /// Return the origin plus every sampled destination within `minutes`.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must be
    /// multi-threaded (`flavor = "multi_thread"`).
    fn reachable_points(
        &self,
        origin: Coord<f64>,
        mode: TravelMode,
        minutes: u32,
    ) -> Result<Vec<Coord<f64>>, RoutingError> {
        let future = self.reachable_points_async(origin, mode, minutes);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            // No runtime detected, or current_thread runtime: use our own runtime.
            _ => self.runtime.block_on(future),
        }
    }
}
