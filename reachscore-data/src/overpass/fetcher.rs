//! Retrying Overpass client.

use std::time::Duration;

use log::{debug, info, warn};
use reachscore_core::AmenityRecord;

use super::error::excerpt;
use super::retry::RetryState;
use super::{AmenityService, FetchError, OverpassQuery, OverpassResponse, RetryPolicy};

const STATUS_OK: u16 = 200;
const STATUS_TOO_MANY_REQUESTS: u16 = 429;
const STATUS_GATEWAY_TIMEOUT: u16 = 504;

/// Records from a successful fetch plus the retries it took.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    /// Converted amenity records.
    pub records: Vec<AmenityRecord>,
    /// Attempts charged to the timeout budget.
    pub timeout_attempts: u32,
    /// Attempts charged to the rate-limit budget.
    pub rate_limit_attempts: u32,
    /// Requests issued, including the successful one.
    pub requests: u32,
}

/// Downloads amenities, absorbing transient Overpass failures.
///
/// HTTP 504 and transport failures draw on the timeout budget; HTTP 429
/// draws on the rate-limit budget. Each failure waits an exponentially
/// growing delay before the next attempt, and the fetch fails with
/// [`FetchError::RetriesExhausted`] once either budget is spent. Any other
/// non-200 status fails immediately, as does a 200 whose payload does not
/// validate.
///
/// # Examples
///
/// ```no_run
/// use geo::polygon;
/// use reachscore_data::overpass::{
///     AmenitySelection, HttpAmenityService, OverpassConfig, OverpassQuery, ResilientFetcher,
/// };
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let boundary = polygon![(x: 7.60, y: 51.95), (x: 7.65, y: 51.95), (x: 7.65, y: 51.98)];
/// let query = OverpassQuery::new(&boundary, &AmenitySelection::amenities(["cafe"]))?;
/// let fetcher = ResilientFetcher::new(HttpAmenityService::new(OverpassConfig::default())?);
/// let records = fetcher.fetch(&query).await?;
/// println!("{} cafes", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResilientFetcher<S> {
    service: S,
    policy: RetryPolicy,
}

impl<S: AmenityService> ResilientFetcher<S> {
    /// Fetcher using the default [`RetryPolicy`].
    pub fn new(service: S) -> Self {
        Self {
            service,
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Underlying transport.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Download the amenities selected by `query`.
    ///
    /// # Errors
    ///
    /// See [`ResilientFetcher::fetch_detailed`].
    pub async fn fetch(&self, query: &OverpassQuery) -> Result<Vec<AmenityRecord>, FetchError> {
        self.fetch_detailed(query).await.map(|report| report.records)
    }

    /// Download the amenities selected by `query` and report retry usage.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::RetriesExhausted`] when a budget runs out,
    /// [`FetchError::Upstream`] for other non-200 statuses and
    /// [`FetchError::Schema`] when the payload fails validation.
    pub async fn fetch_detailed(&self, query: &OverpassQuery) -> Result<FetchReport, FetchError> {
        let mut state = RetryState::new(self.policy);
        let mut requests = 0_u32;
        let mut last_transport = None;

        while !state.is_exhausted() {
            requests = requests.saturating_add(1);
            let wait = match self.service.execute(query.as_str()).await {
                Ok(response) if response.status == STATUS_OK => {
                    let parsed: OverpassResponse = serde_json::from_str(&response.body)
                        .map_err(|source| FetchError::Schema { source })?;
                    let records = parsed.into_records();
                    info!(
                        "fetched {} amenities after {requests} request(s)",
                        records.len()
                    );
                    return Ok(FetchReport {
                        records,
                        timeout_attempts: state.timeout.used(),
                        rate_limit_attempts: state.rate_limit.used(),
                        requests,
                    });
                }
                Ok(response) if response.status == STATUS_TOO_MANY_REQUESTS => {
                    last_transport = None;
                    let wait = state.rate_limit.consume();
                    warn!(
                        "Overpass rate limited the request (attempt {})",
                        state.rate_limit.used()
                    );
                    wait
                }
                Ok(response) if response.status == STATUS_GATEWAY_TIMEOUT => {
                    last_transport = None;
                    let wait = state.timeout.consume();
                    warn!(
                        "Overpass gateway timed out (attempt {})",
                        state.timeout.used()
                    );
                    wait
                }
                Ok(response) => {
                    return Err(FetchError::Upstream {
                        status: response.status,
                        excerpt: excerpt(&response.body),
                    });
                }
                Err(err) => {
                    let wait = state.timeout.consume();
                    warn!("Overpass request failed (attempt {}): {err}", state.timeout.used());
                    last_transport = Some(err);
                    wait
                }
            };
            if !state.is_exhausted() {
                backoff(wait).await;
            }
        }

        Err(FetchError::RetriesExhausted {
            timeout_attempts: state.timeout.used(),
            rate_limit_attempts: state.rate_limit.used(),
            last_transport,
        })
    }
}

async fn backoff(wait: Duration) {
    debug!("waiting {}s before the next Overpass request", wait.as_secs_f64());
    tokio::time::sleep(wait).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overpass::test_support::ScriptedAmenityService;
    use crate::overpass::{BackoffPolicy, ServiceResponse, TransportError};
    use rstest::{fixture, rstest};

    const EMPTY_PAYLOAD: &str = r#"{"version": 0.6, "generator": "test", "elements": []}"#;

    #[fixture]
    fn query() -> OverpassQuery {
        OverpassQuery::raw("[out:json];node(1);out;")
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_timeout(BackoffPolicy::new(4, Duration::from_millis(1)))
            .with_rate_limit(BackoffPolicy::new(4, Duration::from_millis(1)))
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt(query: OverpassQuery) {
        let service = ScriptedAmenityService::new(vec![Ok(ServiceResponse::new(200, EMPTY_PAYLOAD))]);
        let fetcher = ResilientFetcher::new(&service);

        let report = fetcher.fetch_detailed(&query).await.expect("fetch succeeds");

        assert_eq!(report.requests, 1);
        assert_eq!(report.timeout_attempts, 0);
        assert_eq!(report.rate_limit_attempts, 0);
        assert_eq!(service.queries(), vec![query.as_str().to_owned()]);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn transport_failures_share_the_timeout_budget(query: OverpassQuery) {
        let timeout = TransportError::Timeout {
            url: "http://overpass.test".to_owned(),
        };
        let service = ScriptedAmenityService::new(vec![
            Err(timeout.clone()),
            Ok(ServiceResponse::new(504, "")),
            Err(timeout),
            Ok(ServiceResponse::new(200, EMPTY_PAYLOAD)),
        ]);
        let fetcher = ResilientFetcher::new(&service).with_policy(fast_policy());

        let report = fetcher.fetch_detailed(&query).await.expect("fetch succeeds");

        assert_eq!(report.timeout_attempts, 3);
        assert_eq!(report.requests, 4);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn exhausted_transport_budget_keeps_the_last_error(query: OverpassQuery) {
        let service = ScriptedAmenityService::repeating(Err(TransportError::Connect {
            url: "http://overpass.test".to_owned(),
            message: "connection refused".to_owned(),
        }));
        let fetcher = ResilientFetcher::new(&service).with_policy(fast_policy());

        let err = fetcher.fetch(&query).await.expect_err("fetch fails");

        match err {
            FetchError::RetriesExhausted {
                timeout_attempts,
                rate_limit_attempts,
                last_transport,
            } => {
                assert_eq!(timeout_attempts, 4);
                assert_eq!(rate_limit_attempts, 0);
                assert!(matches!(last_transport, Some(TransportError::Connect { .. })));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(service.requests(), 4);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn upstream_errors_truncate_the_body(query: OverpassQuery) {
        let body = "x".repeat(500);
        let service = ScriptedAmenityService::new(vec![Ok(ServiceResponse::new(400, body))]);
        let fetcher = ResilientFetcher::new(&service);

        let err = fetcher.fetch(&query).await.expect_err("fetch fails");

        match err {
            FetchError::Upstream { status, excerpt } => {
                assert_eq!(status, 400);
                assert_eq!(excerpt.chars().count(), 200);
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert_eq!(service.requests(), 1);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn backoff_waits_double(query: OverpassQuery) {
        let service = ScriptedAmenityService::new(vec![
            Ok(ServiceResponse::new(429, "")),
            Ok(ServiceResponse::new(429, "")),
            Ok(ServiceResponse::new(200, EMPTY_PAYLOAD)),
        ]);
        let fetcher = ResilientFetcher::new(&service);
        let started = tokio::time::Instant::now();

        let report = fetcher.fetch_detailed(&query).await.expect("fetch succeeds");

        assert_eq!(report.rate_limit_attempts, 2);
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_secs(60 + 120) && elapsed < Duration::from_secs(181),
            "waited {elapsed:?}"
        );
    }
}
