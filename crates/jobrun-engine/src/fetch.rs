//! Retry-aware HTTP fetch.
//!
//! A thin wrapper over [`reqwest`] for task bodies that call flaky
//! external services: responses whose status matches a configured range
//! are retried with exponential backoff, network-level errors are retried
//! on a fixed doubling schedule, and everything else is returned as-is.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Hard cap on attempts per fetch across both retry paths, counting the
/// first request.
const MAX_TOTAL_ATTEMPTS: u32 = 4;

/// Errors from [`RetryClient`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request failed at the network level on every allowed attempt.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Error parsing a status range string.
#[derive(Debug, Error)]
#[error("invalid status range '{0}', expected \"NNN\" or \"NNN-NNN\"")]
pub struct ParseStatusRangeError(String);

/// An inclusive HTTP status range, parsed from `"429"` or `"500-599"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    start: u16,
    end: u16,
}

impl StatusRange {
    /// Range covering a single status code.
    pub fn single(status: u16) -> Self {
        Self {
            start: status,
            end: status,
        }
    }

    /// Inclusive range between two status codes.
    pub fn between(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// Whether `status` falls inside the range.
    pub fn contains(&self, status: u16) -> bool {
        status >= self.start && status <= self.end
    }
}

impl FromStr for StatusRange {
    type Err = ParseStatusRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse =
            |part: &str| -> Result<u16, ParseStatusRangeError> {
                part.parse()
                    .map_err(|_| ParseStatusRangeError(s.to_owned()))
            };
        match s.split_once('-') {
            Some((start, end)) => {
                let range = Self::between(parse(start)?, parse(end)?);
                if range.start > range.end {
                    return Err(ParseStatusRangeError(s.to_owned()));
                }
                Ok(range)
            }
            None => Ok(Self::single(parse(s)?)),
        }
    }
}

/// Backoff applied to responses matching a status range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffOptions {
    /// Retries allowed for this range beyond the initial request, still
    /// subject to the overall attempt cap.
    pub max_attempts: u32,

    /// Multiplier applied to the delay per retry.
    pub factor: f64,

    /// Delay before the first retry, in milliseconds.
    pub min_timeout_ms: u64,

    /// Upper bound on the computed delay, in milliseconds.
    pub max_timeout_ms: u64,

    /// Jitter: multiply the computed delay by a random factor in
    /// `[0.5, 1.5)`.
    pub randomize: bool,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            factor: 2.0,
            min_timeout_ms: 1000,
            max_timeout_ms: 60_000,
            randomize: true,
        }
    }
}

/// Retry policy for [`RetryClient`]: backoff rules keyed by status range.
///
/// The first rule matching a response's status applies; responses
/// matching no rule are returned as-is.
#[derive(Debug, Clone, Default)]
pub struct FetchRetry {
    rules: Vec<(StatusRange, BackoffOptions)>,
}

impl FetchRetry {
    /// Policy with no status rules. Network errors are still retried.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a backoff rule for a status range.
    pub fn by_status(mut self, range: StatusRange, backoff: BackoffOptions) -> Self {
        self.rules.push((range, backoff));
        self
    }

    fn rule_for(&self, status: u16) -> Option<&BackoffOptions> {
        self.rules
            .iter()
            .find(|(range, _)| range.contains(status))
            .map(|(_, backoff)| backoff)
    }
}

/// HTTP client that retries per a [`FetchRetry`] policy.
///
/// HTTP-level failures never surface as errors: once a response's retry
/// budget is exhausted the response is returned for the caller to
/// interpret. Only network-level failures become [`FetchError`]s.
#[derive(Debug, Clone, Default)]
pub struct RetryClient {
    inner: reqwest::Client,
}

impl RetryClient {
    /// Client with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing [`reqwest::Client`].
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// GET `url`, retrying per `retry`.
    pub async fn get(
        &self,
        url: &str,
        retry: &FetchRetry,
    ) -> Result<reqwest::Response, FetchError> {
        self.fetch(self.inner.get(url), retry).await
    }

    /// Send a prepared request, retrying per `retry`.
    ///
    /// Requests with streaming bodies cannot be replayed; they are sent
    /// exactly once regardless of the policy.
    pub async fn fetch(
        &self,
        request: reqwest::RequestBuilder,
        retry: &FetchRetry,
    ) -> Result<reqwest::Response, FetchError> {
        // Completed attempts so far; the request at index `attempt` is in
        // flight each pass through the loop.
        let mut attempt: u32 = 0;
        loop {
            let Some(current) = request.try_clone() else {
                debug!("Request body cannot be replayed, sending once without retry");
                return Ok(request.send().await?);
            };
            match current.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let Some(backoff) = retry.rule_for(status) else {
                        return Ok(response);
                    };
                    if attempt >= backoff.max_attempts || attempt + 1 >= MAX_TOTAL_ATTEMPTS {
                        debug!(
                            status,
                            attempts = attempt + 1,
                            "Retry budget exhausted, returning response"
                        );
                        return Ok(response);
                    }
                    let delay = status_backoff_delay(backoff, attempt);
                    debug!(
                        status,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying matched status"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if attempt + 1 >= MAX_TOTAL_ATTEMPTS {
                        return Err(FetchError::Request(err));
                    }
                    let delay = network_retry_delay(attempt);
                    warn!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Network error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
            attempt += 1;
        }
    }
}

/// Delay before the retry that follows `attempt` status-matched responses:
/// `min_timeout_ms * factor^attempt`, clamped to `max_timeout_ms`, then
/// jittered when `randomize` is set.
fn status_backoff_delay(backoff: &BackoffOptions, attempt: u32) -> Duration {
    let exponent = attempt.min(i32::MAX as u32) as i32;
    let base = (backoff.min_timeout_ms as f64) * backoff.factor.powi(exponent);
    let mut ms = base.min(backoff.max_timeout_ms as f64);
    if backoff.randomize {
        ms *= 0.5 + rand::random::<f64>();
    }
    if !ms.is_finite() || ms < 0.0 {
        ms = backoff.max_timeout_ms as f64;
    }
    Duration::from_millis(ms as u64)
}

/// Delay before the retry that follows `attempt` network failures: one
/// second, doubled per failure.
fn network_retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1u64 << attempt.min(16)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn spawn_server(status: StatusCode) -> (SocketAddr, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = hits.clone();
        let app = Router::new()
            .route(
                "/",
                get(move |State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    status
                }),
            )
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, hits)
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_status_retried_up_to_policy_limit() {
        let (addr, hits) = spawn_server(StatusCode::SERVICE_UNAVAILABLE).await;
        let retry = FetchRetry::new().by_status(
            "500-599".parse().unwrap(),
            BackoffOptions {
                max_attempts: 2,
                factor: 2.0,
                min_timeout_ms: 100,
                max_timeout_ms: 1000,
                randomize: false,
            },
        );

        let client = RetryClient::new();
        let response = client
            .get(&format!("http://{addr}/"), &retry)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_matching_status_returned_without_retry() {
        let (addr, hits) = spawn_server(StatusCode::NOT_FOUND).await;
        let retry =
            FetchRetry::new().by_status("500-599".parse().unwrap(), BackoffOptions::default());

        let client = RetryClient::new();
        let response = client
            .get(&format!("http://{addr}/"), &retry)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_budget_capped_by_overall_limit() {
        let (addr, hits) = spawn_server(StatusCode::SERVICE_UNAVAILABLE).await;
        let retry = FetchRetry::new().by_status(
            "500-599".parse().unwrap(),
            BackoffOptions {
                max_attempts: 10,
                factor: 2.0,
                min_timeout_ms: 100,
                max_timeout_ms: 1000,
                randomize: false,
            },
        );

        let client = RetryClient::new();
        let response = client
            .get(&format!("http://{addr}/"), &retry)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(hits.load(Ordering::SeqCst), MAX_TOTAL_ATTEMPTS as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_capped_at_four_attempts() {
        // Bind then drop a listener so the port refuses connections.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RetryClient::new();
        let started = tokio::time::Instant::now();
        let result = client
            .get(&format!("http://{addr}/"), &FetchRetry::new())
            .await;

        assert!(result.is_err());
        // Three backoffs between four attempts: 1s + 2s + 4s.
        assert!(started.elapsed() >= Duration::from_secs(7));
    }

    #[test]
    fn test_status_range_parses_single_and_span() {
        let single: StatusRange = "429".parse().unwrap();
        assert!(single.contains(429));
        assert!(!single.contains(430));

        let span: StatusRange = "500-599".parse().unwrap();
        assert!(span.contains(500));
        assert!(span.contains(599));
        assert!(!span.contains(404));

        assert!("5xx".parse::<StatusRange>().is_err());
        assert!("599-500".parse::<StatusRange>().is_err());
        assert!("".parse::<StatusRange>().is_err());
    }

    #[test]
    fn test_backoff_delay_grows_and_clamps() {
        let backoff = BackoffOptions {
            max_attempts: 5,
            factor: 2.0,
            min_timeout_ms: 100,
            max_timeout_ms: 350,
            randomize: false,
        };
        assert_eq!(
            status_backoff_delay(&backoff, 0),
            Duration::from_millis(100)
        );
        assert_eq!(
            status_backoff_delay(&backoff, 1),
            Duration::from_millis(200)
        );
        assert_eq!(
            status_backoff_delay(&backoff, 2),
            Duration::from_millis(350)
        );
    }

    #[test]
    fn test_randomized_delay_stays_in_jitter_window() {
        let backoff = BackoffOptions {
            max_attempts: 1,
            factor: 2.0,
            min_timeout_ms: 1000,
            max_timeout_ms: 60_000,
            randomize: true,
        };
        for _ in 0..32 {
            let delay = status_backoff_delay(&backoff, 0);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay < Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_network_delay_doubles() {
        assert_eq!(network_retry_delay(0), Duration::from_secs(1));
        assert_eq!(network_retry_delay(1), Duration::from_secs(2));
        assert_eq!(network_retry_delay(2), Duration::from_secs(4));
    }
}
