//! Bounded retry for outbound Spotify calls.
//!
//! Transport failures are retried with exponential backoff. A `429 Too Many
//! Requests` response is also retried, waiting for the server-provided
//! `Retry-After` duration when one is present. Every other response, error
//! statuses included, is handed back to the caller untouched.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, warn};

/// Attempt budget and backoff base for [`fetch_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait before retrying after the zero-based `attempt` failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// What the retry loop needs to know about a response.
pub trait RateLimitedResponse {
    fn is_rate_limited(&self) -> bool;

    /// Server-requested wait, if the response carries a usable one.
    fn retry_after(&self) -> Option<Duration>;
}

impl RateLimitedResponse for reqwest::Response {
    fn is_rate_limited(&self) -> bool {
        self.status() == StatusCode::TOO_MANY_REQUESTS
    }

    fn retry_after(&self) -> Option<Duration> {
        self.headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after)
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    // Rejects negative, non-finite and out-of-range values
    Duration::try_from_secs_f64(secs).ok()
}

/// Run `operation` until it yields a response that is not rate limited, or
/// until `policy.max_attempts` attempts have been spent.
///
/// A rate-limited response on the last attempt is returned as-is; a
/// transport error on the last attempt is returned as the error.
pub async fn fetch_with_retry<F, Fut, R, E>(policy: &RetryPolicy, mut operation: F) -> Result<R, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: RateLimitedResponse,
    E: Display,
{
    let mut attempt = 0;

    loop {
        let final_attempt = attempt + 1 >= policy.max_attempts;

        match operation().await {
            Ok(response) if response.is_rate_limited() => {
                if final_attempt {
                    warn!(
                        attempts = attempt + 1,
                        "Still rate limited after all attempts"
                    );
                    return Ok(response);
                }

                let wait = response
                    .retry_after()
                    .unwrap_or_else(|| policy.backoff(attempt));
                warn!(
                    wait_ms = wait.as_millis() as u64,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    "Rate limited, waiting before retry"
                );
                drop(response);
                tokio::time::sleep(wait).await;
            }
            Ok(response) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, "Request succeeded after retry");
                }
                return Ok(response);
            }
            Err(e) => {
                if final_attempt {
                    warn!(error = %e, attempts = attempt + 1, "Request failed after all attempts");
                    return Err(e);
                }

                let wait = policy.backoff(attempt);
                warn!(
                    error = %e,
                    wait_ms = wait.as_millis() as u64,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    "Request failed, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            }
        }

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeResponse {
        status: u16,
        retry_after: Option<Duration>,
    }

    impl FakeResponse {
        fn ok() -> Self {
            Self { status: 200, retry_after: None }
        }

        fn limited(retry_after: Option<Duration>) -> Self {
            Self { status: 429, retry_after }
        }
    }

    impl RateLimitedResponse for FakeResponse {
        fn is_rate_limited(&self) -> bool {
            self.status == 429
        }

        fn retry_after(&self) -> Option<Duration> {
            self.retry_after
        }
    }

    type Scripted = Result<FakeResponse, &'static str>;

    async fn run(policy: RetryPolicy, script: Vec<Scripted>) -> (Scripted, usize, Duration) {
        let mut script = VecDeque::from(script);
        let mut calls = 0;
        let start = Instant::now();

        let result = fetch_with_retry(&policy, || {
            calls += 1;
            let next = script.pop_front().expect("script exhausted");
            async move { next }
        })
        .await;

        (result, calls, start.elapsed())
    }

    fn assert_waited(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "waited {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 0.5 "), Some(Duration::from_millis(500)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_parse_retry_after_rejects_unrepresentable_waits() {
        assert_eq!(parse_retry_after("1e30"), None);
        assert_eq!(parse_retry_after("inf"), None);
        assert_eq!(parse_retry_after("NaN"), None);
    }

    #[test]
    fn test_policy_keeps_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_returns_immediately() {
        let (result, calls, elapsed) = run(RetryPolicy::default(), vec![Ok(FakeResponse::ok())]).await;

        assert_eq!(result, Ok(FakeResponse::ok()));
        assert_eq!(calls, 1);
        assert_waited(elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_honors_declared_wait() {
        let (result, calls, elapsed) = run(
            RetryPolicy::default(),
            vec![
                Ok(FakeResponse::limited(Some(Duration::from_secs(7)))),
                Ok(FakeResponse::ok()),
            ],
        )
        .await;

        assert_eq!(result, Ok(FakeResponse::ok()));
        assert_eq!(calls, 2);
        assert_waited(elapsed, Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_header_uses_backoff() {
        let (result, calls, elapsed) = run(
            RetryPolicy::default(),
            vec![
                Ok(FakeResponse::limited(None)),
                Ok(FakeResponse::limited(None)),
                Ok(FakeResponse::ok()),
            ],
        )
        .await;

        assert_eq!(result, Ok(FakeResponse::ok()));
        assert_eq!(calls, 3);
        // 1000ms after the first attempt, 2000ms after the second
        assert_waited(elapsed, Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_consumes_attempt_budget() {
        let (result, calls, elapsed) = run(
            RetryPolicy::default(),
            vec![
                Ok(FakeResponse::limited(Some(Duration::from_secs(1)))),
                Ok(FakeResponse::limited(Some(Duration::from_secs(1)))),
                Ok(FakeResponse::limited(Some(Duration::from_secs(1)))),
            ],
        )
        .await;

        assert_eq!(result, Ok(FakeResponse::limited(Some(Duration::from_secs(1)))));
        assert_eq!(calls, 3);
        // No wait after the final attempt
        assert_waited(elapsed, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_error_status_is_not_retried() {
        let server_error = FakeResponse { status: 500, retry_after: None };
        let (result, calls, elapsed) = run(RetryPolicy::default(), vec![Ok(server_error.clone())]).await;

        assert_eq!(result, Ok(server_error));
        assert_eq!(calls, 1);
        assert_waited(elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_retried_with_backoff() {
        let (result, calls, elapsed) = run(
            RetryPolicy::default(),
            vec![Err("connection reset"), Ok(FakeResponse::ok())],
        )
        .await;

        assert_eq!(result, Ok(FakeResponse::ok()));
        assert_eq!(calls, 2);
        assert_waited(elapsed, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_surfaces_after_exhaustion() {
        let (result, calls, elapsed) = run(
            RetryPolicy::default(),
            vec![Err("timeout"), Err("timeout"), Err("refused")],
        )
        .await;

        assert_eq!(result, Err("refused"));
        assert_eq!(calls, 3);
        assert_waited(elapsed, Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_failures_share_budget() {
        let (result, calls, elapsed) = run(
            RetryPolicy::new(3, Duration::from_millis(100)),
            vec![
                Err("reset"),
                Ok(FakeResponse::limited(Some(Duration::from_secs(2)))),
                Ok(FakeResponse::ok()),
            ],
        )
        .await;

        assert_eq!(result, Ok(FakeResponse::ok()));
        assert_eq!(calls, 3);
        assert_waited(elapsed, Duration::from_millis(2100));
    }
}
