//! Retrying, throttle-aware page fetcher.

use crate::error::FetchError;
use crate::http::HttpTransport;
use crate::identity::IdentityRotator;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff with a floor and a ceiling.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Lower bound on any retry delay.
        floor: Duration,
        /// Upper bound on any retry delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential { base, floor, max } => {
                let multiplier = 2u64.saturating_pow(attempt);
                let delay =
                    Duration::from_millis((base.as_millis() as u64).saturating_mul(multiplier));
                delay.clamp(*floor, *max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            floor: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

/// Retry policy for upstream throttle and unavailability responses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt ceiling, the first attempt included.
    pub max_attempts: u32,
    /// Backoff strategy between attempts.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffStrategy::default(),
        }
    }

    /// Set backoff strategy.
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Randomized pause applied after every completed call, success or
/// terminal failure, to avoid burst patterns against the upstream.
#[derive(Debug, Clone, Copy)]
pub struct PacingWindow {
    pub min: Duration,
    pub max: Duration,
}

impl PacingWindow {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// A zero-width window, useful in tests.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Issues HTTP requests with bounded retry/backoff and upstream-throttle
/// detection.
///
/// Every attempt carries a fresh identity from the rotator. HTTP 429 and
/// 503 are retried up to the policy's attempt ceiling; any other non-2xx
/// status returns immediately as [`FetchError::BadStatus`]. All failures
/// cross this boundary as typed results.
pub struct Fetcher<T: HttpTransport> {
    transport: T,
    rotator: IdentityRotator,
    policy: RetryPolicy,
    pacing: PacingWindow,
}

impl<T: HttpTransport> Fetcher<T> {
    pub fn new(
        transport: T,
        rotator: IdentityRotator,
        policy: RetryPolicy,
        pacing: PacingWindow,
    ) -> Self {
        Self {
            transport,
            rotator,
            policy,
            pacing,
        }
    }

    /// Fetch a page, returning its markup.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let result = self.fetch_inner(url).await;
        tokio::time::sleep(self.pacing.sample()).await;
        result
    }

    /// Fetch with query parameters appended to the URL.
    pub async fn fetch_with_params(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let url = reqwest::Url::parse_with_params(url, params)
            .map_err(|e| FetchError::Network(e.to_string()))?;
        self.fetch(url.as_str()).await
    }

    async fn fetch_inner(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            let identity = self.rotator.next_identity();
            let error = match self.transport.get(url, &identity).await {
                Ok(response) => match response.status {
                    200..=299 => {
                        debug!(url, attempt, "fetch succeeded");
                        return Ok(response.body);
                    }
                    429 => FetchError::Throttled,
                    503 => FetchError::Unavailable,
                    status => FetchError::BadStatus(status),
                },
                Err(e) => e,
            };

            attempt += 1;
            if !error.is_retryable() || attempt >= self.policy.max_attempts {
                warn!(url, attempt, %error, "fetch failed");
                return Err(error);
            }

            let delay = self.policy.backoff.delay_for_attempt(attempt - 1);
            warn!(url, attempt, delay_ms = delay.as_millis() as u64, %error, "retrying fetch");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that replays a scripted sequence of responses.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<HttpResponse, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<HttpResponse, FetchError>>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(
            &self,
            _url: &str,
            identity: &crate::identity::Identity,
        ) -> Result<HttpResponse, FetchError> {
            assert!(!identity.user_agent.is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(FetchError::Network("script exhausted".to_string())))
        }
    }

    fn status(code: u16) -> Result<HttpResponse, FetchError> {
        Ok(HttpResponse {
            status: code,
            body: format!("body-{code}"),
        })
    }

    fn fetcher(transport: ScriptedTransport, attempts: u32) -> Fetcher<ScriptedTransport> {
        Fetcher::new(
            transport,
            IdentityRotator::with_defaults(),
            RetryPolicy::new(attempts)
                .with_backoff(BackoffStrategy::Fixed(Duration::from_millis(1))),
            PacingWindow::none(),
        )
    }

    #[tokio::test]
    async fn test_succeeds_after_two_throttles() {
        // scenario: 429, 429, then 200 inside a 3-attempt ceiling
        let f = fetcher(
            ScriptedTransport::new(vec![status(429), status(429), status(200)]),
            3,
        );
        let body = f.fetch("https://example.com/s").await.unwrap();
        assert_eq!(body, "body-200");
        assert_eq!(f.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausts_retries_and_returns_last_error() {
        let f = fetcher(
            ScriptedTransport::new(vec![status(429), status(429), status(503)]),
            3,
        );
        let err = f.fetch("https://example.com/s").await.unwrap_err();
        assert_eq!(err, FetchError::Unavailable);
        assert_eq!(f.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_bad_status_is_not_retried() {
        let f = fetcher(ScriptedTransport::new(vec![status(404)]), 3);
        let err = f.fetch("https://example.com/missing").await.unwrap_err();
        assert_eq!(err, FetchError::BadStatus(404));
        assert_eq!(f.transport.calls(), 1);

        let f = fetcher(ScriptedTransport::new(vec![status(403)]), 3);
        let err = f.fetch("https://example.com/denied").await.unwrap_err();
        assert_eq!(err, FetchError::BadStatus(403));
        assert_eq!(f.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_network_error_is_terminal() {
        let f = fetcher(
            ScriptedTransport::new(vec![Err(FetchError::Network("reset".to_string()))]),
            3,
        );
        let err = f.fetch("https://example.com/s").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert_eq!(f.transport.calls(), 1);
    }

    #[test]
    fn test_backoff_respects_floor_and_ceiling() {
        let backoff = BackoffStrategy::Exponential {
            base: Duration::from_millis(100),
            floor: Duration::from_millis(250),
            max: Duration::from_secs(2),
        };
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(250));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(2));
    }
}
