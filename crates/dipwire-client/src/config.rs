//! Client configuration.

use std::time::Duration;

/// Per-connection client settings.
///
/// ```rust
/// use std::time::Duration;
/// use dipwire_client::{ClientConfig, RetryPolicy};
///
/// let config = ClientConfig::default()
///     .request_timeout(Duration::from_secs(5))
///     .retry(RetryPolicy::new(3, Duration::from_millis(200)));
/// assert_eq!(config.retry.max_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long `send_request` waits for the matching response.
    ///
    /// Default: 30 seconds.
    pub request_timeout: Duration,

    /// Re-send policy used by the typed operations after a timeout.
    ///
    /// Default: a single attempt.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// How often to re-send a request that timed out.
///
/// Each re-send reuses the original `request_id` and sets `re_sent`, so the
/// server can answer from its cache instead of repeating side effects. Only
/// timeouts are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `1` disables retrying.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
