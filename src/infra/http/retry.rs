//! Retry policy for Mealie API calls.

use std::time::Duration;

use super::error::ApiError;

/// Bounded retries. Transport failures back off linearly
/// (`base_delay × attempt`); 5xx responses are retried at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether a failure on the 1-based `attempt` should be retried.
    pub fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        attempt < self.max_attempts() && error.is_transient()
    }

    /// Pause before the attempt following a failed 1-based `attempt`.
    pub fn delay_for(&self, error: &ApiError, attempt: u32) -> Duration {
        match error {
            ApiError::Request(_) => self.base_delay.saturating_mul(attempt),
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn transport_backoff_is_linear_in_attempt_number() {
        let policy = RetryPolicy::default();
        let err = ApiError::Request("connection refused".into());
        assert_eq!(policy.delay_for(&err, 1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(&err, 2), Duration::from_secs(2));
    }

    #[test]
    fn server_errors_retry_without_pause() {
        let policy = RetryPolicy::default();
        let err = ApiError::status(StatusCode::BAD_GATEWAY, b"upstream down");
        assert!(policy.should_retry(&err, 1));
        assert_eq!(policy.delay_for(&err, 1), Duration::ZERO);
        assert_eq!(policy.delay_for(&err, 2), Duration::ZERO);
    }

    #[test]
    fn retries_stop_after_budget() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let err = ApiError::Request("timed out".into());

        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.should_retry(&err, 1));
        assert!(policy.should_retry(&err, 2));
        assert!(!policy.should_retry(&err, 3));
    }

    #[test]
    fn client_errors_are_never_retried() {
        let policy = RetryPolicy::default();
        let err = ApiError::status(StatusCode::UNAUTHORIZED, b"bad token");
        assert!(!policy.should_retry(&err, 1));
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let err = ApiError::status(StatusCode::SERVICE_UNAVAILABLE, b"");
        assert!(!policy.should_retry(&err, 1));
    }
}
