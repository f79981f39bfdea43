//! Retry governor for resource-server requests.
//!
//! Responses are classified into a [`StatusClass`]. Transient statuses (and
//! transient transport failures) are retried up to a bounded number of times
//! with capped exponential backoff; everything else is decided immediately.
//!
//! # Example
//!
//! ```
//! use edl_downloader_core::download::{RetryDecision, RetryPolicy, RetryState};
//!
//! let policy = RetryPolicy::immediate(2);
//! let mut state = RetryState::new(policy.max_retries());
//!
//! state.record_attempt(Some(503));
//! assert!(matches!(policy.should_retry(&state), RetryDecision::Retry { .. }));
//! state.record_attempt(Some(503));
//! state.record_attempt(Some(503));
//! assert!(matches!(policy.should_retry(&state), RetryDecision::DoNotRetry { .. }));
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Status codes treated as transient.
pub const RETRY_ERROR_CODES: [u16; 5] = [408, 500, 502, 503, 504];

/// Default number of retries after the first attempt.
pub const DEFAULT_TOTAL_RETRIES: u32 = 3;

/// Default base delay for exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default maximum delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Default maximum jitter added to delays.
const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(250);

/// Returns true if `status` is one of [`RETRY_ERROR_CODES`].
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    RETRY_ERROR_CODES.contains(&status)
}

/// How the downloader treats a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx: stream the body.
    Success,
    /// 301, 302, 303, 307, 308: follow if a `Location` is present.
    Redirect,
    /// Any other 3xx: returned to the caller as-is.
    OtherRedirection,
    /// 401: fall back to Basic or fail.
    Unauthorized,
    /// One of [`RETRY_ERROR_CODES`].
    Transient,
    /// Everything else.
    Fatal,
}

/// Classifies an HTTP status code.
#[must_use]
#[allow(clippy::match_same_arms)]
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        301 | 302 | 303 | 307 | 308 => StatusClass::Redirect,
        300..=399 => StatusClass::OtherRedirection,
        401 => StatusClass::Unauthorized,
        status if is_retryable_status(status) => StatusClass::Transient,
        _ => StatusClass::Fatal,
    }
}

/// Returns true if a transport error is worth retrying.
///
/// TLS and certificate failures are configuration problems and never retried.
pub(crate) fn is_transient_transport(error: &reqwest::Error) -> bool {
    if error.is_builder() || error.is_redirect() || error.is_decode() {
        return false;
    }
    let message = error.to_string().to_lowercase();
    !(message.contains("certificate")
        || message.contains("tls")
        || message.contains("ssl")
        || message.contains("handshake"))
}

/// Per-call retry bookkeeping.
///
/// Created fresh for each download call and dropped when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempts_made: u32,
    limit: u32,
    last_status: Option<u16>,
}

impl RetryState {
    /// Creates state allowing `limit` retries after the first attempt.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            attempts_made: 0,
            limit,
            last_status: None,
        }
    }

    /// Records one attempt and its status (`None` for transport failures).
    pub fn record_attempt(&mut self, status: Option<u16>) {
        self.attempts_made = self.attempts_made.saturating_add(1);
        self.last_status = status;
    }

    /// Attempts made so far, including the first.
    #[must_use]
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Retry limit.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Status of the most recent attempt.
    #[must_use]
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Retries still available.
    #[must_use]
    pub fn retries_remaining(&self) -> u32 {
        let retries_made = self.attempts_made.saturating_sub(1);
        self.limit.saturating_sub(retries_made)
    }
}

/// Decision on whether to retry a transient failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry limit and backoff shape.
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_TOTAL_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom backoff settings.
    #[must_use]
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            backoff_multiplier,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }

    /// Default backoff with a custom retry limit.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Retries without any delay.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_jitter: Duration::ZERO,
        }
    }

    /// Number of retries allowed after the first attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides whether the transient failure just recorded in `state` is retried.
    #[instrument(level = "debug", skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, state: &RetryState) -> RetryDecision {
        if state.retries_remaining() == 0 {
            debug!(attempts = state.attempts_made(), "retry limit reached");
            return RetryDecision::DoNotRetry {
                reason: format!("retry limit ({}) exhausted", state.limit()),
            };
        }

        let delay = self.calculate_delay(state.attempts_made());
        debug!(
            next_attempt = state.attempts_made() + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: state.attempts_made() + 1,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);
        let exponent = f64::from(attempt.saturating_sub(1));
        let max_ms = self.max_delay.as_millis() as f64;
        let capped_ms = (base_ms * multiplier.powf(exponent)).min(max_ms);

        Duration::from_millis(capped_ms as u64) + self.calculate_jitter()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_error_codes_are_transient() {
        for code in RETRY_ERROR_CODES {
            assert_eq!(classify_status(code), StatusClass::Transient, "{code}");
        }
    }

    #[test]
    fn test_classify_status_table() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(206), StatusClass::Success);
        assert_eq!(classify_status(301), StatusClass::Redirect);
        assert_eq!(classify_status(302), StatusClass::Redirect);
        assert_eq!(classify_status(303), StatusClass::Redirect);
        assert_eq!(classify_status(307), StatusClass::Redirect);
        assert_eq!(classify_status(308), StatusClass::Redirect);
        assert_eq!(classify_status(304), StatusClass::OtherRedirection);
        assert_eq!(classify_status(401), StatusClass::Unauthorized);
        assert_eq!(classify_status(403), StatusClass::Fatal);
        assert_eq!(classify_status(404), StatusClass::Fatal);
        assert_eq!(classify_status(599), StatusClass::Fatal);
    }

    #[test]
    fn test_retry_state_counts_retries_after_first_attempt() {
        let mut state = RetryState::new(2);
        assert_eq!(state.retries_remaining(), 2);
        state.record_attempt(Some(503));
        assert_eq!(state.retries_remaining(), 2);
        state.record_attempt(Some(502));
        assert_eq!(state.retries_remaining(), 1);
        state.record_attempt(None);
        assert_eq!(state.retries_remaining(), 0);
        assert_eq!(state.attempts_made(), 3);
        assert_eq!(state.last_status(), None);
    }

    #[test]
    fn test_should_retry_until_limit() {
        let policy = RetryPolicy::immediate(DEFAULT_TOTAL_RETRIES);
        let mut state = RetryState::new(policy.max_retries());
        for expected_attempt in 2..=DEFAULT_TOTAL_RETRIES + 1 {
            state.record_attempt(Some(503));
            assert_eq!(
                policy.should_retry(&state),
                RetryDecision::Retry {
                    delay: Duration::ZERO,
                    attempt: expected_attempt
                }
            );
        }
        state.record_attempt(Some(503));
        match policy.should_retry(&state) {
            RetryDecision::DoNotRetry { reason } => assert!(reason.contains("exhausted")),
            other => panic!("expected DoNotRetry, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_retry_limit_never_retries() {
        let policy = RetryPolicy::immediate(0);
        let mut state = RetryState::new(0);
        state.record_attempt(Some(500));
        assert!(matches!(
            policy.should_retry(&state),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = RetryPolicy::new(
            10,
            Duration::from_millis(100),
            Duration::from_millis(350),
            2.0,
        );
        let first = policy.calculate_delay(1);
        assert!(first >= Duration::from_millis(100));
        assert!(first <= Duration::from_millis(100) + DEFAULT_MAX_JITTER);
        let second = policy.calculate_delay(2);
        assert!(second >= Duration::from_millis(200));
        let capped = policy.calculate_delay(8);
        assert!(capped >= Duration::from_millis(350));
        assert!(capped <= Duration::from_millis(350) + DEFAULT_MAX_JITTER);
    }

    #[test]
    fn test_immediate_policy_has_no_delay() {
        let policy = RetryPolicy::immediate(3);
        for attempt in 1..5 {
            assert_eq!(policy.calculate_delay(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), DEFAULT_TOTAL_RETRIES);
        assert_eq!(policy.base_delay, DEFAULT_BASE_DELAY);
        assert_eq!(policy.max_delay, DEFAULT_MAX_DELAY);
    }
}
