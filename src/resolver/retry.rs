//! Retry policy with increasing backoff for transient lookup failures.
//!
//! Only lookup requests are retried. A lookup response is classified into a
//! [`FailureType`]; the [`RetryPolicy`] then decides whether another attempt
//! is made and how long to wait first.
//!
//! # Example
//!
//! ```
//! use patent_bundler::resolver::{FailureType, RetryDecision, RetryPolicy, classify_status};
//!
//! let policy = RetryPolicy::default();
//! let failure = classify_status(503);
//! assert_eq!(failure, FailureType::Transient);
//!
//! match policy.should_retry(failure, 1) {
//!     RetryDecision::Retry { delay, attempt } => println!("retry #{attempt} in {delay:?}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, instrument};

/// Default maximum attempts per slug, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default cap on any single retry delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(4);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Default maximum jitter added to computed delays.
const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of a failed lookup response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Server-side condition that may clear on retry (any 5xx).
    Transient,

    /// Server asked the client to slow down (HTTP 429).
    RateLimited,

    /// The page does not exist or will never be served to us.
    Permanent,
}

/// Decision on whether to retry a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Attempt number of the retry (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Stop retrying.
    DoNotRetry {
        /// Human-readable reason why no retry is made.
        reason: String,
    },
}

/// Backoff configuration for lookup retries.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter
/// ```
///
/// With defaults, delays are approximately 0.5s then 1s before attempts run out.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings and the default jitter.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }

    /// Creates a policy with custom attempts and base delay, defaults elsewhere.
    #[must_use]
    pub fn with_attempts_and_delay(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: DEFAULT_MAX_DELAY.max(base_delay),
            ..Self::default()
        }
    }

    /// Returns a copy of this policy with a different jitter ceiling.
    #[must_use]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Policy that never waits between attempts (tests and local mirrors).
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, 1.0).with_max_jitter(Duration::ZERO)
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the cap applied to any single delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Clamps a server-mandated delay to this policy's maximum.
    #[must_use]
    pub fn clamp_server_delay(&self, delay: Duration) -> Duration {
        delay.min(self.max_delay)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * f64::from(self.backoff_multiplier).powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + self.calculate_jitter()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
        Duration::from_millis(jitter_ms)
    }
}

/// Classifies a non-success lookup status.
///
/// 429 is rate limiting, every 5xx is transient, anything else is permanent.
#[must_use]
pub fn classify_status(status: u16) -> FailureType {
    match status {
        429 => FailureType::RateLimited,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

/// Parses a `Retry-After` header value (delta-seconds or HTTP-date).
///
/// Returns `None` for negative, malformed, or past values.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        return u64::try_from(seconds).ok().map(Duration::from_secs);
    }

    httpdate::parse_http_date(header_value)
        .ok()
        .and_then(|when| when.duration_since(SystemTime::now()).ok())
}
