//! Retry policy, backoff and the attempt state machine.
//!
//! A [`RetryPolicy`] is resolved once per call from the client's
//! [`RetryConfig`]. The retry stage drives it:
//!
//! ```text
//!              success
//! Attempting(n) ──────────► Succeeded
//!      │  retryable, n < max
//!      ├──────────────────► Attempting(n+1)
//!      │  fatal, or n == max
//!      ├──────────────────► Exhausted
//!      │  cancellation
//!      └──────────────────► Cancelled
//! ```
//!
//! ## Delays
//!
//! | Strategy | Delay for attempt `k` |
//! |---|---|
//! | `NoBackoff` | 0 |
//! | `Exponential` | `min(min_delay * 2^(k-1), max_delay)` |
//! | `ExponentialWithJitter` | `floor(min(max_delay, base + random * base))` |

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use volcstack_config::{RetryConfig, RetryStrategy, StrategyName};
use volcstack_core::SdkError;

/// Transport error codes the default predicate treats as transient.
pub const RETRYABLE_NETWORK_CODES: [&str; 10] = [
    "ECONNREFUSED",
    "ETIMEDOUT",
    "ECONNRESET",
    "ENOTFOUND",
    "EHOSTUNREACH",
    "EAI_AGAIN",
    "EPROTO",
    "ECONNABORTED",
    "ENETUNREACH",
    "EPIPE",
];

/// HTTP statuses the default predicate retries.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Returns true if the default policy would retry `error`.
#[must_use]
pub fn default_should_retry(error: &SdkError) -> bool {
    if error.is_cancelled() {
        return false;
    }
    if error
        .code()
        .is_some_and(|code| RETRYABLE_NETWORK_CODES.contains(&code))
    {
        return true;
    }
    error
        .status()
        .is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
}

/// Exponential base delay for `attempt` (1-based), capped at `max_ms`.
#[must_use]
pub fn exponential_base(attempt: u32, min_ms: u64, max_ms: u64) -> u64 {
    let shift = attempt.saturating_sub(1).min(63);
    let factor = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    min_ms.saturating_mul(factor).min(max_ms)
}

/// Computes the backoff delay for `attempt` under `strategy`.
///
/// `random` is a sample from `[0, 1)`; it only affects the jitter strategy.
#[must_use]
pub fn backoff_delay(
    strategy: StrategyName,
    attempt: u32,
    min_ms: u64,
    max_ms: u64,
    random: f64,
) -> Duration {
    let millis = match strategy {
        StrategyName::NoBackoff => 0,
        StrategyName::Exponential => exponential_base(attempt, min_ms, max_ms),
        StrategyName::ExponentialWithJitter => {
            let base = exponential_base(attempt, min_ms, max_ms) as f64;
            (base + random * base).min(max_ms as f64).floor() as u64
        }
    };
    Duration::from_millis(millis)
}

/// Retry behaviour resolved for one call.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    strategy: StrategyName,
    min_delay_ms: u64,
    max_delay_ms: u64,
    custom: Option<Arc<dyn RetryStrategy>>,
}

impl RetryPolicy {
    /// Resolves the policy from configuration.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            strategy: config.strategy,
            min_delay_ms: config.min_retry_delay_ms,
            max_delay_ms: config.max_retry_delay_ms,
            custom: config.custom_strategy.clone(),
        }
    }

    /// Total number of attempts, always at least 1.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if `error` should be retried, ignoring the attempt budget.
    ///
    /// Cancellation is never retried.
    #[must_use]
    pub fn should_retry(&self, error: &SdkError) -> bool {
        if error.is_cancelled() {
            return false;
        }
        self.custom
            .as_ref()
            .and_then(|custom| custom.retry_if(error))
            .unwrap_or_else(|| default_should_retry(error))
    }

    /// Returns the delay to wait after failed attempt `attempt`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        if let Some(delay) = self.custom.as_ref().and_then(|custom| custom.delay(attempt)) {
            return delay;
        }
        let random = if self.strategy == StrategyName::ExponentialWithJitter {
            rand::thread_rng().gen::<f64>()
        } else {
            0.0
        };
        backoff_delay(
            self.strategy,
            attempt,
            self.min_delay_ms,
            self.max_delay_ms,
            random,
        )
    }

    /// Classifies the result of attempt `attempt`.
    #[must_use]
    pub fn classify<T>(&self, attempt: u32, result: &Result<T, SdkError>) -> AttemptOutcome {
        match result {
            Ok(_) => AttemptOutcome::Success,
            Err(err) if err.is_cancelled() => AttemptOutcome::Cancelled,
            Err(err) if attempt < self.max_attempts && self.should_retry(err) => {
                AttemptOutcome::Retryable
            }
            Err(_) => AttemptOutcome::Fatal,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("strategy", &self.strategy)
            .field("min_delay_ms", &self.min_delay_ms)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Classification of one attempt's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt succeeded.
    Success,
    /// The attempt failed and another attempt is allowed.
    Retryable,
    /// The attempt failed and no further attempt will be made.
    Fatal,
    /// The call was cancelled.
    Cancelled,
}

/// State of a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `n` (1-based) is in progress.
    Attempting(u32),
    /// An attempt succeeded.
    Succeeded,
    /// The last attempt failed and no further attempt will be made.
    Exhausted,
    /// The call was cancelled.
    Cancelled,
}

impl RetryState {
    /// The initial state.
    pub const START: RetryState = RetryState::Attempting(1);

    /// Applies `outcome` to the current state.
    ///
    /// Terminal states absorb every outcome.
    #[must_use]
    pub const fn transition(self, outcome: AttemptOutcome) -> RetryState {
        match (self, outcome) {
            (Self::Attempting(_), AttemptOutcome::Success) => Self::Succeeded,
            (Self::Attempting(n), AttemptOutcome::Retryable) => Self::Attempting(n + 1),
            (Self::Attempting(_), AttemptOutcome::Fatal) => Self::Exhausted,
            (Self::Attempting(_), AttemptOutcome::Cancelled) => Self::Cancelled,
            (terminal, _) => terminal,
        }
    }

    /// Returns true for `Succeeded`, `Exhausted` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct ThrottleOnly;

    impl RetryStrategy for ThrottleOnly {
        fn retry_if(&self, error: &SdkError) -> Option<bool> {
            Some(error.status() == Some(429))
        }

        fn delay(&self, attempt: u32) -> Option<Duration> {
            Some(Duration::from_millis(u64::from(attempt) * 10))
        }
    }

    struct DelayOnly;

    impl RetryStrategy for DelayOnly {
        fn delay(&self, _attempt: u32) -> Option<Duration> {
            Some(Duration::from_millis(7))
        }
    }

    #[test]
    fn test_default_predicate() {
        assert!(default_should_retry(&SdkError::network(
            "Network error: reset",
            Some("ECONNRESET".into())
        )));
        assert!(default_should_retry(&SdkError::api("HTTP 429: Too Many Requests", 429, None)));
        assert!(default_should_retry(&SdkError::api("HTTP 503", 503, None)));
        assert!(!default_should_retry(&SdkError::api("HTTP 400", 400, None)));
        assert!(!default_should_retry(&SdkError::api("SSL Error: x", 0, None)));
        assert!(!default_should_retry(&SdkError::network("Network error: timeout", None)));
        assert!(!default_should_retry(&SdkError::signing("bad header")));
        assert!(!default_should_retry(&SdkError::exception("other")));
    }

    #[test]
    fn test_exponential_base() {
        assert_eq!(exponential_base(1, 300, 300_000), 300);
        assert_eq!(exponential_base(2, 300, 300_000), 600);
        assert_eq!(exponential_base(4, 300, 300_000), 2400);
        assert_eq!(exponential_base(20, 300, 300_000), 300_000);
        assert_eq!(exponential_base(200, 300, 300_000), 300_000);
    }

    #[test]
    fn test_named_strategies() {
        assert_eq!(
            backoff_delay(StrategyName::NoBackoff, 3, 300, 300_000, 0.5),
            Duration::ZERO
        );
        assert_eq!(
            backoff_delay(StrategyName::Exponential, 3, 300, 300_000, 0.5),
            Duration::from_millis(1200)
        );
        assert_eq!(
            backoff_delay(StrategyName::ExponentialWithJitter, 3, 300, 300_000, 0.5),
            Duration::from_millis(1800)
        );
        // Jitter is re-capped at the maximum.
        assert_eq!(
            backoff_delay(StrategyName::ExponentialWithJitter, 2, 300, 1000, 0.9),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);

        let config = RetryConfig {
            auto_retry: false,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts(), 1);
    }

    #[test]
    fn test_custom_strategy_overrides_defaults() {
        let config = RetryConfig::default().with_custom_strategy(Arc::new(ThrottleOnly));
        let policy = RetryPolicy::from_config(&config);

        assert!(policy.should_retry(&SdkError::api("throttled", 429, None)));
        assert!(!policy.should_retry(&SdkError::api("down", 503, None)));
        assert_eq!(policy.delay(3), Duration::from_millis(30));
    }

    #[test]
    fn test_partial_custom_strategy_falls_back() {
        let config = RetryConfig::default().with_custom_strategy(Arc::new(DelayOnly));
        let policy = RetryPolicy::from_config(&config);

        assert!(policy.should_retry(&SdkError::api("down", 503, None)));
        assert!(!policy.should_retry(&SdkError::api("bad", 400, None)));
        assert_eq!(policy.delay(1), Duration::from_millis(7));
    }

    #[test]
    fn test_classify() {
        let policy = RetryPolicy::default();
        let retryable: Result<(), _> = Err(SdkError::api("down", 502, None));
        let fatal: Result<(), _> = Err(SdkError::api("bad", 400, None));
        let cancelled: Result<(), _> = Err(SdkError::cancelled("aborted"));

        assert_eq!(policy.classify(1, &Ok::<_, SdkError>(())), AttemptOutcome::Success);
        assert_eq!(policy.classify(1, &retryable), AttemptOutcome::Retryable);
        assert_eq!(policy.classify(4, &retryable), AttemptOutcome::Fatal);
        assert_eq!(policy.classify(1, &fatal), AttemptOutcome::Fatal);
        assert_eq!(policy.classify(1, &cancelled), AttemptOutcome::Cancelled);
    }

    #[test]
    fn test_state_machine() {
        let state = RetryState::START;
        assert_eq!(state.transition(AttemptOutcome::Retryable), RetryState::Attempting(2));
        assert_eq!(state.transition(AttemptOutcome::Success), RetryState::Succeeded);
        assert_eq!(state.transition(AttemptOutcome::Fatal), RetryState::Exhausted);
        assert_eq!(state.transition(AttemptOutcome::Cancelled), RetryState::Cancelled);

        for terminal in [RetryState::Succeeded, RetryState::Exhausted, RetryState::Cancelled] {
            assert!(terminal.is_terminal());
            assert_eq!(terminal.transition(AttemptOutcome::Retryable), terminal);
        }
        assert!(!state.is_terminal());
    }

    proptest! {
        #[test]
        fn jitter_stays_within_one_base(
            attempt in 1u32..12,
            min in 1u64..5_000,
            random in 0.0f64..1.0,
        ) {
            let max = 300_000;
            let base = exponential_base(attempt, min, max);
            let delay = backoff_delay(StrategyName::ExponentialWithJitter, attempt, min, max, random)
                .as_millis() as u64;
            prop_assert!(delay >= base);
            prop_assert!(delay <= max);
            if base * 2 <= max {
                prop_assert!(delay < base * 2);
            }
        }

        #[test]
        fn policy_jitter_delay_in_range(attempt in 1u32..10) {
            let policy = RetryPolicy::default();
            let base = exponential_base(attempt, 300, 300_000);
            let delay = policy.delay(attempt).as_millis() as u64;
            prop_assert!(delay >= base);
            prop_assert!(delay < base * 2);
        }
    }
}
