//! Retry configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use volcstack_core::SdkError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default lower bound of the backoff delay, in milliseconds.
pub const DEFAULT_MIN_RETRY_DELAY_MS: u64 = 300;

/// Default upper bound of the backoff delay, in milliseconds.
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 300_000;

/// Named backoff strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyName {
    /// Retry immediately.
    NoBackoff,
    /// `min(min_delay * 2^(attempt-1), max_delay)`.
    Exponential,
    /// Exponential base plus up to one base of random jitter, capped at the max delay.
    #[default]
    ExponentialWithJitter,
}

impl StrategyName {
    /// Parses a strategy name, accepting the variant name in any case or snake case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().replace('_', "").as_str() {
            "nobackoff" | "nobackoffstrategy" => Some(Self::NoBackoff),
            "exponential" | "exponentialbackoffstrategy" => Some(Self::Exponential),
            "exponentialwithjitter" | "exponentialwithrandomjitterbackoffstrategy" => {
                Some(Self::ExponentialWithJitter)
            }
            _ => None,
        }
    }
}

/// Caller-supplied retry hooks.
///
/// Either hook may decline by returning `None`, in which case the default
/// predicate or the named strategy's delay is used.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use volcstack_config::RetryStrategy;
/// use volcstack_core::SdkError;
///
/// struct OnlyThrottling;
///
/// impl RetryStrategy for OnlyThrottling {
///     fn retry_if(&self, error: &SdkError) -> Option<bool> {
///         Some(error.status() == Some(429))
///     }
///
///     fn delay(&self, attempt: u32) -> Option<Duration> {
///         Some(Duration::from_secs(u64::from(attempt)))
///     }
/// }
/// ```
pub trait RetryStrategy: Send + Sync + 'static {
    /// Decides whether `error` is retried.
    fn retry_if(&self, error: &SdkError) -> Option<bool> {
        let _ = error;
        None
    }

    /// Returns the delay before the attempt following attempt number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Option<Duration> {
        let _ = attempt;
        None
    }
}

/// Retry section of the client configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retry failed calls at all.
    #[serde(default = "default_true")]
    pub auto_retry: bool,

    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Named backoff strategy.
    #[serde(default)]
    pub strategy: StrategyName,

    /// Lower bound of the backoff delay in milliseconds.
    #[serde(default = "default_min_retry_delay")]
    pub min_retry_delay_ms: u64,

    /// Upper bound of the backoff delay in milliseconds.
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,

    /// Programmatic hooks overriding the predicate and the delay.
    #[serde(skip)]
    pub custom_strategy: Option<Arc<dyn RetryStrategy>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            auto_retry: true,
            max_retries: DEFAULT_MAX_RETRIES,
            strategy: StrategyName::default(),
            min_retry_delay_ms: DEFAULT_MIN_RETRY_DELAY_MS,
            max_retry_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
            custom_strategy: None,
        }
    }
}

impl RetryConfig {
    /// Returns the number of attempts a call gets, never less than one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        if self.auto_retry {
            self.max_retries.saturating_add(1).max(1)
        } else {
            1
        }
    }

    /// Attaches caller-supplied retry hooks.
    #[must_use]
    pub fn with_custom_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.custom_strategy = Some(strategy);
        self
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("auto_retry", &self.auto_retry)
            .field("max_retries", &self.max_retries)
            .field("strategy", &self.strategy)
            .field("min_retry_delay_ms", &self.min_retry_delay_ms)
            .field("max_retry_delay_ms", &self.max_retry_delay_ms)
            .field("custom_strategy", &self.custom_strategy.is_some())
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_min_retry_delay() -> u64 {
    DEFAULT_MIN_RETRY_DELAY_MS
}

fn default_max_retry_delay() -> u64 {
    DEFAULT_MAX_RETRY_DELAY_MS
}
