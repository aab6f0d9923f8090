//! Structured logging for the Volcstack client.
//!
//! The client and its stages emit `tracing` events; this module installs a
//! `tracing-subscriber` registry that writes them out.
//!
//! # Example
//!
//! ```rust,no_run
//! use volcstack_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(command = "DescribeInstances", "Sending request");
//! # Ok::<(), volcstack_telemetry::TelemetryError>(())
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directives, e.g. `info` or `volcstack_middleware=debug,warn`.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,

    /// Include span open and close events.
    pub span_events: bool,

    /// Include file and line of the call site.
    pub file_line_info: bool,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include the event target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at `debug` level with call sites.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// JSON output at `info` level.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Replaces the filter directives.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Installs the global subscriber described by `config`.
///
/// A disabled configuration installs nothing.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidConfig`] for an empty filter and
/// [`TelemetryError::LoggingInit`] if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    let layer = if config.json_format {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.pretty().with_filter(filter).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses filter directives.
///
/// # Errors
///
/// Returns an error if `directives` is blank or invalid.
pub fn create_env_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    if directives.trim().is_empty() {
        return Err(TelemetryError::InvalidConfig("log level is empty".to_string()));
    }
    EnvFilter::try_new(directives)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let dev = LogConfig::development();
        assert!(!dev.json_format);
        assert!(dev.span_events);
        assert_eq!(dev.level, "debug");

        let prod = LogConfig::production();
        assert!(prod.json_format);
        assert!(!prod.file_line_info);
        assert_eq!(LogConfig::default(), prod);
    }

    #[test]
    fn test_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("volcstack_middleware=debug,warn").is_ok());
        assert!(matches!(
            create_env_filter("  "),
            Err(TelemetryError::InvalidConfig(_))
        ));
        assert!(matches!(
            create_env_filter("volcstack=loudest"),
            Err(TelemetryError::LoggingInit(_))
        ));
    }

    #[test]
    fn test_disabled_logging_is_noop() {
        let config = LogConfig {
            enabled: false,
            level: String::new(),
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LogConfig =
            serde_json::from_str(r#"{"level": "debug", "json_format": false}"#).unwrap();
        assert_eq!(config.level, "debug");
        assert!(!config.json_format);
        assert!(config.enabled);
    }
}
