//! # Volcstack Telemetry
//!
//! Logging setup for applications using the Volcstack API client.
//!
//! The client crates only emit [`tracing`] events. Applications that want to
//! see them call [`init_logging`] once at startup:
//!
//! | Preset | Format | Level |
//! |--------|--------|-------|
//! | [`LogConfig::development`] | pretty, with call sites | `debug` |
//! | [`LogConfig::production`] | JSON lines | `info` |
//!
//! Events carry structured fields such as `command`, `attempt`, `delay_ms`,
//! `status` and `url`. Secrets are never logged.

#![doc(html_root_url = "https://docs.rs/volcstack-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
