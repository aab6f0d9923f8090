//! Error types for the Volcstack client.
//!
//! This module provides [`SdkError`], the single error type surfaced by the
//! request pipeline, and [`ErrorKind`], its coarse classification.
//!
//! | `ErrorKind` | Raised for |
//! |---|---|
//! | `NetworkError` | connection resets, timeouts, refused connections, DNS failures |
//! | `ApiException` | non-2xx responses, 2xx responses carrying an error envelope, TLS failures |
//! | `SigningError` | a signable header without a value |
//! | `Cancelled` | the caller's cancellation token fired |
//! | `Exception` | everything else |
//!
//! `SdkError` is `Clone` so that the last error of a retry loop, or the result
//! of a shared credential refresh, reaches every caller unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias using [`SdkError`].
pub type SdkResult<T> = Result<T, SdkError>;

/// A shareable underlying cause.
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Transport-level failure.
    NetworkError,
    /// The remote API rejected the call.
    ApiException,
    /// The request could not be signed.
    SigningError,
    /// The call was cancelled by the caller.
    Cancelled,
    /// Unclassified failure.
    Exception,
}

impl ErrorKind {
    /// Returns the kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "NetworkError",
            Self::ApiException => "ApiException",
            Self::SigningError => "SigningError",
            Self::Cancelled => "Cancelled",
            Self::Exception => "Exception",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for the Volcstack client.
///
/// # Example
///
/// ```
/// use volcstack_core::{ErrorKind, SdkError};
///
/// let err = SdkError::api("HTTP 503: Service Unavailable", 503, None);
/// assert_eq!(err.kind(), ErrorKind::ApiException);
/// assert_eq!(err.status(), Some(503));
/// assert!(err.is_retryable_status());
/// ```
#[derive(Error, Debug, Clone)]
pub enum SdkError {
    /// Transport-level failure.
    #[error("{message}")]
    Network {
        /// Human-readable error message.
        message: String,
        /// Transport error code such as `ECONNRESET`.
        code: Option<String>,
        /// The underlying transport error.
        #[source]
        source: Option<SharedSource>,
    },

    /// The remote API returned an error.
    #[error("{message}")]
    Api {
        /// Human-readable error message.
        message: String,
        /// HTTP status code (0 for TLS failures).
        status: u16,
        /// Response body, if any.
        body: Option<Value>,
    },

    /// The request could not be signed.
    #[error("{message}")]
    Signing {
        /// Human-readable error message.
        message: String,
    },

    /// The call was cancelled.
    #[error("{message}")]
    Cancelled {
        /// Human-readable error message.
        message: String,
    },

    /// Unclassified failure.
    #[error("{message}")]
    Exception {
        /// Human-readable error message.
        message: String,
        /// HTTP status code, if one was observed.
        status: Option<u16>,
        /// Response body, if any.
        body: Option<Value>,
        /// The underlying error.
        #[source]
        source: Option<SharedSource>,
    },

    /// Credentials could not be obtained.
    #[error("credentials error: {message}")]
    Credentials {
        /// Human-readable error message.
        message: String,
    },

    /// The client configuration is invalid.
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },
}

impl SdkError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Network {
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Creates a network error with an underlying cause.
    #[must_use]
    pub fn network_with_source(
        message: impl Into<String>,
        code: Option<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            code,
            source: Some(Arc::new(source)),
        }
    }

    /// Creates an API error.
    #[must_use]
    pub fn api(message: impl Into<String>, status: u16, body: Option<Value>) -> Self {
        Self::Api {
            message: message.into(),
            status,
            body,
        }
    }

    /// Creates a signing error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Creates an unclassified error.
    #[must_use]
    pub fn exception(message: impl Into<String>) -> Self {
        Self::Exception {
            message: message.into(),
            status: None,
            body: None,
            source: None,
        }
    }

    /// Creates an unclassified error with an underlying cause.
    #[must_use]
    pub fn exception_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Exception {
            message: message.into(),
            status: None,
            body: None,
            source: Some(Arc::new(source)),
        }
    }

    /// Creates a credentials error.
    #[must_use]
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::NetworkError,
            Self::Api { .. } => ErrorKind::ApiException,
            Self::Signing { .. } => ErrorKind::SigningError,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Exception { .. } | Self::Credentials { .. } | Self::Config { .. } => {
                ErrorKind::Exception
            }
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Exception { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns the transport error code carried by this error, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Network { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns the response body carried by this error, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Api { body, .. } | Self::Exception { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Returns the error message without any prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Network { message, .. }
            | Self::Api { message, .. }
            | Self::Signing { message }
            | Self::Cancelled { message }
            | Self::Exception { message, .. }
            | Self::Credentials { message }
            | Self::Config { message } => message,
        }
    }

    /// Returns true if the carried status is one the default retry policy retries.
    #[must_use]
    pub fn is_retryable_status(&self) -> bool {
        matches!(self.status(), Some(429 | 500 | 502 | 503 | 504))
    }

    /// Returns true if this error reports a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
