//! The dispatch adapter contract.
//!
//! A [`DispatchAdapter`] performs the network call for a fully resolved
//! request. It reports transport failures as [`TransportError`]; the dispatch
//! stage of the pipeline turns those into [`SdkError`](crate::SdkError)s.

use std::time::Duration;

use bytes::Bytes;
use http::Method;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::headers::Headers;
use crate::types::BoxFuture;

/// Error code reported by adapters when the cancellation token fired.
pub const CANCELLED_CODE: &str = "ERR_CANCELED";

/// A fully resolved request handed to the adapter.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Absolute URL including the query string.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Headers to send; entries without a value are skipped.
    pub headers: Headers,
    /// Encoded payload.
    pub body: Option<Bytes>,
    /// Time budget for the whole exchange.
    pub timeout: Duration,
    /// Token that aborts the call when cancelled.
    pub cancellation: Option<CancellationToken>,
}

/// A normalized response.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: Headers,
    /// Decoded body: parsed JSON when possible, otherwise a JSON string.
    pub body: Value,
}

impl DispatchResponse {
    /// Creates a response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            headers: Headers::new(),
            body,
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status <= 299
    }
}

/// A transport-level failure reported by an adapter.
#[derive(Debug, Clone, Error, Default)]
#[error("{message}")]
pub struct TransportError {
    /// Human-readable message.
    pub message: String,
    /// Error code such as `ECONNRESET`.
    pub code: Option<String>,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// HTTP reason phrase, when a response was received.
    pub status_text: Option<String>,
    /// Response body, when a response was received.
    pub body: Option<Value>,
}

impl TransportError {
    /// Creates an error with a message only.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Creates an error carrying a transport error code.
    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Creates an error describing an HTTP response.
    #[must_use]
    pub fn http(status: u16, status_text: impl Into<String>, body: Option<Value>) -> Self {
        let status_text = status_text.into();
        Self {
            message: format!("Request failed with status code {status}"),
            code: None,
            status: Some(status),
            status_text: Some(status_text),
            body,
        }
    }

    /// Creates the error adapters report when the cancellation token fired.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::with_code("canceled", CANCELLED_CODE)
    }

    /// Returns true if this error reports a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.code.as_deref() == Some(CANCELLED_CODE)
    }
}

/// Performs the network call for a resolved request.
///
/// Implementations must honour the request's cancellation token and timeout.
pub trait DispatchAdapter: Send + Sync + 'static {
    /// Sends the request and returns the normalized response.
    fn request(&self, request: DispatchRequest) -> BoxFuture<'_, Result<DispatchResponse, TransportError>>;

    /// Releases any resources held by the adapter.
    fn destroy(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_status_text() {
        let response = DispatchResponse::new(503, json!({}));
        assert_eq!(response.status_text, "Service Unavailable");
        assert!(!response.is_success());
        assert!(DispatchResponse::new(204, Value::Null).is_success());
    }

    #[test]
    fn test_transport_error_constructors() {
        let err = TransportError::with_code("connect ECONNREFUSED", "ECONNREFUSED");
        assert_eq!(err.code.as_deref(), Some("ECONNREFUSED"));
        assert_eq!(err.to_string(), "connect ECONNREFUSED");

        let err = TransportError::http(404, "Not Found", Some(json!({"a": 1})));
        assert_eq!(err.status, Some(404));
        assert_eq!(err.status_text.as_deref(), Some("Not Found"));

        assert!(TransportError::cancelled().is_cancelled());
        assert!(!TransportError::new("x").is_cancelled());
    }
}
