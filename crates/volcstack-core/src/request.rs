//! The request descriptor and the envelope threaded through the pipeline.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::credentials::Credentials;
use crate::headers::Headers;
use crate::transport::DispatchResponse;
use crate::types::Params;

/// URL scheme used to reach the API host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    #[default]
    Https,
}

impl Protocol {
    /// Returns the scheme string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Parses a scheme string, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A JSON document, serialized on the wire.
    Json(Value),
    /// A pre-encoded text payload (for example a form-urlencoded string).
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
}

impl Body {
    /// Returns the wire representation of this body.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Text(text) => Bytes::from(text.clone()),
            Self::Bytes(bytes) => bytes.clone(),
        }
    }

    /// Returns true if the body carries no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Json(value) => value.is_null(),
            Self::Text(text) => text.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
        }
    }

    /// Returns the JSON document, if this is a JSON body.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Renders a JSON scalar the way it appears in a query string or form field.
///
/// Strings are used verbatim; every other value uses its JSON text.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Descriptor of an outbound API call.
///
/// Stages fill this in as the envelope moves through the pipeline: the
/// endpoint stage sets `host`, the flattening stage rewrites `params`, the
/// signer adds authentication headers.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request path; `/` when absent.
    pub pathname: Option<String>,
    /// Request headers.
    pub headers: Headers,
    /// Query parameters.
    pub params: Params,
    /// Request payload.
    pub body: Option<Body>,
    /// Target host.
    pub host: Option<String>,
    /// URL scheme.
    pub protocol: Protocol,
    /// Signing region.
    pub region: Option<String>,
    /// Signing service name.
    pub service_name: Option<String>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Cancellation token observed by dispatch and backoff sleeps.
    pub cancellation: Option<CancellationToken>,
}

impl Request {
    /// Creates an empty `GET` request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the request's cancellation token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// The mutable value threaded through the middleware chain.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// The caller's input payload.
    pub input: Value,
    /// The request being built.
    pub request: Request,
    /// Credentials resolved for this call.
    pub credentials: Option<Credentials>,
    /// The raw response, once dispatched.
    pub response: Option<DispatchResponse>,
}

impl RequestEnvelope {
    /// Creates an envelope for a new call.
    #[must_use]
    pub fn new(input: Value, request: Request) -> Self {
        Self {
            input,
            request,
            credentials: None,
            response: None,
        }
    }
}
