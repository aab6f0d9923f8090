//! # Volcstack Core
//!
//! Core types and traits shared by every layer of the Volcstack API client.
//!
//! This crate provides the foundational pieces that the signing engine, the
//! middleware stack and the client facade are built on:
//!
//! - [`SdkError`] - The error taxonomy surfaced to callers
//! - [`Request`] / [`RequestEnvelope`] - The request descriptor threaded through the pipeline
//! - [`Headers`] / [`Body`] - Header map and payload representations
//! - [`Clock`] - Time abstraction used for signing timestamps and backoff sleeps
//! - [`DispatchAdapter`] - The contract of the network transport
//! - [`CredentialCache`] - Expiring credential cache with single-flight refresh
//!
//! ## Request flow
//!
//! ```text
//! Client::send ─► RequestEnvelope ─► middleware stages ─► DispatchAdapter
//!                                                             │
//!     result ◄──────────── envelope.response ◄───────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use volcstack_core::{Headers, Request, RequestEnvelope};
//!
//! let mut request = Request::new();
//! request.headers.insert("x-custom", "value");
//!
//! let envelope = RequestEnvelope::new(serde_json::json!({"InstanceId": "i-1"}), request);
//! assert!(envelope.response.is_none());
//! ```

#![doc(html_root_url = "https://docs.rs/volcstack-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod credentials;
mod error;
mod headers;
mod request;
mod transport;
mod types;

pub use clock::{Clock, SystemClock, TimerCallback, TimerId};
pub use credentials::{CredentialCache, CredentialProvider, Credentials, ExpiringCredentials};
pub use error::{ErrorKind, SdkError, SdkResult, SharedSource};
pub use headers::Headers;
pub use request::{value_to_string, Body, Protocol, Request, RequestEnvelope};
pub use transport::{
    DispatchAdapter, DispatchRequest, DispatchResponse, TransportError, CANCELLED_CODE,
};
pub use types::{BoxFuture, Params};

/// Re-export of the cancellation token used across the pipeline.
pub use tokio_util::sync::CancellationToken;

// Key types cross task boundaries inside the pipeline.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<SdkError>;
    let _ = assert_send_sync::<RequestEnvelope>;
    let _ = assert_send_sync::<CredentialCache>;
};
