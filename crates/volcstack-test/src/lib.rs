//! # Volcstack Test
//!
//! Test utilities for the Volcstack API client. They let the whole request
//! pipeline run without real network connections or real time.
//!
//! ## Key Features
//!
//! - **Virtual time**: [`MockClock`] moves only when told to, so backoff sleeps finish instantly
//! - **Scripted transport**: [`MockDispatcher`] replays queued or URL-keyed replies
//! - **Call recording**: every dispatched request is kept for later assertions
//! - **Fixtures**: ready-made responses, API error envelopes and credentials
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use volcstack_core::{DispatchAdapter, DispatchRequest, DispatchResponse, Headers};
//! use volcstack_test::{fixtures, MockDispatcher};
//!
//! # async fn example() {
//! let dispatcher = MockDispatcher::new();
//! dispatcher.push_response(fixtures::status(503));
//! dispatcher.push_response(fixtures::json_ok(serde_json::json!({"Result": {}})));
//!
//! let request = DispatchRequest {
//!     url: "https://open.volcengineapi.com/".into(),
//!     method: http::Method::GET,
//!     headers: Headers::new(),
//!     body: None,
//!     timeout: std::time::Duration::from_secs(1),
//!     cancellation: None,
//! };
//! let first = dispatcher.request(request.clone()).await.unwrap();
//! assert_eq!(first.status, 503);
//! assert_eq!(dispatcher.call_count(), 1);
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/volcstack-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod dispatcher;
pub mod fixtures;

pub use clock::{MockClock, DEFAULT_START_SECS};
pub use dispatcher::{MockDispatcher, MockReply, FALLBACK_MESSAGE};
