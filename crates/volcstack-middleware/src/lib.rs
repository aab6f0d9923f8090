//! # Volcstack Middleware
//!
//! The request pipeline of the Volcstack API client.
//!
//! Every call runs through a [`MiddlewareStack`]: named stages grouped into
//! four fixed phases and ordered by priority inside each phase. The client
//! merges its default stack with the command's stack, resolves the result
//! into a [`ResolvedChain`] and runs the request envelope through it.
//!
//! ## Pipeline
//!
//! ```text
//! initialize       defaultHeaders(150) → credentials(100) → endpoint(50)
//! serialize        dotN(50)
//! build            signer(100)
//! finalizeRequest  retry(100) → httpRequest(50) → terminal
//! ```
//!
//! ## Key Features
//!
//! - **Onion model**: before-hooks run in phase-then-priority order, after-hooks in reverse
//! - **Stable ordering**: equal priorities keep insertion order
//! - **Non-destructive merge**: merging produces a new stack and keeps same-named entries
//! - **Replayable continuation**: [`Next`] is `Copy`, so the retry stage can re-run the rest of the chain
//!
//! ## Example
//!
//! ```
//! use volcstack_middleware::{AddOptions, ExecutionContext, FnMiddleware, MiddlewareStack, Phase};
//!
//! # async fn example() -> volcstack_core::SdkResult<()> {
//! let mut stack = MiddlewareStack::new();
//! stack.add(
//!     FnMiddleware::new(|ctx, mut envelope, next| {
//!         Box::pin(async move {
//!             envelope.request.headers.insert("x-trace", "on");
//!             next.run(ctx, envelope).await
//!         })
//!     }),
//!     AddOptions::new(Phase::Initialize).name("trace").priority(10),
//! );
//!
//! let chain = stack.resolve(
//!     |envelope| Box::pin(async move { Ok(envelope) }),
//!     ExecutionContext::default(),
//! );
//! let envelope = chain
//!     .call(volcstack_core::RequestEnvelope::new(
//!         serde_json::json!({}),
//!         volcstack_core::Request::new(),
//!     ))
//!     .await?;
//! assert_eq!(envelope.request.headers.get("x-trace"), Some("on"));
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/volcstack-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod retry;
pub mod stack;
pub mod stages;

#[cfg(test)]
mod test_support;

pub use context::{ExecutionContext, DEFAULT_CONTENT_TYPE};
pub use middleware::{FnMiddleware, Middleware, Next, TerminalHandler};
pub use retry::{AttemptOutcome, RetryPolicy, RetryState};
pub use stack::{AddOptions, MiddlewareStack, Phase, ResolvedChain, StackEntry};
