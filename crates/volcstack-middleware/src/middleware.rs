//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements, and [`Next`], the continuation a stage calls to hand the
//! envelope to the rest of the chain.
//!
//! # Onion model
//!
//! A stage runs its "before" logic, awaits `next.run(..)`, then runs its
//! "after" logic on the result. Because each stage awaits the remainder of the
//! chain, after-hooks run in the reverse order of before-hooks.
//!
//! `Next` is `Copy`: a stage may invoke the remainder of the chain more than
//! once. The retry stage relies on this.
//!
//! # Example
//!
//! ```
//! use volcstack_core::{BoxFuture, RequestEnvelope, SdkResult};
//! use volcstack_middleware::{ExecutionContext, Middleware, Next};
//!
//! struct TagRequest;
//!
//! impl Middleware for TagRequest {
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a ExecutionContext,
//!         mut envelope: RequestEnvelope,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
//!         Box::pin(async move {
//!             envelope.request.headers.insert("x-command", ctx.command_name.clone());
//!             next.run(ctx, envelope).await
//!         })
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use volcstack_core::{BoxFuture, RequestEnvelope, SdkResult};

use crate::context::ExecutionContext;

/// A pipeline stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` to continue, or returns without calling it to short-circuit
/// - A stage SHOULD NOT swallow errors from downstream stages
/// - A stage MUST NOT mutate the [`ExecutionContext`]
pub trait Middleware: Send + Sync + 'static {
    /// Processes the envelope, usually by delegating to `next`.
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>>;
}

/// The handler invoked once every stage has delegated.
pub type TerminalHandler =
    dyn Fn(RequestEnvelope) -> BoxFuture<'static, SdkResult<RequestEnvelope>> + Send + Sync;

/// Continuation over the remaining stages of a resolved chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    terminal: &'a TerminalHandler,
}

impl<'a> Next<'a> {
    /// Creates a continuation that runs `stages` in order, then `terminal`.
    #[must_use]
    pub fn new(stages: &'a [Arc<dyn Middleware>], terminal: &'a TerminalHandler) -> Self {
        Self { stages, terminal }
    }

    /// Invokes the next stage, or the terminal handler when none remain.
    pub fn run(
        self,
        ctx: &'a ExecutionContext,
        envelope: RequestEnvelope,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(
                ctx,
                envelope,
                Next {
                    stages: rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(envelope),
        }
    }

    /// Returns the number of stages still ahead of the terminal handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.stages.len())
            .finish_non_exhaustive()
    }
}

/// A middleware built from a closure.
///
/// # Example
///
/// ```
/// use volcstack_middleware::FnMiddleware;
///
/// let stage = FnMiddleware::new(|ctx, envelope, next| {
///     Box::pin(async move {
///         tracing::debug!(command = %ctx.command_name, "before");
///         let result = next.run(ctx, envelope).await;
///         tracing::debug!(ok = result.is_ok(), "after");
///         result
///     })
/// });
/// # let _ = stage;
/// ```
pub struct FnMiddleware<F> {
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            RequestEnvelope,
            Next<'a>,
        ) -> BoxFuture<'a, SdkResult<RequestEnvelope>>
        + Send
        + Sync
        + 'static,
{
    /// Creates a middleware from `func`.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            RequestEnvelope,
            Next<'a>,
        ) -> BoxFuture<'a, SdkResult<RequestEnvelope>>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        (self.func)(ctx, envelope, next)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}
