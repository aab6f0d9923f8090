//! Retry stage.
//!
//! Wraps the remainder of the chain (normally the dispatch stage) in a
//! bounded retry loop driven by a [`RetryPolicy`] resolved from the call's
//! configuration. Each attempt runs on a fresh copy of the envelope.
//!
//! ## Behaviour
//!
//! 1. Run the remaining chain
//! 2. On success, return immediately
//! 3. On failure, stop if the attempt budget is spent or the error is not
//!    retryable, returning the error unchanged
//! 4. Otherwise sleep for the policy's delay on the injected [`Clock`] and loop
//!
//! A cancelled request token stops the loop: a pending backoff sleep is
//! abandoned and no further attempt is made.

use std::sync::Arc;
use std::time::Duration;

use volcstack_core::{BoxFuture, CancellationToken, Clock, RequestEnvelope, SdkError, SdkResult};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next};
use crate::retry::{RetryPolicy, RetryState};

/// Stage that retries the remainder of the chain.
pub struct RetryMiddleware {
    clock: Arc<dyn Clock>,
}

impl RetryMiddleware {
    /// Creates the stage; backoff sleeps go through `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    async fn backoff(&self, delay: Duration, token: Option<&CancellationToken>) -> SdkResult<()> {
        if delay.is_zero() {
            return Ok(());
        }
        let sleep = self.clock.sleep(delay);
        match token {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(cancelled_error()),
                () = sleep => Ok(()),
            },
            None => {
                sleep.await;
                Ok(())
            }
        }
    }
}

fn cancelled_error() -> SdkError {
    SdkError::cancelled("Request cancelled")
}

impl Middleware for RetryMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        Box::pin(async move {
            let policy = RetryPolicy::from_config(&ctx.config.retry);
            let token = envelope.request.cancellation.clone();
            let mut attempt = 1;

            loop {
                if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    return Err(cancelled_error());
                }

                let result = next.run(ctx, envelope.clone()).await;
                let state = RetryState::Attempting(attempt).transition(policy.classify(attempt, &result));

                match (state, result) {
                    (RetryState::Attempting(following), Err(err)) => {
                        let delay = policy.delay(attempt);
                        tracing::warn!(
                            command = %ctx.command_name,
                            attempt,
                            max_attempts = policy.max_attempts(),
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Retrying request"
                        );
                        self.backoff(delay, token.as_ref()).await?;
                        attempt = following;
                    }
                    (RetryState::Succeeded, result) => {
                        tracing::debug!(command = %ctx.command_name, attempt, "Request succeeded");
                        return result;
                    }
                    (state, result) => {
                        if let Err(err) = &result {
                            tracing::debug!(
                                command = %ctx.command_name,
                                attempt,
                                state = ?state,
                                error = %err,
                                "Giving up on request"
                            );
                        }
                        return result;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for RetryMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryMiddleware").finish_non_exhaustive()
    }
}
