//! Default headers stage.
//!
//! Sets `content-type` from the execution context, falling back to
//! `application/json; charset=utf-8` when the command declares none.

use volcstack_core::{BoxFuture, RequestEnvelope, SdkResult};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next};

/// Stage that stamps the negotiated content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHeadersMiddleware;

impl DefaultHeadersMiddleware {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for DefaultHeadersMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        mut envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        envelope
            .request
            .headers
            .insert("content-type", ctx.effective_content_type());
        next.run(ctx, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{envelope, run_stage};

    #[tokio::test]
    async fn test_json_default() {
        let result = run_stage(DefaultHeadersMiddleware::new(), &ExecutionContext::default(), envelope())
            .await
            .unwrap();
        assert_eq!(
            result.request.headers.get("content-type"),
            Some("application/json; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn test_declared_content_type() {
        let ctx = ExecutionContext::default().with_content_type("application/x-www-form-urlencoded");
        let result = run_stage(DefaultHeadersMiddleware::new(), &ctx, envelope())
            .await
            .unwrap();
        assert_eq!(
            result.request.headers.get("content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }
}
