//! Helpers shared by the unit tests of this crate.

use std::sync::Arc;

use serde_json::json;
use volcstack_core::{BoxFuture, Request, RequestEnvelope, SdkResult};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next, TerminalHandler};

/// Terminal handler returning the envelope unchanged.
pub(crate) fn echo(envelope: RequestEnvelope) -> BoxFuture<'static, SdkResult<RequestEnvelope>> {
    Box::pin(async move { Ok(envelope) })
}

/// An envelope around an empty request.
pub(crate) fn envelope() -> RequestEnvelope {
    RequestEnvelope::new(json!({}), Request::new())
}

/// Runs a single stage in front of [`echo`].
pub(crate) async fn run_stage(
    stage: impl Middleware,
    ctx: &ExecutionContext,
    envelope: RequestEnvelope,
) -> SdkResult<RequestEnvelope> {
    let stages: Vec<Arc<dyn Middleware>> = vec![Arc::new(stage)];
    let terminal: Box<TerminalHandler> = Box::new(echo);
    Next::new(&stages, &*terminal).run(ctx, envelope).await
}
