//! Endpoint resolution stage.
//!
//! Fills in the request host from the service and region when the caller
//! has not set one. The mapping itself lives behind
//! [`EndpointResolver`]; the default implementation consults the built-in
//! service registry.

use std::sync::Arc;

use volcstack_config::{EndpointQuery, EndpointResolver};
use volcstack_core::{BoxFuture, RequestEnvelope, SdkResult};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next};

/// Stage that resolves the request host.
pub struct EndpointMiddleware {
    resolver: Arc<dyn EndpointResolver>,
}

impl EndpointMiddleware {
    /// Creates the stage over `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn EndpointResolver>) -> Self {
        Self { resolver }
    }
}

impl Middleware for EndpointMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        mut envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        let request = &mut envelope.request;
        if request.host.as_deref().map_or(true, str::is_empty) {
            let query = EndpointQuery {
                service: request.service_name.as_deref().unwrap_or_default(),
                region: request.region.as_deref().unwrap_or_default(),
                custom_bootstrap_regions: &ctx.config.custom_bootstrap_regions,
                use_dual_stack: ctx.config.use_dual_stack,
            };
            if let Some(host) = self.resolver.resolve(&query) {
                tracing::debug!(service = query.service, region = query.region, host = %host, "Resolved endpoint");
                request.host = Some(host);
            }
        }
        next.run(ctx, envelope)
    }
}

impl std::fmt::Debug for EndpointMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointMiddleware").finish_non_exhaustive()
    }
}
