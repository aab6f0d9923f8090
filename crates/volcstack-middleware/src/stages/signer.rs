//! Signing stage.
//!
//! Signs the request with the credentials the credentials stage placed in the
//! envelope. Requests without a complete key pair pass through unsigned.
//!
//! Form-encoded requests with an object body are serialized to their
//! `application/x-www-form-urlencoded` text first, so the payload hash covers
//! the bytes that go on the wire.

use std::sync::Arc;

use serde_json::{Map, Value};
use volcstack_config::DEFAULT_REGION;
use volcstack_core::{
    value_to_string, Body, BoxFuture, Clock, RequestEnvelope, SdkError, SdkResult,
};
use volcstack_signer::{sign_request, SigningParams};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next};
use crate::stages::FORM_CONTENT_TYPE;

/// Encodes an object as `application/x-www-form-urlencoded`, skipping nulls.
#[must_use]
pub fn form_encode(fields: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        serializer.append_pair(key, &value_to_string(value));
    }
    serializer.finish()
}

/// Stage that stamps authentication headers.
pub struct SignerMiddleware {
    clock: Arc<dyn Clock>,
}

impl SignerMiddleware {
    /// Creates the stage; signing timestamps come from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Middleware for SignerMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        mut envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        let credentials = match envelope.credentials.as_ref() {
            Some(credentials) if credentials.is_complete() => credentials,
            _ => return next.run(ctx, envelope),
        };
        let request = &mut envelope.request;

        let is_form = request
            .headers
            .get_ignore_case("content-type")
            .is_some_and(|ct| ct.eq_ignore_ascii_case(FORM_CONTENT_TYPE));
        if is_form {
            if let Some(Body::Json(Value::Object(fields))) = &request.body {
                request.body = Some(Body::Text(form_encode(fields)));
            }
        }

        let region = request
            .region
            .as_deref()
            .or(ctx.config.region.as_deref())
            .unwrap_or(DEFAULT_REGION);
        let signed = sign_request(&SigningParams {
            method: request.method.as_str(),
            uri: request.pathname.as_deref(),
            query: &request.params,
            headers: &request.headers,
            body: request.body.as_ref(),
            region,
            service_name: request.service_name.as_deref().unwrap_or_default(),
            credentials,
            host: request.host.as_deref().unwrap_or_default(),
            timestamp: self.clock.now(),
        });

        match signed {
            Ok(result) => {
                tracing::debug!(
                    service = request.service_name.as_deref().unwrap_or_default(),
                    region,
                    "Signed request"
                );
                request.headers = result.headers;
                next.run(ctx, envelope)
            }
            Err(err) => Box::pin(async move { Err(SdkError::from(err)) }),
        }
    }
}

impl std::fmt::Debug for SignerMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerMiddleware").finish_non_exhaustive()
    }
}
