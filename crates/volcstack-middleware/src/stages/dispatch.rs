//! Dispatch stage.
//!
//! Turns the request descriptor into a [`DispatchRequest`], hands it to the
//! [`DispatchAdapter`] and classifies the outcome:
//!
//! | Outcome | Error |
//! |---|---|
//! | non-2xx status | `ApiException` `HTTP <status>: <reason>` |
//! | 2xx with `ResponseMetadata.Error` | `ApiException` `[<Code>] <Message> (RequestId: <id>)` |
//! | transient transport code, or a timeout / network message | `NetworkError` |
//! | TLS failure | `ApiException` with status 0 |
//! | cancellation | `Cancelled` |
//! | anything else | `Exception` |
//!
//! On success the response is stored in the envelope before the chain continues.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use volcstack_core::{
    value_to_string, Body, BoxFuture, DispatchAdapter, DispatchRequest, DispatchResponse,
    RequestEnvelope, SdkError, SdkResult, TransportError,
};
use volcstack_signer::canonical_query_string;

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next};
use crate::retry::RETRYABLE_NETWORK_CODES;

/// Timeout applied when neither the request nor the configuration sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport error codes reported for TLS failures.
pub const TLS_ERROR_CODES: [&str; 4] = [
    "UNABLE_TO_VERIFY_LEAF_SIGNATURE",
    "CERT_HAS_EXPIRED",
    "DEPTH_ZERO_SELF_SIGNED_CERT",
    "ERR_TLS_CERT_ALTNAME_INVALID",
];

/// Maps a transport failure onto the error taxonomy.
#[must_use]
pub fn classify_transport_error(err: TransportError) -> SdkError {
    if err.is_cancelled() {
        return SdkError::cancelled("Request cancelled");
    }

    if let Some(status) = err.status.filter(|s| !(200..=299).contains(s)) {
        let reason = err
            .status_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or("Error");
        return SdkError::api(format!("HTTP {status}: {reason}"), status, err.body);
    }

    let message = err.message.to_lowercase();
    let code = err.code.as_deref();

    if code.is_some_and(|c| RETRYABLE_NETWORK_CODES.contains(&c))
        || message.contains("timeout")
        || message.contains("network error")
    {
        let code = err.code.clone();
        return SdkError::network_with_source(format!("Network error: {}", err.message), code, err);
    }

    if code.is_some_and(|c| TLS_ERROR_CODES.contains(&c)) || message.contains("ssl") {
        return SdkError::api(format!("SSL Error: {}", err.message), 0, None);
    }

    let text = if err.message.is_empty() {
        "Unknown error".to_string()
    } else {
        err.message.clone()
    };
    SdkError::Exception {
        message: format!("HTTP request failed: {text}"),
        status: err.status,
        body: err.body.clone(),
        source: Some(Arc::new(err)),
    }
}

/// Checks a received response for HTTP and application-level failures.
pub fn check_response(response: &DispatchResponse) -> SdkResult<()> {
    if !response.is_success() {
        let reason = if response.status_text.is_empty() {
            "Error"
        } else {
            &response.status_text
        };
        return Err(SdkError::api(
            format!("HTTP {}: {reason}", response.status),
            response.status,
            Some(response.body.clone()),
        ));
    }

    let metadata = response.body.get("ResponseMetadata");
    if let Some(error) = metadata
        .and_then(|m| m.get("Error"))
        .filter(|e| !e.is_null())
    {
        let field = |value: Option<&Value>| value.map(value_to_string).unwrap_or_default();
        let message = format!(
            "[{}] {} (RequestId: {})",
            field(error.get("Code")),
            field(error.get("Message")),
            field(metadata.and_then(|m| m.get("RequestId"))),
        );
        return Err(SdkError::api(message, response.status, Some(response.body.clone())));
    }

    Ok(())
}

/// Builds the absolute URL for a request.
#[must_use]
pub fn request_url(request: &volcstack_core::Request) -> String {
    let pathname = request
        .pathname
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or("/");
    let mut url = format!(
        "{}://{}{}",
        request.protocol,
        request.host.as_deref().unwrap_or_default(),
        pathname
    )
    .trim()
    .to_string();

    let query = canonical_query_string(&request.params);
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url
}

/// Stage that performs the network call.
pub struct HttpRequestMiddleware {
    adapter: Arc<dyn DispatchAdapter>,
}

impl HttpRequestMiddleware {
    /// Creates the stage over `adapter`.
    #[must_use]
    pub fn new(adapter: Arc<dyn DispatchAdapter>) -> Self {
        Self { adapter }
    }

    async fn dispatch(&self, request: DispatchRequest) -> SdkResult<DispatchResponse> {
        let token = request.cancellation.clone();
        let call = self.adapter.request(request);
        let outcome = match token {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(TransportError::cancelled()),
                outcome = call => outcome,
            },
            None => call.await,
        };
        let response = outcome.map_err(classify_transport_error)?;
        check_response(&response)?;
        Ok(response)
    }
}

impl Middleware for HttpRequestMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        mut envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        Box::pin(async move {
            let request = &envelope.request;
            let url = request_url(request);
            let timeout = request
                .timeout
                .or_else(|| ctx.config.timeout())
                .unwrap_or(DEFAULT_TIMEOUT);
            let dispatch = DispatchRequest {
                url: url.clone(),
                method: request.method.clone(),
                headers: request.headers.clone(),
                body: request
                    .body
                    .as_ref()
                    .filter(|body| !body.is_empty())
                    .map(Body::to_bytes),
                timeout,
                cancellation: request.cancellation.clone(),
            };
            let method = dispatch.method.clone();

            let result = self.dispatch(dispatch).await;
            match &result {
                Ok(response) => {
                    tracing::debug!(%method, %url, status = response.status, "Request dispatched");
                }
                Err(err) => {
                    tracing::debug!(%method, %url, status = ?err.status(), kind = %err.kind(), "Request failed");
                }
            }

            envelope.response = Some(result?);
            next.run(ctx, envelope).await
        })
    }
}

impl std::fmt::Debug for HttpRequestMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequestMiddleware").finish_non_exhaustive()
    }
}
