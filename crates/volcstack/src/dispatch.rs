//! Default network transport over `reqwest`.

use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use volcstack_config::{HttpOptions, ProxyConfig};
use volcstack_core::{
    BoxFuture, DispatchAdapter, DispatchRequest, DispatchResponse, Headers, SdkError, SdkResult,
    TransportError,
};

/// Dispatch adapter backed by a pooled [`reqwest::Client`].
///
/// Transport failures are reported with socket-style codes so the retry
/// policy can recognise them:
///
/// | Failure | Code |
/// |---|---|
/// | timeout | `ETIMEDOUT` |
/// | connection refused or unreachable | `ECONNREFUSED` |
/// | request or body I/O failure | `ECONNRESET` |
/// | invalid request, redirect or decode failure | none |
///
/// Non-2xx responses are reported as HTTP transport errors carrying the
/// status and decoded body.
#[derive(Debug, Clone)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    /// Builds a dispatcher from the client's HTTP options.
    ///
    /// `proxy` is the already resolved proxy, explicit or from the environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the proxy URL is invalid or the TLS
    /// backend cannot be initialised.
    pub fn new(http: &HttpOptions, proxy: Option<ProxyConfig>) -> SdkResult<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = http.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy.url())
                .map_err(|e| SdkError::config(format!("Invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        if http.ignore_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(pool) = &http.pool {
            if pool.keep_alive == Some(false) {
                builder = builder.pool_max_idle_per_host(0);
            } else if let Some(max_idle) = pool.max_idle_per_host {
                builder = builder.pool_max_idle_per_host(max_idle);
            }
            if let Some(interval) = pool.keep_alive_ms {
                builder = builder.tcp_keepalive(Duration::from_millis(interval));
            }
            if let Some(idle) = pool.idle_timeout_ms {
                builder = builder.pool_idle_timeout(Duration::from_millis(idle));
            }
        }

        let client = builder
            .build()
            .map_err(|e| SdkError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: DispatchRequest) -> Result<DispatchResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(request.timeout);
        for (name, value) in request.headers.iter_present() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, request.timeout))?;

        let status = response.status();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e, request.timeout))?;
        let body = decode_body(&bytes);

        if !status.is_success() {
            return Err(TransportError::http(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                Some(body),
            ));
        }

        let mut decoded = DispatchResponse::new(status.as_u16(), body);
        decoded.headers = headers;
        Ok(decoded)
    }
}

impl DispatchAdapter for ReqwestDispatcher {
    fn request(
        &self,
        request: DispatchRequest,
    ) -> BoxFuture<'_, Result<DispatchResponse, TransportError>> {
        Box::pin(self.execute(request))
    }
}

/// Parses a body as JSON, falling back to a JSON string of the raw text.
fn decode_body(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn map_reqwest_error(err: &reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::with_code(
            format!("timeout of {}ms exceeded", timeout.as_millis()),
            "ETIMEDOUT",
        )
    } else if err.is_connect() {
        TransportError::with_code(err.to_string(), "ECONNREFUSED")
    } else if err.is_builder() || err.is_redirect() || err.is_decode() {
        TransportError::new(err.to_string())
    } else if err.is_request() || err.is_body() {
        TransportError::with_code(err.to_string(), "ECONNRESET")
    } else {
        TransportError::new(err.to_string())
    }
}
