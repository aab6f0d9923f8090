//! Canned responses, errors and credentials.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use serde_json::{json, Value};
use volcstack_core::{
    BoxFuture, Clock, CredentialProvider, Credentials, DispatchResponse, ExpiringCredentials,
    SdkResult, TransportError,
};

/// Access key of [`test_credentials`].
pub const TEST_ACCESS_KEY_ID: &str = "AKLTtestaccesskey";

/// Secret key of [`test_credentials`].
pub const TEST_SECRET_ACCESS_KEY: &str = "testsecretkey==";

/// A complete static key pair.
#[must_use]
pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY)
}

/// `200 OK` with `body`.
#[must_use]
pub fn json_ok(body: Value) -> DispatchResponse {
    DispatchResponse::new(200, body)
}

/// A response with `status` and an empty object body.
#[must_use]
pub fn status(status: u16) -> DispatchResponse {
    DispatchResponse::new(status, json!({}))
}

/// `200 OK` carrying an error in `ResponseMetadata`.
#[must_use]
pub fn api_error(code: &str, message: &str, request_id: &str) -> DispatchResponse {
    DispatchResponse::new(
        200,
        json!({
            "ResponseMetadata": {
                "RequestId": request_id,
                "Error": {"Code": code, "Message": message},
            }
        }),
    )
}

/// A transport failure carrying a socket error code such as `ECONNRESET`.
#[must_use]
pub fn network_error(code: &str) -> TransportError {
    TransportError::with_code(format!("connect {code}"), code)
}

/// Provider that hands out the same credentials and counts fetches.
///
/// Each fetch yields credentials that expire `ttl` after the clock's current
/// time.
pub struct StaticProvider {
    credentials: Credentials,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    calls: AtomicUsize,
}

impl StaticProvider {
    /// Creates a provider for `credentials`.
    #[must_use]
    pub fn new(credentials: Credentials, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials,
            ttl,
            clock,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for StaticProvider {
    fn fetch(&self) -> BoxFuture<'static, SdkResult<ExpiringCredentials>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::zero());
        let expiring = ExpiringCredentials {
            credentials: self.credentials.clone(),
            expires_at: self.clock.now() + ttl,
        };
        Box::pin(async move { Ok(expiring) })
    }
}

impl std::fmt::Debug for StaticProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticProvider")
            .field("credentials", &self.credentials)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}
