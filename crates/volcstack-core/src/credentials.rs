//! Credentials and the expiring credential cache.
//!
//! [`CredentialCache`] stores credentials obtained from a
//! [`CredentialProvider`] (for example an STS role assumption) until they
//! expire. For any key there is at most one refresh in flight: the first
//! caller that finds the entry missing or stale starts the refresh and
//! publishes it; concurrent callers await the same result. The in-flight
//! marker is removed when the refresh settles, whether it succeeded or not.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::{FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{SdkError, SdkResult};
use crate::types::BoxFuture;

/// An access key pair with an optional session token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token issued alongside temporary credentials.
    pub session_token: Option<String>,
}

impl Credentials {
    /// Creates credentials without a session token.
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Sets the session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Returns true when both the access key id and the secret are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Credentials together with the instant they stop being usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringCredentials {
    /// The credentials.
    pub credentials: Credentials,
    /// Expiry instant; the entry is stale once `now >= expires_at`.
    pub expires_at: DateTime<Utc>,
}

/// Source of fresh credentials for the cache.
pub trait CredentialProvider: Send + Sync + 'static {
    /// Fetches a new set of credentials.
    fn fetch(&self) -> BoxFuture<'static, SdkResult<ExpiringCredentials>>;
}

type SharedRefresh = Shared<BoxFuture<'static, SdkResult<ExpiringCredentials>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, ExpiringCredentials>,
    in_flight: HashMap<String, SharedRefresh>,
}

/// Expiring credential cache with single-flight refresh per key.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use volcstack_core::{CredentialCache, CredentialProvider, SystemClock};
///
/// # async fn example(provider: Arc<dyn CredentialProvider>) -> volcstack_core::SdkResult<()> {
/// let cache = CredentialCache::new(Arc::new(SystemClock::new()));
/// let credentials = cache.get_or_refresh("ak-role", provider).await?;
/// # Ok(())
/// # }
/// ```
pub struct CredentialCache {
    state: Arc<Mutex<CacheState>>,
    clock: Arc<dyn Clock>,
}

impl CredentialCache {
    /// Creates an empty cache that judges expiry with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            clock,
        }
    }

    /// Returns fresh credentials for `key`, refreshing through `provider` when needed.
    ///
    /// Concurrent callers for the same key share a single refresh. A failed
    /// refresh is reported to every waiter and is not cached.
    pub async fn get_or_refresh(
        &self,
        key: &str,
        provider: Arc<dyn CredentialProvider>,
    ) -> SdkResult<Credentials> {
        let refresh = {
            let mut state = self.state.lock();

            if let Some(entry) = state.entries.get(key) {
                if entry.expires_at > self.clock.now() {
                    tracing::debug!(cache_key = %redact_key(key), "Credential cache hit");
                    return Ok(entry.credentials.clone());
                }
            }

            if let Some(pending) = state.in_flight.get(key) {
                tracing::debug!(cache_key = %redact_key(key), "Awaiting in-flight credential refresh");
                pending.clone()
            } else {
                tracing::debug!(cache_key = %redact_key(key), "Starting credential refresh");
                let refresh = self.spawn_refresh(key.to_string(), provider);
                state.in_flight.insert(key.to_string(), refresh.clone());
                refresh
            }
        };

        refresh.await.map(|entry| entry.credentials)
    }

    // The refresh runs as its own task so it settles (and clears the
    // in-flight marker) even if every waiter is dropped.
    fn spawn_refresh(&self, key: String, provider: Arc<dyn CredentialProvider>) -> SharedRefresh {
        let state = Arc::clone(&self.state);
        let fetch = provider.fetch();
        let task = tokio::spawn(async move {
            let result = fetch.await;
            let mut guard = state.lock();
            guard.in_flight.remove(&key);
            match &result {
                Ok(entry) => {
                    guard.entries.insert(key.clone(), entry.clone());
                    tracing::debug!(cache_key = %redact_key(&key), expires_at = %entry.expires_at, "Credential refresh completed");
                }
                Err(err) => {
                    tracing::warn!(cache_key = %redact_key(&key), error = %err, "Credential refresh failed");
                }
            }
            result
        });

        let joined: BoxFuture<'static, SdkResult<ExpiringCredentials>> = Box::pin(async move {
            task.await
                .map_err(|e| SdkError::credentials(format!("credential refresh task failed: {e}")))?
        });
        joined.shared()
    }

    /// Drops the cached entry for `key`.
    pub fn invalidate(&self, key: &str) {
        self.state.lock().entries.remove(key);
    }

    /// Returns the cached entry for `key`, fresh or stale.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<ExpiringCredentials> {
        self.state.lock().entries.get(key).cloned()
    }

    /// Returns the number of refreshes currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CredentialCache")
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

// Cache keys embed secrets; only the leading segment is logged.
fn redact_key(key: &str) -> &str {
    key.split('-').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        ttl: ChronoDuration,
        fail: bool,
        delay: Duration,
    }

    impl CountingProvider {
        fn new(ttl: ChronoDuration) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                ttl,
                fail: false,
                delay: Duration::from_millis(20),
            }
        }
    }

    impl CredentialProvider for CountingProvider {
        fn fetch(&self) -> BoxFuture<'static, SdkResult<ExpiringCredentials>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let ttl = self.ttl;
            let fail = self.fail;
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return Err(SdkError::credentials("sts unavailable"));
                }
                Ok(ExpiringCredentials {
                    credentials: Credentials::new(format!("AK{n}"), "SK").with_session_token("token"),
                    expires_at: Utc::now() + ttl,
                })
            })
        }
    }

    fn cache() -> CredentialCache {
        CredentialCache::new(Arc::new(SystemClock::new()))
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = Credentials::new("AKID", "supersecret").with_session_token("tok");
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("supersecret"));
        assert!(!debug.contains("tok\""));
    }

    #[test]
    fn test_credentials_complete() {
        assert!(Credentials::new("a", "b").is_complete());
        assert!(!Credentials::new("a", "").is_complete());
        assert!(!Credentials::default().is_complete());
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_from_cache() {
        let cache = cache();
        let provider = Arc::new(CountingProvider::new(ChronoDuration::hours(1)));
        let calls = Arc::clone(&provider.calls);

        let first = cache.get_or_refresh("k", provider.clone()).await.unwrap();
        let second = cache.get_or_refresh("k", provider).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refreshed() {
        let cache = cache();
        let provider = Arc::new(CountingProvider::new(ChronoDuration::seconds(-1)));
        let calls = Arc::clone(&provider.calls);

        let first = cache.get_or_refresh("k", provider.clone()).await.unwrap();
        let second = cache.get_or_refresh("k", provider).await.unwrap();

        assert_eq!(first.access_key_id, "AK1");
        assert_eq!(second.access_key_id, "AK2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let cache = Arc::new(cache());
        let provider = Arc::new(CountingProvider::new(ChronoDuration::hours(1)));
        let calls = Arc::clone(&provider.calls);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let provider: Arc<dyn CredentialProvider> = provider.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_refresh("shared", provider).await
            }));
        }

        for handle in handles {
            let creds = handle.await.unwrap().unwrap();
            assert_eq!(creds.access_key_id, "AK1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_refresh_independently() {
        let cache = cache();
        let provider = Arc::new(CountingProvider::new(ChronoDuration::hours(1)));
        let calls = Arc::clone(&provider.calls);

        let (a, b) = tokio::join!(
            cache.get_or_refresh("a", provider.clone()),
            cache.get_or_refresh("b", provider.clone())
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_in_flight_and_is_not_cached() {
        let cache = cache();
        let mut failing = CountingProvider::new(ChronoDuration::hours(1));
        failing.fail = true;
        let failing = Arc::new(failing);
        let calls = Arc::clone(&failing.calls);

        let (a, b) = tokio::join!(
            cache.get_or_refresh("k", failing.clone()),
            cache.get_or_refresh("k", failing.clone())
        );
        assert_eq!(a.unwrap_err().to_string(), "credentials error: sts unavailable");
        assert_eq!(b.unwrap_err().to_string(), "credentials error: sts unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
        assert!(cache.is_empty());

        // The next caller starts a new refresh.
        let _ = cache.get_or_refresh("k", failing).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let cache = cache();
        let provider = Arc::new(CountingProvider::new(ChronoDuration::hours(1)));
        let calls = Arc::clone(&provider.calls);

        cache.get_or_refresh("k", provider.clone()).await.unwrap();
        cache.invalidate("k");
        assert!(cache.entry("k").is_none());
        cache.get_or_refresh("k", provider).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_redact_key() {
        assert_eq!(redact_key("AKID-secret-123-role"), "AKID");
    }
}
