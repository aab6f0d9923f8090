//! Main configuration types.
//!
//! This module provides the top-level [`ClientConfig`] struct and its builder.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use volcstack_core::Protocol;

use crate::{AssumeRoleParams, ConfigError, HttpOptions, ProxyConfig, RetryConfig, RetryStrategy};

/// Region used when neither the call nor the configuration names one.
pub const DEFAULT_REGION: &str = "cn-beijing";

/// Complete client configuration.
///
/// Every recognized option is a field; unknown keys are rejected when
/// deserializing. Use [`ConfigLoader`](crate::ConfigLoader) to load it from
/// files and environment variables, or [`ClientConfig::builder`] in code.
///
/// # Example
///
/// ```
/// use volcstack_config::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert_eq!(config.region(), "cn-beijing");
/// assert_eq!(config.retry.max_attempts(), 4);
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Fixed API host; skips endpoint resolution when set.
    #[serde(default)]
    pub host: Option<String>,

    /// Default signing region.
    #[serde(default)]
    pub region: Option<String>,

    /// URL scheme.
    #[serde(default)]
    pub protocol: Protocol,

    /// Access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Session token of temporary credentials.
    #[serde(default)]
    pub session_token: Option<String>,

    /// Retry behaviour.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Obtain credentials by assuming a role.
    #[serde(default)]
    pub assume_role: Option<AssumeRoleParams>,

    /// Use dual-stack endpoints; falls back to the environment when unset.
    #[serde(default)]
    pub use_dual_stack: Option<bool>,

    /// Regions that resolve to service-specific endpoints in addition to the built-in list.
    #[serde(default)]
    pub custom_bootstrap_regions: Vec<String>,

    /// HTTP transport options.
    #[serde(default)]
    pub http: HttpOptions,
}

impl ClientConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use volcstack_config::ClientConfig;
    ///
    /// let config = ClientConfig::builder()
    ///     .region("cn-shanghai")
    ///     .credentials("AK", "SK")
    ///     .max_retries(1)
    ///     .build();
    ///
    /// assert_eq!(config.region(), "cn-shanghai");
    /// assert_eq!(config.retry.max_attempts(), 2);
    /// ```
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the configured region or [`DEFAULT_REGION`].
    #[must_use]
    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Returns the client-level request timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.http.timeout()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `retry.max_retry_delay_ms` is below `retry.min_retry_delay_ms`
    /// - `region` is set but empty
    /// - the proxy host is empty
    /// - an assume-role parameter is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_retry_delay_ms < self.retry.min_retry_delay_ms {
            return Err(ConfigError::invalid_value(
                "retry.max_retry_delay_ms",
                format!(
                    "must be at least retry.min_retry_delay_ms ({})",
                    self.retry.min_retry_delay_ms
                ),
            ));
        }

        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(ConfigError::invalid_value("region", "must not be empty"));
        }

        if let Some(proxy) = &self.http.proxy {
            if proxy.host.trim().is_empty() {
                return Err(ConfigError::invalid_value("http.proxy.host", "must not be empty"));
            }
        }

        if let Some(role) = &self.assume_role {
            let required = [
                ("assume_role.access_key_id", &role.access_key_id),
                ("assume_role.secret_access_key", &role.secret_access_key),
                ("assume_role.account_id", &role.account_id),
                ("assume_role.role_name", &role.role_name),
            ];
            for (field, value) in required {
                if value.is_empty() {
                    return Err(ConfigError::invalid_value(field, "must not be empty"));
                }
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("region", &self.region)
            .field("protocol", &self.protocol)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "[REDACTED]"))
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .field("retry", &self.retry)
            .field("assume_role", &self.assume_role)
            .field("use_dual_stack", &self.use_dual_stack)
            .field("custom_bootstrap_regions", &self.custom_bootstrap_regions)
            .field("http", &self.http)
            .finish()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fixed API host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Set the default region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Set the URL scheme.
    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = protocol;
        self
    }

    /// Set the access key pair.
    #[must_use]
    pub fn credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.config.access_key_id = Some(access_key_id.into());
        self.config.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Set the session token.
    #[must_use]
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.config.session_token = Some(token.into());
        self
    }

    /// Replace the retry section.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Enable or disable retries.
    #[must_use]
    pub fn auto_retry(mut self, enabled: bool) -> Self {
        self.config.retry.auto_retry = enabled;
        self
    }

    /// Set the number of retries after the first attempt.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Attach caller-supplied retry hooks.
    #[must_use]
    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.config.retry.custom_strategy = Some(strategy);
        self
    }

    /// Obtain credentials by assuming a role.
    #[must_use]
    pub fn assume_role(mut self, params: AssumeRoleParams) -> Self {
        self.config.assume_role = Some(params);
        self
    }

    /// Force dual-stack endpoints on or off.
    #[must_use]
    pub fn use_dual_stack(mut self, enabled: bool) -> Self {
        self.config.use_dual_stack = Some(enabled);
        self
    }

    /// Add a bootstrap region.
    #[must_use]
    pub fn bootstrap_region(mut self, region: impl Into<String>) -> Self {
        self.config.custom_bootstrap_regions.push(region.into());
        self
    }

    /// Replace the HTTP options.
    #[must_use]
    pub fn http(mut self, http: HttpOptions) -> Self {
        self.config.http = http;
        self
    }

    /// Set the client-level request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set an explicit proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.http.proxy = Some(proxy);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrategyName;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.host.is_none());
        assert_eq!(config.region(), DEFAULT_REGION);
        assert_eq!(config.protocol, Protocol::Https);
        assert!(config.retry.auto_retry);
        assert_eq!(config.retry.strategy, StrategyName::ExponentialWithJitter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .host("iam.volcengineapi.com")
            .protocol(Protocol::Http)
            .credentials("AK", "SK")
            .session_token("token")
            .auto_retry(false)
            .use_dual_stack(true)
            .bootstrap_region("cn-guilin-boe")
            .timeout(Duration::from_secs(5))
            .proxy(ProxyConfig::new(Protocol::Http, "proxy", 3128))
            .build();

        assert_eq!(config.host.as_deref(), Some("iam.volcengineapi.com"));
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.access_key_id.as_deref(), Some("AK"));
        assert_eq!(config.session_token.as_deref(), Some("token"));
        assert_eq!(config.retry.max_attempts(), 1);
        assert_eq!(config.use_dual_stack, Some(true));
        assert_eq!(config.custom_bootstrap_regions, vec!["cn-guilin-boe"]);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.http.proxy.unwrap().port, 3128);
    }

    #[test]
    fn test_validate_retry_delays() {
        let mut config = ClientConfig::default();
        config.retry.min_retry_delay_ms = 1000;
        config.retry.max_retry_delay_ms = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.max_retry_delay_ms"));
    }

    #[test]
    fn test_validate_empty_region() {
        let config = ClientConfig::builder().region("  ").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_proxy_host() {
        let config = ClientConfig::builder()
            .proxy(ProxyConfig::new(Protocol::Http, "", 80))
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_assume_role() {
        let config = ClientConfig::builder()
            .assume_role(AssumeRoleParams::new("AK", "SK", "", "role"))
            .build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("assume_role.account_id"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::builder()
            .credentials("AKID", "super-secret")
            .session_token("session-secret")
            .build();
        let debug = format!("{config:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("session-secret"));
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result: Result<ClientConfig, _> = toml::from_str("regoin = \"cn-beijing\"");
        assert!(result.is_err());
    }
}
