//! Configuration schema types.
//!
//! This module defines the nested sections of [`ClientConfig`](crate::ClientConfig).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use volcstack_core::Protocol;

/// Forward proxy used by the HTTP transport.
///
/// # Example
///
/// ```
/// use volcstack_config::ProxyConfig;
/// use volcstack_core::Protocol;
///
/// let proxy = ProxyConfig::new(Protocol::Http, "127.0.0.1", 3128);
/// assert_eq!(proxy.url(), "http://127.0.0.1:3128");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Proxy scheme.
    #[serde(default = "default_proxy_protocol")]
    pub protocol: Protocol,

    /// Proxy host.
    pub host: String,

    /// Proxy port.
    pub port: u16,
}

impl ProxyConfig {
    /// Creates a proxy configuration.
    #[must_use]
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }

    /// Returns the proxy URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn default_proxy_protocol() -> Protocol {
    Protocol::Http
}

/// Connection pool tuning for the HTTP transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Enable TCP keep-alive.
    #[serde(default)]
    pub keep_alive: Option<bool>,

    /// TCP keep-alive interval in milliseconds.
    #[serde(default)]
    pub keep_alive_ms: Option<u64>,

    /// Maximum idle connections kept per host.
    #[serde(default)]
    pub max_idle_per_host: Option<usize>,

    /// How long an idle connection is kept, in milliseconds.
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
}

/// HTTP transport options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpOptions {
    /// Client-level request timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Explicit proxy; takes precedence over the environment proxy.
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub ignore_ssl: bool,

    /// Connection pool tuning.
    #[serde(default)]
    pub pool: Option<PoolConfig>,
}

impl HttpOptions {
    /// Returns the client-level timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// A session tag passed to role assumption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AssumeRoleTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// Parameters for obtaining temporary credentials through role assumption.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AssumeRoleParams {
    /// Access key id of the principal assuming the role.
    pub access_key_id: String,

    /// Secret access key of the principal assuming the role.
    pub secret_access_key: String,

    /// Name of the role to assume.
    pub role_name: String,

    /// Account that owns the role.
    pub account_id: String,

    /// STS host override.
    #[serde(default)]
    pub host: Option<String>,

    /// STS protocol override.
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// STS region override.
    #[serde(default)]
    pub region: Option<String>,

    /// Lifetime of the issued credentials in seconds.
    #[serde(default)]
    pub duration_seconds: Option<u64>,

    /// Inline session policy.
    #[serde(default)]
    pub policy: Option<String>,

    /// Session tags.
    #[serde(default)]
    pub tags: Vec<AssumeRoleTag>,
}

impl AssumeRoleParams {
    /// Creates assume-role parameters with no overrides.
    #[must_use]
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        account_id: impl Into<String>,
        role_name: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            role_name: role_name.into(),
            account_id: account_id.into(),
            host: None,
            protocol: None,
            region: None,
            duration_seconds: None,
            policy: None,
            tags: Vec::new(),
        }
    }

    /// Returns the credential cache key for these parameters.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.access_key_id, self.secret_access_key, self.account_id, self.role_name
        )
    }

    /// Returns the role TRN, `trn:iam::<account>:role/<role>`.
    #[must_use]
    pub fn role_trn(&self) -> String {
        format!("trn:iam::{}:role/{}", self.account_id, self.role_name)
    }
}

impl fmt::Debug for AssumeRoleParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleParams")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("role_name", &self.role_name)
            .field("account_id", &self.account_id)
            .field("host", &self.host)
            .field("protocol", &self.protocol)
            .field("region", &self.region)
            .field("duration_seconds", &self.duration_seconds)
            .field("policy", &self.policy.as_ref().map(|_| "..."))
            .field("tags", &self.tags)
            .finish()
    }
}
