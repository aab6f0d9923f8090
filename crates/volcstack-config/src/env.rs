//! Settings read from the process environment.
//!
//! | Variable | Effect |
//! |---|---|
//! | `VOLCSTACK_ACCESS_KEY_ID` / `VOLCSTACK_ACCESS_KEY` | access key id |
//! | `VOLCSTACK_SECRET_ACCESS_KEY` / `VOLCSTACK_SECRET_KEY` | secret access key |
//! | `VOLCSTACK_SESSION_TOKEN` | session token |
//! | `VOLC_ENABLE_DUALSTACK` | `true` selects dual-stack endpoints |
//! | `VOLC_BOOTSTRAP_REGION_LIST_CONF` | file listing extra bootstrap regions, one per line |
//! | `VOLC_PROXY_HOST` / `VOLC_PROXY_PORT` / `VOLC_PROXY_PROTOCOL` | forward proxy |
//!
//! When the key pair is incomplete, `~/.volc/config` (JSON with
//! `VOLC_ACCESSKEY` and `VOLC_SECRETKEY`) fills the missing halves.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use volcstack_core::Protocol;

use crate::{HttpOptions, ProxyConfig};

/// Credentials found in the environment; any field may be missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvCredentials {
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Session token.
    pub session_token: Option<String>,
}

impl std::fmt::Debug for EnvCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "[REDACTED]"))
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A snapshot of the environment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Credentials.
    pub credentials: EnvCredentials,
    /// `VOLC_ENABLE_DUALSTACK == "true"`.
    pub enable_dual_stack: bool,
    /// Path of the bootstrap region list file.
    pub bootstrap_region_list_conf: Option<PathBuf>,
    /// Proxy, present only when a proxy host or port is set.
    pub proxy: Option<ProxyConfig>,
}

#[derive(Deserialize)]
struct HomeConfigFile {
    #[serde(rename = "VOLC_ACCESSKEY")]
    access_key: Option<String>,
    #[serde(rename = "VOLC_SECRETKEY")]
    secret_key: Option<String>,
}

impl EnvConfig {
    /// Reads the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    ///
    /// `HOME` is also resolved through `lookup` when locating the credentials file.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let mut credentials = EnvCredentials {
            access_key_id: get("VOLCSTACK_ACCESS_KEY_ID").or_else(|| get("VOLCSTACK_ACCESS_KEY")),
            secret_access_key: get("VOLCSTACK_SECRET_ACCESS_KEY")
                .or_else(|| get("VOLCSTACK_SECRET_KEY")),
            session_token: get("VOLCSTACK_SESSION_TOKEN"),
        };

        if credentials.access_key_id.is_none() || credentials.secret_access_key.is_none() {
            if let Some(home) = get("HOME") {
                fill_from_home_file(&mut credentials, Path::new(&home));
            }
        }

        let proxy_protocol = get("VOLC_PROXY_PROTOCOL")
            .and_then(|p| Protocol::parse(&p))
            .unwrap_or(Protocol::Http);
        let proxy_host = get("VOLC_PROXY_HOST");
        let proxy_port = get("VOLC_PROXY_PORT");
        let proxy = if proxy_host.is_some() || proxy_port.is_some() {
            let default_port = match proxy_protocol {
                Protocol::Https => 443,
                Protocol::Http => 80,
            };
            let port = proxy_port
                .as_deref()
                .and_then(|p| p.trim().parse::<u16>().ok())
                .unwrap_or(default_port);
            Some(ProxyConfig::new(
                proxy_protocol,
                proxy_host.unwrap_or_else(|| "127.0.0.1".to_string()),
                port,
            ))
        } else {
            None
        };

        Self {
            credentials,
            enable_dual_stack: lookup("VOLC_ENABLE_DUALSTACK").as_deref() == Some("true"),
            bootstrap_region_list_conf: get("VOLC_BOOTSTRAP_REGION_LIST_CONF").map(PathBuf::from),
            proxy,
        }
    }

    /// Returns the regions listed in the bootstrap region file.
    ///
    /// A missing or unreadable file yields no regions.
    #[must_use]
    pub fn bootstrap_regions(&self) -> Vec<String> {
        let Some(path) = &self.bootstrap_region_list_conf else {
            return Vec::new();
        };
        match fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "Bootstrap region list unreadable");
                Vec::new()
            }
        }
    }

    /// Returns the proxy to use: the explicit one from `http`, else the environment's.
    #[must_use]
    pub fn resolve_proxy(&self, http: &HttpOptions) -> Option<ProxyConfig> {
        http.proxy.clone().or_else(|| self.proxy.clone())
    }
}

fn fill_from_home_file(credentials: &mut EnvCredentials, home: &Path) {
    let path = home.join(".volc").join("config");
    let Ok(content) = fs::read_to_string(&path) else {
        return;
    };
    let file: HomeConfigFile = match serde_json::from_str(&content) {
        Ok(file) => file,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Ignoring malformed credentials file");
            return;
        }
    };
    if credentials.access_key_id.is_none() {
        credentials.access_key_id = file.access_key.filter(|v| !v.is_empty());
    }
    if credentials.secret_access_key.is_none() {
        credentials.secret_access_key = file.secret_key.filter(|v| !v.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_environment() {
        let env = EnvConfig::from_lookup(lookup(&[]));
        assert_eq!(env, EnvConfig::default());
    }

    #[test]
    fn test_primary_credential_names() {
        let env = EnvConfig::from_lookup(lookup(&[
            ("VOLCSTACK_ACCESS_KEY_ID", "AK1"),
            ("VOLCSTACK_ACCESS_KEY", "AK2"),
            ("VOLCSTACK_SECRET_ACCESS_KEY", "SK1"),
            ("VOLCSTACK_SESSION_TOKEN", "TOKEN"),
        ]));
        assert_eq!(env.credentials.access_key_id.as_deref(), Some("AK1"));
        assert_eq!(env.credentials.secret_access_key.as_deref(), Some("SK1"));
        assert_eq!(env.credentials.session_token.as_deref(), Some("TOKEN"));
    }

    #[test]
    fn test_alternate_credential_names() {
        let env = EnvConfig::from_lookup(lookup(&[
            ("VOLCSTACK_ACCESS_KEY", "AK2"),
            ("VOLCSTACK_SECRET_KEY", "SK2"),
        ]));
        assert_eq!(env.credentials.access_key_id.as_deref(), Some("AK2"));
        assert_eq!(env.credentials.secret_access_key.as_deref(), Some("SK2"));
    }

    #[test]
    fn test_home_config_fills_missing_keys() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".volc")).unwrap();
        std::fs::write(
            home.path().join(".volc/config"),
            r#"{"VOLC_ACCESSKEY": "FILE_AK", "VOLC_SECRETKEY": "FILE_SK"}"#,
        )
        .unwrap();
        let home_str = home.path().to_string_lossy().to_string();

        let env = EnvConfig::from_lookup(lookup(&[
            ("HOME", home_str.as_str()),
            ("VOLCSTACK_ACCESS_KEY_ID", "ENV_AK"),
        ]));
        assert_eq!(env.credentials.access_key_id.as_deref(), Some("ENV_AK"));
        assert_eq!(env.credentials.secret_access_key.as_deref(), Some("FILE_SK"));
    }

    #[test]
    fn test_home_config_ignored_when_keys_complete() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".volc")).unwrap();
        std::fs::write(
            home.path().join(".volc/config"),
            r#"{"VOLC_ACCESSKEY": "FILE_AK", "VOLC_SECRETKEY": "FILE_SK"}"#,
        )
        .unwrap();
        let home_str = home.path().to_string_lossy().to_string();

        let env = EnvConfig::from_lookup(lookup(&[
            ("HOME", home_str.as_str()),
            ("VOLCSTACK_ACCESS_KEY_ID", "ENV_AK"),
            ("VOLCSTACK_SECRET_ACCESS_KEY", "ENV_SK"),
        ]));
        assert_eq!(env.credentials.secret_access_key.as_deref(), Some("ENV_SK"));
    }

    #[test]
    fn test_malformed_home_config_is_ignored() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".volc")).unwrap();
        std::fs::write(home.path().join(".volc/config"), "not json").unwrap();
        let home_str = home.path().to_string_lossy().to_string();

        let env = EnvConfig::from_lookup(lookup(&[("HOME", home_str.as_str())]));
        assert!(env.credentials.access_key_id.is_none());
    }

    #[test]
    fn test_dual_stack_requires_exact_true() {
        assert!(EnvConfig::from_lookup(lookup(&[("VOLC_ENABLE_DUALSTACK", "true")])).enable_dual_stack);
        assert!(!EnvConfig::from_lookup(lookup(&[("VOLC_ENABLE_DUALSTACK", "1")])).enable_dual_stack);
        assert!(!EnvConfig::from_lookup(lookup(&[("VOLC_ENABLE_DUALSTACK", "TRUE")])).enable_dual_stack);
    }

    #[test]
    fn test_proxy_absent_without_host_or_port() {
        let env = EnvConfig::from_lookup(lookup(&[("VOLC_PROXY_PROTOCOL", "https")]));
        assert!(env.proxy.is_none());
    }

    #[test]
    fn test_proxy_defaults() {
        let env = EnvConfig::from_lookup(lookup(&[("VOLC_PROXY_PORT", "8888")]));
        assert_eq!(env.proxy, Some(ProxyConfig::new(Protocol::Http, "127.0.0.1", 8888)));

        let env = EnvConfig::from_lookup(lookup(&[
            ("VOLC_PROXY_HOST", "proxy.internal"),
            ("VOLC_PROXY_PROTOCOL", "https"),
        ]));
        assert_eq!(env.proxy, Some(ProxyConfig::new(Protocol::Https, "proxy.internal", 443)));

        let env = EnvConfig::from_lookup(lookup(&[("VOLC_PROXY_HOST", "proxy.internal")]));
        assert_eq!(env.proxy.unwrap().port, 80);
    }

    #[test]
    fn test_explicit_proxy_wins() {
        let env = EnvConfig::from_lookup(lookup(&[("VOLC_PROXY_HOST", "env-proxy")]));
        let explicit = HttpOptions {
            proxy: Some(ProxyConfig::new(Protocol::Http, "explicit", 3128)),
            ..Default::default()
        };
        assert_eq!(env.resolve_proxy(&explicit).unwrap().host, "explicit");
        assert_eq!(env.resolve_proxy(&HttpOptions::default()).unwrap().host, "env-proxy");
        assert!(EnvConfig::default().resolve_proxy(&HttpOptions::default()).is_none());
    }

    #[test]
    fn test_bootstrap_region_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions");
        std::fs::write(&path, "cn-guilin-boe\n\n  cn-test  \n").unwrap();

        let env = EnvConfig {
            bootstrap_region_list_conf: Some(path),
            ..Default::default()
        };
        assert_eq!(env.bootstrap_regions(), vec!["cn-guilin-boe", "cn-test"]);

        let missing = EnvConfig {
            bootstrap_region_list_conf: Some(dir.path().join("missing")),
            ..Default::default()
        };
        assert!(missing.bootstrap_regions().is_empty());
    }
}
