//! Layered loading of [`ClientConfig`] from files, strings and the environment.

use std::env;
use std::fs;
use std::path::Path;

use volcstack_core::Protocol;

use crate::{ClientConfig, ConfigError, ProxyConfig, StrategyName};

/// Builds a [`ClientConfig`] from layered sources.
///
/// Later layers win:
/// 1. built-in defaults (`cn-beijing`, https, three retries with jitter)
/// 2. a TOML or JSON document, from a file or a string
/// 3. `PREFIX__SECTION__KEY` variables such as `VOLCSTACK__RETRY__MAX_RETRIES`
///
/// [`load`](Self::load) validates the result.
///
/// # Example
///
/// ```no_run
/// use volcstack_config::ConfigLoader;
///
/// # fn main() -> Result<(), volcstack_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("volcstack.toml")?
///     .with_env_prefix("VOLCSTACK")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: ClientConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration instead of the defaults.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read,
    /// has an unsupported extension, or does not parse (including unknown fields).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        tracing::debug!(path = %path.display(), "Loaded client configuration file");
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use volcstack_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     region = "cn-shanghai"
    ///
    ///     [retry]
    ///     max_retries = 1
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.region(), "cn-shanghai");
    /// assert_eq!(config.retry.max_attempts(), 2);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, for example
    /// `VOLCSTACK__REGION` or `VOLCSTACK__RETRY__MAX_RETRIES`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if one exists.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        self
    }

    /// Finalize, applying environment overrides and validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation fails.
    pub fn load(mut self) -> Result<ClientConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> ClientConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<ClientConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::unsupported_format(other.unwrap_or_default())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_override(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["HOST"] => config.host = non_empty(value),
            ["REGION"] => config.region = non_empty(value),
            ["PROTOCOL"] => {
                config.protocol = Protocol::parse(value)
                    .ok_or_else(|| ConfigError::env_override(key, "expected 'http' or 'https'"))?;
            }
            ["ACCESS_KEY_ID"] => config.access_key_id = non_empty(value),
            ["SECRET_ACCESS_KEY"] => config.secret_access_key = non_empty(value),
            ["SESSION_TOKEN"] => config.session_token = non_empty(value),
            ["USE_DUAL_STACK"] => {
                config.use_dual_stack = Some(
                    parse_bool(value)
                        .ok_or_else(|| ConfigError::env_override(key, "expected boolean"))?,
                );
            }
            ["CUSTOM_BOOTSTRAP_REGIONS"] => {
                config.custom_bootstrap_regions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect();
            }

            // Retry section
            ["RETRY", "AUTO_RETRY"] => {
                config.retry.auto_retry = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_override(key, "expected boolean"))?;
            }
            ["RETRY", "MAX_RETRIES"] => {
                config.retry.max_retries = value
                    .parse()
                    .map_err(|_| ConfigError::env_override(key, "expected integer"))?;
            }
            ["RETRY", "STRATEGY"] => {
                config.retry.strategy = StrategyName::parse(value).ok_or_else(|| {
                    ConfigError::env_override(
                        key,
                        "expected 'NoBackoff', 'Exponential' or 'ExponentialWithJitter'",
                    )
                })?;
            }
            ["RETRY", "MIN_RETRY_DELAY_MS"] => {
                config.retry.min_retry_delay_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_override(key, "expected integer"))?;
            }
            ["RETRY", "MAX_RETRY_DELAY_MS"] => {
                config.retry.max_retry_delay_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_override(key, "expected integer"))?;
            }

            // HTTP section
            ["HTTP", "TIMEOUT_MS"] => {
                config.http.timeout_ms = if value.is_empty() {
                    None
                } else {
                    Some(
                        value
                            .parse()
                            .map_err(|_| ConfigError::env_override(key, "expected integer"))?,
                    )
                };
            }
            ["HTTP", "IGNORE_SSL"] => {
                config.http.ignore_ssl = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_override(key, "expected boolean"))?;
            }
            ["HTTP", "PROXY", "HOST"] => {
                proxy_entry(&mut config.http.proxy).host = value.to_string();
            }
            ["HTTP", "PROXY", "PORT"] => {
                proxy_entry(&mut config.http.proxy).port = value
                    .parse()
                    .map_err(|_| ConfigError::env_override(key, "expected port number"))?;
            }
            ["HTTP", "PROXY", "PROTOCOL"] => {
                proxy_entry(&mut config.http.proxy).protocol = Protocol::parse(value)
                    .ok_or_else(|| ConfigError::env_override(key, "expected 'http' or 'https'"))?;
            }

            _ => {
                tracing::debug!(var = %key, "Ignoring unrecognized configuration variable");
            }
        }

        Ok(())
    }
}

fn proxy_entry(proxy: &mut Option<ProxyConfig>) -> &mut ProxyConfig {
    proxy.get_or_insert_with(|| ProxyConfig::new(Protocol::Http, "127.0.0.1", 80))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
