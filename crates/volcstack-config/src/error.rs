//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;
use volcstack_core::SdkError;

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a [`ClientConfig`](crate::ClientConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("client configuration not found at {path}")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("cannot read client configuration at {path}")]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document does not describe a client configuration.
    #[error("invalid TOML client configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON document does not describe a client configuration.
    #[error("invalid JSON client configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format `{format}`; expected toml or json")]
    UnsupportedFormat {
        /// The rejected format or file extension.
        format: String,
    },

    /// A field holds a value the client cannot use.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the field, e.g. `retry.max_retry_delay_ms`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `PREFIX__SECTION__KEY` override could not be applied.
    #[error("cannot apply environment override {var}: {reason}")]
    EnvOverride {
        /// Variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Missing configuration file.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Unreadable configuration file.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Unsupported format name or extension.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Invalid field value.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Unusable environment override.
    pub fn env_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for SdkError {
    fn from(err: ConfigError) -> Self {
        SdkError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volcstack_core::ErrorKind;

    #[test]
    fn test_messages() {
        assert_eq!(
            ConfigError::not_found("/etc/volcstack.toml").to_string(),
            "client configuration not found at /etc/volcstack.toml"
        );
        assert_eq!(
            ConfigError::invalid_value("retry.max_retry_delay_ms", "must be >= min").to_string(),
            "invalid value for retry.max_retry_delay_ms: must be >= min"
        );
        assert_eq!(
            ConfigError::unsupported_format("yaml").to_string(),
            "unsupported configuration format `yaml`; expected toml or json"
        );
    }

    #[test]
    fn test_env_override_names_variable() {
        let err = ConfigError::env_override("VOLCSTACK__RETRY__MAX_RETRIES", "expected integer");
        assert_eq!(
            err.to_string(),
            "cannot apply environment override VOLCSTACK__RETRY__MAX_RETRIES: expected integer"
        );
    }

    #[test]
    fn test_converts_to_sdk_error() {
        let err: SdkError = ConfigError::invalid_value("region", "must not be empty").into();
        assert_eq!(err.kind(), ErrorKind::Exception);
        assert_eq!(
            err.to_string(),
            "configuration error: invalid value for region: must not be empty"
        );
    }
}
