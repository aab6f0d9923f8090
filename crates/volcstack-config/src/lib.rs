//! Typed configuration for the Volcstack API client.
//!
//! This crate provides:
//! - [`ClientConfig`] - every recognized client option as a typed field
//! - [`ConfigLoader`] - layered loading (defaults → file → environment)
//! - [`EnvConfig`] - credentials, proxy and endpoint settings from the process environment
//! - [`EndpointResolver`] - service/region to host mapping over the built-in service registry
//!
//! # Example
//!
//! ```no_run
//! use volcstack_config::{ClientConfig, ConfigLoader};
//!
//! # fn main() -> Result<(), volcstack_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()
//!     .with_optional_file("volcstack.toml")?
//!     .with_env_prefix("VOLCSTACK")
//!     .load()?;
//!
//! println!("Calls default to region {}", config.region());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! region = "cn-beijing"
//! protocol = "https"
//! access_key_id = "AK..."
//! secret_access_key = "SK..."
//! custom_bootstrap_regions = ["cn-guilin-boe"]
//!
//! [retry]
//! auto_retry = true
//! max_retries = 3
//! strategy = "ExponentialWithJitter"
//! min_retry_delay_ms = 300
//! max_retry_delay_ms = 300000
//!
//! [http]
//! timeout_ms = 30000
//! ignore_ssl = false
//!
//! [http.proxy]
//! protocol = "http"
//! host = "127.0.0.1"
//! port = 3128
//!
//! [assume_role]
//! access_key_id = "AK..."
//! secret_access_key = "SK..."
//! account_id = "2100000000"
//! role_name = "deployer"
//! ```
//!
//! # Environment Variable Overrides
//!
//! With a prefix set, values can be overridden as `PREFIX__SECTION__KEY`:
//!
//! - `VOLCSTACK__REGION=cn-shanghai`
//! - `VOLCSTACK__RETRY__MAX_RETRIES=5`
//! - `VOLCSTACK__HTTP__PROXY__HOST=proxy.internal`

#![doc(html_root_url = "https://docs.rs/volcstack-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod endpoint;
mod env;
mod error;
mod loader;
mod retry;
mod schema;

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_REGION};
pub use endpoint::{
    lookup_service, services, standardize_service_code, DefaultEndpointResolver, EndpointQuery,
    EndpointResolver, ServiceEndpoint, BOOTSTRAP_REGIONS, DEFAULT_ENDPOINT,
    DUAL_STACK_ENDPOINT_SUFFIX, ENDPOINT_SUFFIX,
};
pub use env::{EnvConfig, EnvCredentials};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use retry::{
    RetryConfig, RetryStrategy, StrategyName, DEFAULT_MAX_RETRIES, DEFAULT_MAX_RETRY_DELAY_MS,
    DEFAULT_MIN_RETRY_DELAY_MS,
};
pub use schema::{AssumeRoleParams, AssumeRoleTag, HttpOptions, PoolConfig, ProxyConfig};
