//! # Volcstack
//!
//! **Request core for Volcengine OpenAPI clients**
//!
//! Volcstack provides the machinery every service client shares:
//!
//! - **Phased middleware stack** – initialize, serialize, build and finalize phases with priorities and overrides
//! - **Request signing** – HMAC-SHA256 canonical-request signatures
//! - **Retries** – classified errors, exponential backoff with jitter, cancellable sleeps
//! - **Credentials** – static keys, environment fallback and cached role assumption
//! - **Endpoint resolution** – per-service regional hosts with dual-stack support
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use volcstack::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> SdkResult<()> {
//!     let client = Client::new(
//!         ClientConfig::builder()
//!             .credentials("AK", "SK")
//!             .region("cn-beijing")
//!             .max_retries(2)
//!             .build(),
//!     )?;
//!
//!     let command = Command::from_meta_path(
//!         "DescribeInstancesCommand",
//!         json!({"InstanceIds": ["i-1", "i-2"]}),
//!         "/DescribeInstances/2020-04-01/ecs/get//",
//!     )?;
//!     let output = client.send(&command, SendOptions::new()).await?;
//!     println!("{output}");
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! defaultHeaders → credentials → endpoint → dotN → signer → retry → httpRequest
//!   (initialize)                           (serialize) (build)  (finalizeRequest)
//! ```
//!
//! Custom stages are added per client or per command and merged in by phase
//! and priority at send time.

#![doc(html_root_url = "https://docs.rs/volcstack/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod command;
pub mod dispatch;
pub mod sts;

pub use client::{Client, ClientBuilder, SendOptions, DEFAULT_CLIENT_NAME};
pub use command::{Command, MetaPath, RequestConfig};
pub use dispatch::ReqwestDispatcher;
pub use sts::{provider_factory, AssumeRoleProvider};

pub use volcstack_config::ClientConfig;
pub use volcstack_core::{ErrorKind, SdkError, SdkResult};

// Re-export core types
pub use volcstack_core as core;

// Re-export configuration types
pub use volcstack_config as config;

// Re-export middleware types
pub use volcstack_middleware as middleware;

// Re-export signing
pub use volcstack_signer as signer;

// Re-export logging setup
pub use volcstack_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use volcstack::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Client, ClientBuilder, Command, MetaPath, RequestConfig, SendOptions};

    pub use volcstack_core::{
        Body, CancellationToken, Clock, CredentialProvider, Credentials, ErrorKind, Protocol,
        Request, RequestEnvelope, SdkError, SdkResult,
    };

    // Re-export configuration
    pub use volcstack_config::{
        AssumeRoleParams, ClientConfig, HttpOptions, ProxyConfig, RetryConfig, StrategyName,
    };

    // Re-export middleware building blocks
    pub use volcstack_middleware::{
        AddOptions, ExecutionContext, FnMiddleware, Middleware, Next, Phase,
    };

    // Re-export logging setup
    pub use volcstack_telemetry::{init_logging, LogConfig};
}
