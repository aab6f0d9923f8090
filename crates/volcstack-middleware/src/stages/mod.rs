//! Built-in pipeline stages.
//!
//! The client installs these stages into its default stack:
//!
//! | Stage | Phase | Priority |
//! |---|---|---|
//! | [`default_headers`] | initialize | 150 |
//! | [`credentials`] | initialize | 100 |
//! | [`endpoint`] | initialize | 50 |
//! | [`flatten`] | serialize | 50 |
//! | [`signer`] | build | 100 |
//! | [`retry`] | finalizeRequest | 100 |
//! | [`dispatch`] | finalizeRequest | 50 |
//!
//! Custom stages can be slotted between them by priority, or can replace one
//! by registering under the same phase and name with `overriding` set.

pub mod credentials;
pub mod default_headers;
pub mod dispatch;
pub mod endpoint;
pub mod flatten;
pub mod retry;
pub mod signer;

pub use credentials::{CredentialsMiddleware, ProviderFactory};
pub use default_headers::DefaultHeadersMiddleware;
pub use dispatch::{classify_transport_error, HttpRequestMiddleware};
pub use endpoint::EndpointMiddleware;
pub use flatten::{flatten_dot_n, DotNMiddleware};
pub use retry::RetryMiddleware;
pub use signer::SignerMiddleware;

use crate::stack::{AddOptions, Phase};

/// The form content type that triggers parameter flattening and form encoding.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Name, phase and priority under which a built-in stage is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlacement {
    /// Stage name.
    pub name: &'static str,
    /// Phase.
    pub phase: Phase,
    /// Priority within the phase.
    pub priority: i32,
}

impl StagePlacement {
    /// Returns the options that register a stage at this placement.
    #[must_use]
    pub fn options(&self) -> AddOptions {
        AddOptions::new(self.phase)
            .name(self.name)
            .priority(self.priority)
    }
}

/// Placement of [`DefaultHeadersMiddleware`].
pub const DEFAULT_HEADERS: StagePlacement = StagePlacement {
    name: "defaultHeadersMiddleware",
    phase: Phase::Initialize,
    priority: 150,
};

/// Placement of [`CredentialsMiddleware`].
pub const CREDENTIALS: StagePlacement = StagePlacement {
    name: "credentialsMiddleware",
    phase: Phase::Initialize,
    priority: 100,
};

/// Placement of [`EndpointMiddleware`].
pub const ENDPOINT: StagePlacement = StagePlacement {
    name: "endpointMiddleware",
    phase: Phase::Initialize,
    priority: 50,
};

/// Placement of [`DotNMiddleware`].
pub const DOT_N: StagePlacement = StagePlacement {
    name: "dotNMiddleware",
    phase: Phase::Serialize,
    priority: 50,
};

/// Placement of [`SignerMiddleware`].
pub const SIGNER: StagePlacement = StagePlacement {
    name: "signerMiddleware",
    phase: Phase::Build,
    priority: 100,
};

/// Placement of [`RetryMiddleware`].
pub const RETRY: StagePlacement = StagePlacement {
    name: "retryMiddleware",
    phase: Phase::FinalizeRequest,
    priority: 100,
};

/// Placement of [`HttpRequestMiddleware`].
pub const HTTP_REQUEST: StagePlacement = StagePlacement {
    name: "httpRequestMiddleware",
    phase: Phase::FinalizeRequest,
    priority: 50,
};

/// Every built-in placement, in execution order.
pub const ALL: [StagePlacement; 7] = [
    DEFAULT_HEADERS,
    CREDENTIALS,
    ENDPOINT,
    DOT_N,
    SIGNER,
    RETRY,
    HTTP_REQUEST,
];
