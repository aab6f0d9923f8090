//! Signing error types.

use thiserror::Error;
use volcstack_core::SdkError;

/// Result type alias using [`SignerError`].
pub type SignerResult<T> = Result<T, SignerError>;

/// Errors raised while signing a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// A header that takes part in the signature has no value.
    #[error("Header {name} contains invalid value")]
    InvalidHeaderValue {
        /// The offending header name, as given by the caller.
        name: String,
    },
}

impl SignerError {
    /// Creates an invalid header value error.
    #[must_use]
    pub fn invalid_header_value(name: impl Into<String>) -> Self {
        Self::InvalidHeaderValue { name: name.into() }
    }
}

impl From<SignerError> for SdkError {
    fn from(err: SignerError) -> Self {
        SdkError::signing(err.to_string())
    }
}
