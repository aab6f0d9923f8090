//! # Volcstack Signer
//!
//! Canonical-request signing for Volcstack API calls.
//!
//! The scheme follows the familiar SigV4 layout with its own wire names:
//!
//! | Element | Value |
//! |---|---|
//! | Algorithm | `HMAC-SHA256` |
//! | Date header | `x-date`, basic ISO-8601 (`YYYYMMDDTHHMMSSZ`) |
//! | Session token header | `x-security-token` |
//! | Payload hash header | `x-content-sha256` |
//! | Scope | `<date>/<region>/<service>/request` |
//!
//! ## Steps
//!
//! 1. Lower-case header names and inject the date, token, host and payload hash headers
//! 2. Build the canonical request from method, URI, query, headers and payload hash
//! 3. Hash it into the string to sign together with the timestamp and scope
//! 4. Derive the signing key through the nested HMAC chain and sign
//!
//! Signing is a pure function of its inputs; the timestamp is always explicit.
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use volcstack_core::{Credentials, Headers, Params};
//! use volcstack_signer::{sign_request, SigningParams};
//!
//! let mut query = Params::new();
//! query.insert("foo".into(), "bar".into());
//! let credentials = Credentials::new("K", "S");
//! let headers = Headers::new();
//!
//! let result = sign_request(&SigningParams {
//!     method: "GET",
//!     uri: None,
//!     query: &query,
//!     headers: &headers,
//!     body: None,
//!     region: "cn-beijing",
//!     service_name: "test",
//!     credentials: &credentials,
//!     host: "example.com",
//!     timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//! })
//! .unwrap();
//!
//! assert!(result.authorization.contains("Credential=K/20240101/cn-beijing/test/request"));
//! ```

#![doc(html_root_url = "https://docs.rs/volcstack-signer/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod canonical;
pub mod constants;
mod error;
pub mod hash;
mod signer;

pub use canonical::{
    canonical_header_value, canonical_headers, canonical_query_string, canonical_uri,
    is_signable_header, signed_headers, uri_escape,
};
pub use error::{SignerError, SignerResult};
pub use signer::{
    add_required_headers, create_authorization, create_canonical_request, create_scope,
    create_string_to_sign, derive_signing_key, format_datetime, hex_encoded_body_hash,
    sign_request, SigningParams, SigningResult,
};
