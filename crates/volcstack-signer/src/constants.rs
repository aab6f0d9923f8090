//! Wire constants of the signing scheme.

/// Algorithm token used in the string to sign and the `Authorization` header.
pub const ALGORITHM: &str = "HMAC-SHA256";

/// Terminator of the credential scope and last step of the key derivation.
pub const SCOPE_TERMINATOR: &str = "request";

/// Header carrying the signing timestamp.
pub const DATE_HEADER: &str = "x-date";

/// Header carrying the session token of temporary credentials.
pub const TOKEN_HEADER: &str = "x-security-token";

/// Header carrying the hex SHA-256 of the payload.
pub const CONTENT_SHA256_HEADER: &str = "x-content-sha256";

/// Name of the header added to the signed request.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Headers never included in the signature.
pub const UNSIGNABLE_HEADERS: [&str; 6] = [
    "authorization",
    "content-type",
    "content-length",
    "user-agent",
    "presigned-expires",
    "expect",
];

/// Basic ISO-8601 format of the date header.
pub const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";
