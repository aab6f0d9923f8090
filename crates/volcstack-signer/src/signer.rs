//! Request signing.

use chrono::{DateTime, Utc};
use volcstack_core::{Body, Credentials, Headers, Params};

use crate::canonical::{canonical_headers, canonical_query_string, canonical_uri, signed_headers};
use crate::constants::{
    ALGORITHM, AUTHORIZATION_HEADER, CONTENT_SHA256_HEADER, DATETIME_FORMAT, DATE_HEADER,
    SCOPE_TERMINATOR, TOKEN_HEADER,
};
use crate::error::SignerResult;
use crate::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256, EMPTY_SHA256};

/// Inputs to [`sign_request`].
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    /// HTTP method; upper-cased in the canonical request.
    pub method: &'a str,
    /// Request path; `/` when absent.
    pub uri: Option<&'a str>,
    /// Query parameters.
    pub query: &'a Params,
    /// Request headers, any case.
    pub headers: &'a Headers,
    /// Request payload.
    pub body: Option<&'a Body>,
    /// Signing region.
    pub region: &'a str,
    /// Signing service name.
    pub service_name: &'a str,
    /// Access key pair and optional session token.
    pub credentials: &'a Credentials,
    /// Host used when the headers carry none.
    pub host: &'a str,
    /// Signing time.
    pub timestamp: DateTime<Utc>,
}

/// Output of [`sign_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningResult {
    /// Lower-cased input headers, the injected headers and `Authorization`.
    pub headers: Headers,
    /// Hex signature.
    pub signature: String,
    /// Value of the `Authorization` header.
    pub authorization: String,
}

/// Formats a timestamp as `YYYYMMDDTHHMMSSZ`.
#[must_use]
pub fn format_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DATETIME_FORMAT).to_string()
}

/// Returns the payload hash: the preset content hash header if present,
/// otherwise the SHA-256 of the body (of the empty string without one).
#[must_use]
pub fn hex_encoded_body_hash(headers: &Headers, body: Option<&Body>) -> String {
    if let Some(preset) = headers.get(CONTENT_SHA256_HEADER).filter(|v| !v.is_empty()) {
        return preset.to_string();
    }
    match body {
        Some(body) if !body.is_empty() => hex_sha256(body.to_bytes()),
        _ => EMPTY_SHA256.to_string(),
    }
}

/// Returns `headers` with the date, session token, host and payload hash headers added.
///
/// The payload hash header is only added when there is a body or it was preset.
#[must_use]
pub fn add_required_headers(
    headers: &Headers,
    datetime: &str,
    host: &str,
    session_token: Option<&str>,
    body: Option<&Body>,
) -> Headers {
    let mut updated = headers.clone();
    updated.insert(DATE_HEADER, datetime);
    if let Some(token) = session_token.filter(|t| !t.is_empty()) {
        updated.insert(TOKEN_HEADER, token);
    }
    if updated.get("host").map_or(true, str::is_empty) {
        updated.insert("host", host);
    }
    let has_body = body.is_some_and(|b| !b.is_empty());
    let preset = updated
        .get(CONTENT_SHA256_HEADER)
        .is_some_and(|v| !v.is_empty());
    if has_body || preset {
        let hash = hex_encoded_body_hash(&updated, body);
        updated.insert(CONTENT_SHA256_HEADER, hash);
    }
    updated
}

/// Builds the canonical request.
///
/// # Errors
///
/// Fails if a signable header has no value.
pub fn create_canonical_request(
    method: &str,
    uri: Option<&str>,
    query: &Params,
    headers: &Headers,
    payload_hash: &str,
) -> SignerResult<String> {
    Ok([
        method.to_ascii_uppercase(),
        canonical_uri(uri),
        canonical_query_string(query),
        format!("{}\n", canonical_headers(headers)?),
        signed_headers(headers),
        payload_hash.to_string(),
    ]
    .join("\n"))
}

/// Returns the credential scope `date/region/service/request`.
#[must_use]
pub fn create_scope(date: &str, region: &str, service_name: &str) -> String {
    let date = date.get(..8).unwrap_or(date);
    [date, region, service_name, SCOPE_TERMINATOR].join("/")
}

/// Returns the string to sign.
#[must_use]
pub fn create_string_to_sign(
    datetime: &str,
    region: &str,
    service_name: &str,
    canonical_request: &str,
) -> String {
    [
        ALGORITHM.to_string(),
        datetime.to_string(),
        create_scope(datetime, region, service_name),
        hex_sha256(canonical_request),
    ]
    .join("\n")
}

/// Derives the signing key through the nested HMAC chain.
#[must_use]
pub fn derive_signing_key(secret: &str, date: &str, region: &str, service_name: &str) -> Vec<u8> {
    let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service_name.as_bytes());
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

/// Returns the `Authorization` header value.
#[must_use]
pub fn create_authorization(
    access_key_id: &str,
    scope: &str,
    signed_headers: &str,
    signature: &str,
) -> String {
    format!(
        "{ALGORITHM} Credential={access_key_id}/{scope}, SignedHeaders={signed_headers}, Signature={signature}"
    )
}

/// Signs a request.
///
/// Identical inputs always produce identical output. Call once per request,
/// after every parameter and body transform.
///
/// # Errors
///
/// Fails if a signable header has no value.
pub fn sign_request(params: &SigningParams<'_>) -> SignerResult<SigningResult> {
    let datetime = format_datetime(params.timestamp);
    let date = &datetime[..8];

    let lowercase = params.headers.to_lowercase_names();
    let mut headers = add_required_headers(
        &lowercase,
        &datetime,
        params.host,
        params.credentials.session_token.as_deref(),
        params.body,
    );

    let payload_hash = headers
        .get(CONTENT_SHA256_HEADER)
        .filter(|v| !v.is_empty())
        .map_or_else(|| EMPTY_SHA256.to_string(), str::to_string);

    let canonical_request = create_canonical_request(
        params.method,
        params.uri,
        params.query,
        &headers,
        &payload_hash,
    )?;
    let string_to_sign =
        create_string_to_sign(&datetime, params.region, params.service_name, &canonical_request);
    let signing_key = derive_signing_key(
        &params.credentials.secret_access_key,
        date,
        params.region,
        params.service_name,
    );
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());
    let scope = create_scope(date, params.region, params.service_name);
    let authorization = create_authorization(
        &params.credentials.access_key_id,
        &scope,
        &signed_headers(&headers),
        &signature,
    );

    headers.insert(AUTHORIZATION_HEADER, authorization.clone());
    Ok(SigningResult {
        headers,
        signature,
        authorization,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_datetime() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 45).unwrap();
        assert_eq!(format_datetime(ts), "20240315T123045Z");
    }

    #[test]
    fn test_create_scope() {
        assert_eq!(
            create_scope("20240101T000000Z", "cn-beijing", "iam"),
            "20240101/cn-beijing/iam/request"
        );
        assert_eq!(create_scope("20240101", "cn-beijing", "iam"), "20240101/cn-beijing/iam/request");
    }

    #[test]
    fn test_canonical_request_has_seven_lines() {
        let headers: Headers = [("host", "example.com"), ("x-date", "20240101T000000Z")]
            .into_iter()
            .collect();
        let canonical =
            create_canonical_request("get", Some("/"), &Params::new(), &headers, EMPTY_SHA256).unwrap();
        let lines: Vec<&str> = canonical.split('\n').collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "GET");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "host;x-date");
    }

    #[test]
    fn test_add_required_headers_without_body() {
        let headers = add_required_headers(&Headers::new(), "20240101T000000Z", "h.example", None, None);
        assert_eq!(headers.get(DATE_HEADER), Some("20240101T000000Z"));
        assert_eq!(headers.get("host"), Some("h.example"));
        assert!(!headers.contains(TOKEN_HEADER));
        assert!(!headers.contains(CONTENT_SHA256_HEADER));
    }

    #[test]
    fn test_add_required_headers_keeps_existing_host() {
        let headers: Headers = [("host", "custom.example")].into_iter().collect();
        let updated = add_required_headers(&headers, "20240101T000000Z", "other", Some("tok"), None);
        assert_eq!(updated.get("host"), Some("custom.example"));
        assert_eq!(updated.get(TOKEN_HEADER), Some("tok"));
    }

    #[test]
    fn test_add_required_headers_hashes_body() {
        let body = Body::Text("test".into());
        let updated = add_required_headers(&Headers::new(), "20240101T000000Z", "h", None, Some(&body));
        assert_eq!(
            updated.get(CONTENT_SHA256_HEADER),
            Some("9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")
        );
    }

    #[test]
    fn test_preset_content_hash_is_reused() {
        let headers: Headers = [(CONTENT_SHA256_HEADER, "precomputed")].into_iter().collect();
        let body = Body::Text("ignored".into());
        assert_eq!(hex_encoded_body_hash(&headers, Some(&body)), "precomputed");

        let updated = add_required_headers(&headers, "20240101T000000Z", "h", None, None);
        assert_eq!(updated.get(CONTENT_SHA256_HEADER), Some("precomputed"));
    }

    #[test]
    fn test_body_hash_defaults_to_empty_digest() {
        assert_eq!(hex_encoded_body_hash(&Headers::new(), None), EMPTY_SHA256);
        let empty = Body::Json(serde_json::Value::Null);
        assert_eq!(hex_encoded_body_hash(&Headers::new(), Some(&empty)), EMPTY_SHA256);
    }

    #[test]
    fn test_sign_injects_authorization() {
        let creds = Credentials::new("K", "S");
        let query = json!({"foo": "bar"}).as_object().cloned().unwrap();
        let headers = Headers::new();
        let result = sign_request(&SigningParams {
            method: "GET",
            uri: None,
            query: &query,
            headers: &headers,
            body: None,
            region: "cn-beijing",
            service_name: "test",
            credentials: &creds,
            host: "example.com",
            timestamp: timestamp(),
        })
        .unwrap();

        assert_eq!(result.headers.get(AUTHORIZATION_HEADER), Some(result.authorization.as_str()));
        assert!(result
            .authorization
            .starts_with("HMAC-SHA256 Credential=K/20240101/cn-beijing/test/request, SignedHeaders=host;x-date, Signature="));
        assert_eq!(result.signature.len(), 64);
    }

    #[test]
    fn test_sign_lowercases_header_names() {
        let creds = Credentials::new("K", "S");
        let headers: Headers = [("X-Custom-Header", "v"), ("Content-Type", "application/json")]
            .into_iter()
            .collect();
        let result = sign_request(&SigningParams {
            method: "POST",
            uri: Some("/"),
            query: &Params::new(),
            headers: &headers,
            body: None,
            region: "cn-beijing",
            service_name: "test",
            credentials: &creds,
            host: "example.com",
            timestamp: timestamp(),
        })
        .unwrap();

        assert_eq!(result.headers.get("x-custom-header"), Some("v"));
        assert_eq!(result.headers.get("content-type"), Some("application/json"));
        assert!(result.authorization.contains("SignedHeaders=host;x-custom-header;x-date,"));
    }

    #[test]
    fn test_sign_rejects_header_without_value() {
        let creds = Credentials::new("K", "S");
        let mut headers = Headers::new();
        headers.insert_empty("X-Trace");
        let err = sign_request(&SigningParams {
            method: "GET",
            uri: None,
            query: &Params::new(),
            headers: &headers,
            body: None,
            region: "cn-beijing",
            service_name: "test",
            credentials: &creds,
            host: "example.com",
            timestamp: timestamp(),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Header x-trace contains invalid value");
    }
}
