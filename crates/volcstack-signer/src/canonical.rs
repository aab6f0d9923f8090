//! Canonicalization of URI, query and headers.

use serde_json::Value;
use volcstack_core::{value_to_string, Headers, Params};

use crate::constants::UNSIGNABLE_HEADERS;
use crate::error::{SignerError, SignerResult};

/// Percent-encodes `input` leaving only RFC 3986 unreserved characters.
///
/// Letters, digits and `-._~` pass through; everything else, including
/// `!'()*`, becomes `%XX` with upper-case hex.
#[must_use]
pub fn uri_escape(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Returns the canonical URI: each path segment escaped, joined by `/`.
#[must_use]
pub fn canonical_uri(path: Option<&str>) -> String {
    match path {
        None | Some("") => "/".to_string(),
        Some(path) => path.split('/').map(uri_escape).collect::<Vec<_>>().join("/"),
    }
}

/// Returns the canonical query string.
///
/// Null values are dropped, keys are sorted, array values repeat the key once
/// per element with the escaped elements sorted ascending. An empty array
/// yields `key=`; an empty key is skipped.
#[must_use]
pub fn canonical_query_string(params: &Params) -> String {
    let mut keys: Vec<&String> = params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, _)| key)
        .collect();
    keys.sort();

    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let escaped_key = uri_escape(key);
        if escaped_key.is_empty() {
            continue;
        }
        match &params[key.as_str()] {
            Value::Array(items) => {
                let mut values: Vec<String> = items
                    .iter()
                    .map(|item| uri_escape(&value_to_string(item)))
                    .collect();
                values.sort();
                let joiner = format!("&{escaped_key}=");
                parts.push(format!("{escaped_key}={}", values.join(&joiner)));
            }
            value => parts.push(format!("{escaped_key}={}", uri_escape(&value_to_string(value)))),
        }
    }
    parts.join("&")
}

/// Returns true if `name` (lower-cased) takes part in the signature.
#[must_use]
pub fn is_signable_header(name: &str) -> bool {
    !UNSIGNABLE_HEADERS.contains(&name)
}

/// Collapses whitespace runs to single spaces and trims.
#[must_use]
pub fn canonical_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the canonical header block: `name:value` lines sorted by lower-cased name.
///
/// # Errors
///
/// Fails if a signable header has no value.
pub fn canonical_headers(headers: &Headers) -> SignerResult<String> {
    let mut entries: Vec<(String, &str, Option<&str>)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), name, value))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut lines = Vec::with_capacity(entries.len());
    for (lower, original, value) in entries {
        if !is_signable_header(&lower) {
            continue;
        }
        let value = value.ok_or_else(|| SignerError::invalid_header_value(original))?;
        lines.push(format!("{lower}:{}", canonical_header_value(value)));
    }
    Ok(lines.join("\n"))
}

/// Returns the signed-headers list: signable lower-cased names, sorted, joined by `;`.
#[must_use]
pub fn signed_headers(headers: &Headers) -> String {
    let mut names: Vec<String> = headers
        .iter()
        .map(|(name, _)| name.to_ascii_lowercase())
        .filter(|name| is_signable_header(name))
        .collect();
    names.sort();
    names.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn test_uri_escape_reserved_characters() {
        assert_eq!(uri_escape("!'()*"), "%21%27%28%29%2A");
        assert_eq!(uri_escape(" "), "%20");
        assert_eq!(uri_escape("/"), "%2F");
        assert_eq!(uri_escape("="), "%3D");
        assert_eq!(uri_escape("&"), "%26");
        assert_eq!(uri_escape("@"), "%40");
    }

    #[test]
    fn test_uri_escape_unreserved_passthrough() {
        assert_eq!(uri_escape("AZaz09-_.~"), "AZaz09-_.~");
        assert_eq!(uri_escape("中文"), "%E4%B8%AD%E6%96%87");
    }

    #[test]
    fn test_canonical_uri() {
        assert_eq!(canonical_uri(None), "/");
        assert_eq!(canonical_uri(Some("")), "/");
        assert_eq!(canonical_uri(Some("/")), "/");
        assert_eq!(canonical_uri(Some("/a b/c(d)")), "/a%20b/c%28d%29");
    }

    #[test]
    fn test_query_string_sorted_and_escaped() {
        let query = params(json!({"b": "2", "a/b": "c d", "Limit": 10}));
        assert_eq!(canonical_query_string(&query), "Limit=10&a%2Fb=c%20d&b=2");
    }

    #[test]
    fn test_query_string_drops_null_and_empty_key() {
        let query = params(json!({"a": null, "": "x", "b": "1"}));
        assert_eq!(canonical_query_string(&query), "b=1");
    }

    #[test]
    fn test_query_string_arrays() {
        let query = params(json!({"id": ["z", "a", "m"], "empty": []}));
        assert_eq!(canonical_query_string(&query), "empty=&id=a&id=m&id=z");
    }

    #[test]
    fn test_query_string_empty() {
        assert_eq!(canonical_query_string(&Params::new()), "");
    }

    #[test]
    fn test_canonical_headers_sorted_and_collapsed() {
        let headers: Headers = [
            ("x-date", "20240101T000000Z"),
            ("Host", "example.com"),
            ("X-Custom", "  a   b\t c  "),
            ("content-type", "application/json"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            canonical_headers(&headers).unwrap(),
            "host:example.com\nx-custom:a b c\nx-date:20240101T000000Z"
        );
        assert_eq!(signed_headers(&headers), "host;x-custom;x-date");
    }

    #[test]
    fn test_canonical_headers_rejects_missing_value() {
        let mut headers = Headers::new();
        headers.insert("host", "example.com");
        headers.insert_empty("X-Broken");

        let err = canonical_headers(&headers).unwrap_err();
        assert_eq!(err.to_string(), "Header X-Broken contains invalid value");
    }

    #[test]
    fn test_unsignable_header_without_value_is_ignored() {
        let mut headers = Headers::new();
        headers.insert("host", "example.com");
        headers.insert_empty("user-agent");
        assert_eq!(canonical_headers(&headers).unwrap(), "host:example.com");
    }

    #[test]
    fn test_is_signable_header() {
        for name in UNSIGNABLE_HEADERS {
            assert!(!is_signable_header(name));
        }
        assert!(is_signable_header("x-date"));
        assert!(is_signable_header("host"));
    }
}
