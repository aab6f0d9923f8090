//! Known-answer and property tests for request signing.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};
use volcstack_core::{Body, Credentials, Headers, Params};
use volcstack_signer::{canonical_query_string, sign_request, SigningParams, SigningResult};

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

struct Case {
    method: &'static str,
    query: Params,
    headers: Headers,
    body: Option<Body>,
    region: &'static str,
    service: &'static str,
    credentials: Credentials,
    host: &'static str,
    timestamp: DateTime<Utc>,
}

impl Case {
    fn sign(&self) -> SigningResult {
        sign_request(&SigningParams {
            method: self.method,
            uri: Some("/"),
            query: &self.query,
            headers: &self.headers,
            body: self.body.as_ref(),
            region: self.region,
            service_name: self.service,
            credentials: &self.credentials,
            host: self.host,
            timestamp: self.timestamp,
        })
        .unwrap()
    }
}

fn list_users() -> Case {
    Case {
        method: "GET",
        query: params(json!({"Action": "ListUsers", "Version": "2018-01-01", "Limit": 10})),
        headers: [("Content-Type", "application/json; charset=utf-8")]
            .into_iter()
            .collect(),
        body: None,
        region: "cn-beijing",
        service: "iam",
        credentials: Credentials::new("AKTEST", "SKTEST"),
        host: "open.volcengineapi.com",
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn create_thing() -> Case {
    Case {
        method: "POST",
        query: params(json!({"Action": "CreateThing", "Version": "2020-04-01"})),
        headers: [("Content-Type", "application/json")].into_iter().collect(),
        body: Some(Body::Json(json!({"Name": "test", "Count": 2}))),
        region: "cn-beijing",
        service: "ecs",
        credentials: Credentials::new("AKTEST", "SKTEST").with_session_token("session-token"),
        host: "ecs.cn-beijing.volcengineapi.com",
        timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 45).unwrap(),
    }
}

#[test]
fn test_get_without_body() {
    let result = list_users().sign();

    assert_eq!(
        result.signature,
        "5721cd9f7a1361438a408d0584034e97138e744a29768afffa60eced61262a21"
    );
    assert_eq!(
        result.authorization,
        "HMAC-SHA256 Credential=AKTEST/20240101/cn-beijing/iam/request, \
         SignedHeaders=host;x-date, \
         Signature=5721cd9f7a1361438a408d0584034e97138e744a29768afffa60eced61262a21"
    );
    assert_eq!(result.headers.get("x-date"), Some("20240101T000000Z"));
    assert_eq!(result.headers.get("host"), Some("open.volcengineapi.com"));
    assert_eq!(
        result.headers.get("content-type"),
        Some("application/json; charset=utf-8")
    );
    assert!(!result.headers.contains("x-content-sha256"));
    assert!(!result.headers.contains("x-security-token"));
}

#[test]
fn test_post_with_json_body_and_token() {
    let result = create_thing().sign();

    assert_eq!(
        result.signature,
        "76289b1f0f4cc388b7fe2abcf4204ad7a9b6032a9d9398554e449cfe1351e1c1"
    );
    assert_eq!(
        result.headers.get("x-content-sha256"),
        Some("c1ee583c1fe73ddf6c40ecca413269481f0a15e5ff20c0457ce8b8645f87f505")
    );
    assert_eq!(result.headers.get("x-security-token"), Some("session-token"));
    assert!(result
        .authorization
        .contains("SignedHeaders=host;x-content-sha256;x-date;x-security-token,"));
}

#[test]
fn test_minimal_request() {
    let case = Case {
        method: "GET",
        query: params(json!({"foo": "bar"})),
        headers: Headers::new(),
        body: None,
        region: "cn-beijing",
        service: "test",
        credentials: Credentials::new("K", "S"),
        host: "example.com",
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    };
    assert_eq!(
        case.sign().signature,
        "68a3f4d920c7412214526d77699658337fbe794850822c193dbbf0c193491b6c"
    );
}

#[test]
fn test_secret_changes_signature() {
    let mut case = list_users();
    case.credentials = Credentials::new("AKTEST", "SKTEST2");
    assert_eq!(
        case.sign().signature,
        "967ad2d6390bd25059841b5b23e80f0354f5763963ed066687232bbbaebb1a9e"
    );
}

#[test]
fn test_lowercase_method_signs_like_uppercase() {
    let mut case = list_users();
    case.method = "get";
    assert_eq!(case.sign().signature, list_users().sign().signature);
}

#[test]
fn test_signed_header_value_changes_signature() {
    let mut case = list_users();
    case.headers.insert("X-Extra", "one");
    let first = case.sign();
    case.headers.insert("X-Extra", "two");
    let second = case.sign();
    assert_ne!(first.signature, second.signature);
}

#[test]
fn test_unsigned_header_does_not_change_signature() {
    let mut case = list_users();
    case.headers.insert("User-Agent", "volcstack-rust/0.1.0");
    assert_eq!(case.sign().signature, list_users().sign().signature);
}

#[test]
fn test_timestamp_changes_signature() {
    let mut case = list_users();
    case.timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
    assert_ne!(case.sign().signature, list_users().sign().signature);
}

proptest! {
    #[test]
    fn prop_signing_is_deterministic(
        key in "[A-Za-z0-9]{1,12}",
        value in "[ -~]{0,24}",
        secret in "[A-Za-z0-9]{1,32}",
    ) {
        let mut case = list_users();
        case.query.insert(key, Value::String(value));
        case.credentials = Credentials::new("AK", secret);
        prop_assert_eq!(case.sign(), case.sign());
    }

    #[test]
    fn prop_query_order_does_not_matter(
        entries in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 1..8),
    ) {
        let forward: Params = entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let reversed: Params = entries
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        prop_assert_eq!(canonical_query_string(&forward), canonical_query_string(&reversed));

        let mut a = list_users();
        a.query = forward;
        let mut b = list_users();
        b.query = reversed;
        prop_assert_eq!(a.sign().signature, b.sign().signature);
    }

    #[test]
    fn prop_header_order_does_not_matter(
        entries in proptest::collection::btree_map("x-[a-z]{1,8}", "[a-z0-9]{1,8}", 1..6),
    ) {
        let forward: Headers = entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let reversed: Headers = entries.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();

        let mut a = list_users();
        a.headers = forward;
        let mut b = list_users();
        b.headers = reversed;
        prop_assert_eq!(a.sign().signature, b.sign().signature);
    }
}
