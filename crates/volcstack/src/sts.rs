//! Temporary credentials through STS role assumption.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use volcstack_config::{AssumeRoleParams, ClientConfig, EnvConfig, DEFAULT_REGION};
use volcstack_core::{
    BoxFuture, Clock, CredentialProvider, Credentials, DispatchAdapter, ExpiringCredentials,
    SdkError, SdkResult,
};
use volcstack_middleware::stages::ProviderFactory;

use crate::client::{Client, SendOptions};
use crate::command::{Command, RequestConfig};

/// Default STS host.
pub const STS_HOST: &str = "sts.volcengineapi.com";

/// STS API version.
pub const STS_VERSION: &str = "2018-01-01";

/// Lifetime requested when none is configured.
pub const DEFAULT_DURATION_SECONDS: u64 = 3600;

/// Credentials are treated as expired this long before the reported expiry.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

const STS_CLIENT_NAME: &str = "STSClient";
const ASSUME_ROLE_COMMAND: &str = "AssumeRoleCommand";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleOutput {
    result: AssumeRoleResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: StsCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsCredentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    session_token: Option<String>,
    #[serde(default)]
    expired_time: Option<String>,
}

/// Credential provider that calls `AssumeRole` with the principal's static
/// keys.
///
/// Each fetch sends one signed `GET` to STS through its own client, sharing
/// the outer client's transport and clock. A random session name is used
/// per fetch.
#[derive(Clone)]
pub struct AssumeRoleProvider {
    params: AssumeRoleParams,
    dispatcher: Arc<dyn DispatchAdapter>,
    clock: Arc<dyn Clock>,
}

impl AssumeRoleProvider {
    /// Creates a provider for `params`.
    #[must_use]
    pub fn new(
        params: AssumeRoleParams,
        dispatcher: Arc<dyn DispatchAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            params,
            dispatcher,
            clock,
        }
    }

    fn client(&self) -> SdkResult<Client> {
        let params = &self.params;
        let mut config = ClientConfig::builder()
            .region(params.region.as_deref().unwrap_or(DEFAULT_REGION))
            .credentials(&params.access_key_id, &params.secret_access_key)
            .host(params.host.as_deref().unwrap_or(STS_HOST));
        if let Some(protocol) = params.protocol {
            config = config.protocol(protocol);
        }

        Client::builder()
            .name(STS_CLIENT_NAME)
            .config(config.build())
            .dispatcher(Arc::clone(&self.dispatcher))
            .clock(Arc::clone(&self.clock))
            .env(EnvConfig::default())
            .build()
    }

    /// Requested session lifetime; zero falls back to the default.
    fn duration_seconds(&self) -> u64 {
        self.params
            .duration_seconds
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_DURATION_SECONDS)
    }

    fn command(&self) -> Command {
        let params = &self.params;
        let mut input = Map::new();
        input.insert(
            "DurationSeconds".into(),
            json!(self.duration_seconds()),
        );
        input.insert("RoleTrn".into(), json!(params.role_trn()));
        input.insert(
            "RoleSessionName".into(),
            json!(uuid::Uuid::new_v4().to_string()),
        );
        if let Some(policy) = &params.policy {
            input.insert("Policy".into(), json!(policy));
        }
        if !params.tags.is_empty() {
            let tags: Vec<Value> = params
                .tags
                .iter()
                .map(|tag| json!({"Key": tag.key, "Value": tag.value}))
                .collect();
            input.insert("Tags".into(), Value::Array(tags));
        }

        let mut request_params = Map::new();
        request_params.insert("Action".into(), json!("AssumeRole"));
        request_params.insert("Version".into(), json!(STS_VERSION));

        Command::new(ASSUME_ROLE_COMMAND, Value::Object(input)).with_request_config(RequestConfig {
            params: request_params,
            method: Some(http::Method::GET),
            service_name: Some("sts".to_string()),
            pathname: None,
            content_type: String::new(),
        })
    }

    async fn assume_role(self) -> SdkResult<ExpiringCredentials> {
        let client = self.client()?;
        tracing::debug!(role = %self.params.role_trn(), "Assuming role");

        let output: AssumeRoleOutput = client.send_as(&self.command(), SendOptions::new()).await?;
        let sts = output.result.credentials;

        let expires_at = self.expires_at(sts.expired_time.as_deref());
        let mut credentials = Credentials::new(sts.access_key_id, sts.secret_access_key);
        if let Some(token) = sts.session_token {
            credentials = credentials.with_session_token(token);
        }
        if !credentials.is_complete() {
            return Err(SdkError::credentials(
                "AssumeRole response is missing AccessKeyId or SecretAccessKey",
            ));
        }

        Ok(ExpiringCredentials {
            credentials,
            expires_at,
        })
    }

    fn expires_at(&self, expired_time: Option<&str>) -> DateTime<Utc> {
        let margin = TimeDelta::seconds(EXPIRY_MARGIN_SECONDS);
        if let Some(parsed) = expired_time.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) {
            return parsed.with_timezone(&Utc) - margin;
        }
        let duration = self.duration_seconds();
        let lifetime = i64::try_from(duration)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let now = self.clock.now();
        now.checked_add_signed(lifetime - margin).unwrap_or(now)
    }
}

impl CredentialProvider for AssumeRoleProvider {
    fn fetch(&self) -> BoxFuture<'static, SdkResult<ExpiringCredentials>> {
        Box::pin(self.clone().assume_role())
    }
}

impl std::fmt::Debug for AssumeRoleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssumeRoleProvider")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Returns a factory that builds an [`AssumeRoleProvider`] over `dispatcher`
/// and `clock`.
#[must_use]
pub fn provider_factory(dispatcher: Arc<dyn DispatchAdapter>, clock: Arc<dyn Clock>) -> ProviderFactory {
    Arc::new(move |params: &AssumeRoleParams| -> Arc<dyn CredentialProvider> {
        Arc::new(AssumeRoleProvider::new(
            params.clone(),
            Arc::clone(&dispatcher),
            Arc::clone(&clock),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use volcstack_config::AssumeRoleTag;
    use volcstack_core::ErrorKind;
    use volcstack_test::{fixtures, MockClock, MockDispatcher};

    fn params() -> AssumeRoleParams {
        AssumeRoleParams::new("AKprincipal", "SKprincipal", "2100000000", "deployer")
    }

    fn provider(params: AssumeRoleParams) -> (AssumeRoleProvider, Arc<MockDispatcher>, MockClock) {
        let dispatcher = Arc::new(MockDispatcher::new());
        let clock = MockClock::new();
        let provider = AssumeRoleProvider::new(params, dispatcher.clone(), Arc::new(clock.clone()));
        (provider, dispatcher, clock)
    }

    fn sts_reply(expired_time: &str) -> Value {
        json!({
            "ResponseMetadata": {"RequestId": "req-sts", "Action": "AssumeRole"},
            "Result": {
                "Credentials": {
                    "AccessKeyId": "AKTMP",
                    "SecretAccessKey": "SKTMP",
                    "SessionToken": "token-1",
                    "ExpiredTime": expired_time,
                },
            },
        })
    }

    #[tokio::test]
    async fn test_fetch_parses_credentials() {
        let (provider, dispatcher, _clock) = provider(params());
        dispatcher.push_response(fixtures::json_ok(sts_reply("2024-01-01T01:00:00Z")));

        let fetched = provider.fetch().await.unwrap();
        assert_eq!(fetched.credentials.access_key_id, "AKTMP");
        assert_eq!(fetched.credentials.session_token.as_deref(), Some("token-1"));
        assert_eq!(
            fetched.expires_at,
            DateTime::parse_from_rfc3339("2024-01-01T00:59:00Z").unwrap()
        );

        let sent = dispatcher.last_request().unwrap();
        assert!(sent.url.starts_with("https://sts.volcengineapi.com/?"));
        assert!(sent.url.contains("Action=AssumeRole"));
        assert!(sent.url.contains("Version=2018-01-01"));
        assert!(sent.url.contains("DurationSeconds=3600"));
        assert!(sent.url.contains("RoleTrn=trn%3Aiam%3A%3A2100000000%3Arole%2Fdeployer"));
        assert!(sent.url.contains("RoleSessionName="));
        let authorization = sent.headers.get("Authorization").unwrap();
        assert!(authorization.contains("Credential=AKprincipal/20240101/cn-beijing/sts/request"));
    }

    #[tokio::test]
    async fn test_overrides_and_tags() {
        let mut params = params();
        params.host = Some("sts.internal.example".into());
        params.region = Some("ap-southeast-1".into());
        params.duration_seconds = Some(900);
        params.policy = Some("{}".into());
        params.tags = vec![AssumeRoleTag {
            key: "team".into(),
            value: "infra".into(),
        }];
        let (provider, dispatcher, _clock) = provider(params);
        dispatcher.push_response(fixtures::json_ok(sts_reply("2024-01-01T00:15:00Z")));

        provider.fetch().await.unwrap();

        let sent = dispatcher.last_request().unwrap();
        assert!(sent.url.starts_with("https://sts.internal.example/?"));
        assert!(sent.url.contains("DurationSeconds=900"));
        assert!(sent.url.contains("Policy=%7B%7D"));
        assert!(sent.url.contains("Tags.1.Key=team"));
        assert!(sent.url.contains("Tags.1.Value=infra"));
        assert!(sent.headers.get("Authorization").unwrap().contains("/ap-southeast-1/sts/request"));
    }

    #[tokio::test]
    async fn test_unparseable_expiry_uses_duration() {
        let (provider, dispatcher, clock) = provider(params());
        dispatcher.push_response(fixtures::json_ok(sts_reply("soon")));

        let fetched = provider.fetch().await.unwrap();
        assert_eq!(fetched.expires_at, clock.now() + TimeDelta::seconds(3540));
    }

    #[tokio::test]
    async fn test_zero_duration_uses_default() {
        let mut params = params();
        params.duration_seconds = Some(0);
        let (provider, dispatcher, clock) = provider(params);
        dispatcher.push_response(fixtures::json_ok(sts_reply("soon")));

        let fetched = provider.fetch().await.unwrap();
        let sent = dispatcher.last_request().unwrap();
        assert!(sent.url.contains("DurationSeconds=3600"));
        assert_eq!(fetched.expires_at, clock.now() + TimeDelta::seconds(3540));
    }

    #[tokio::test]
    async fn test_api_error_is_propagated() {
        let (provider, dispatcher, _clock) = provider(params());
        dispatcher.push_response(fixtures::api_error("NoPermission", "denied", "req-1"));

        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiException);
        assert_eq!(dispatcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_result_is_an_exception() {
        let (provider, dispatcher, _clock) = provider(params());
        dispatcher.push_response(fixtures::json_ok(json!({"Result": {}})));

        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exception);
    }

    #[test]
    fn test_factory_builds_providers() {
        let dispatcher: Arc<dyn DispatchAdapter> = Arc::new(MockDispatcher::new());
        let factory = provider_factory(dispatcher, Arc::new(MockClock::new()));
        let provider = factory(&params());
        drop(provider);
    }
}
