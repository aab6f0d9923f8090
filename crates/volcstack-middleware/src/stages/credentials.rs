//! Credentials stage.
//!
//! Resolves the credentials used to sign the call and stores them in the
//! envelope. The shared client configuration is never modified.
//!
//! ## Sources
//!
//! 1. **Assume role**: with `assume_role` configured, credentials come from the
//!    [`CredentialCache`], refreshed through the provider built by the
//!    [`ProviderFactory`] when missing or expired
//! 2. **Static keys**: otherwise the configured keys, each missing field filled
//!    from the environment
//!
//! When neither source yields a key, the envelope is left without credentials
//! and the signer stage does nothing.

use std::sync::Arc;

use volcstack_config::{AssumeRoleParams, EnvCredentials};
use volcstack_core::{
    BoxFuture, CredentialCache, CredentialProvider, Credentials, RequestEnvelope, SdkError,
    SdkResult,
};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next};

/// Builds the credential provider for a set of assume-role parameters.
pub type ProviderFactory =
    Arc<dyn Fn(&AssumeRoleParams) -> Arc<dyn CredentialProvider> + Send + Sync>;

/// Stage that resolves credentials into the envelope.
pub struct CredentialsMiddleware {
    cache: Arc<CredentialCache>,
    env: EnvCredentials,
    provider_factory: Option<ProviderFactory>,
}

impl CredentialsMiddleware {
    /// Creates the stage.
    ///
    /// `env` supplies fallback keys; `provider_factory` is required only for
    /// clients configured to assume a role.
    #[must_use]
    pub fn new(
        cache: Arc<CredentialCache>,
        env: EnvCredentials,
        provider_factory: Option<ProviderFactory>,
    ) -> Self {
        Self {
            cache,
            env,
            provider_factory,
        }
    }

    async fn assume_role(&self, params: &AssumeRoleParams) -> SdkResult<Credentials> {
        let factory = self.provider_factory.as_ref().ok_or_else(|| {
            SdkError::credentials("assume-role is configured but no credential provider is available")
        })?;
        let provider = factory(params);
        self.cache.get_or_refresh(&params.cache_key(), provider).await
    }

    fn static_credentials(&self, ctx: &ExecutionContext) -> Option<Credentials> {
        let config = &ctx.config;
        let access_key_id = config
            .access_key_id
            .clone()
            .or_else(|| self.env.access_key_id.clone());
        let secret_access_key = config
            .secret_access_key
            .clone()
            .or_else(|| self.env.secret_access_key.clone());
        let session_token = config
            .session_token
            .clone()
            .or_else(|| self.env.session_token.clone());

        if access_key_id.is_none() && secret_access_key.is_none() {
            return None;
        }

        Some(Credentials {
            access_key_id: access_key_id.unwrap_or_default(),
            secret_access_key: secret_access_key.unwrap_or_default(),
            session_token,
        })
    }
}

impl Middleware for CredentialsMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        mut envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        Box::pin(async move {
            let credentials = match &ctx.config.assume_role {
                Some(params) => {
                    tracing::debug!(role = %params.role_name, "Resolving assumed-role credentials");
                    Some(self.assume_role(params).await?)
                }
                None => self.static_credentials(ctx),
            };

            if credentials.is_none() {
                tracing::debug!(command = %ctx.command_name, "No credentials configured; request will be unsigned");
            }
            envelope.credentials = credentials;
            next.run(ctx, envelope).await
        })
    }
}

impl std::fmt::Debug for CredentialsMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsMiddleware")
            .field("cache", &self.cache)
            .field("env", &self.env)
            .field("provider_factory", &self.provider_factory.is_some())
            .finish()
    }
}
