//! The client: owns the default stack and sends commands through it.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use volcstack_config::{ClientConfig, DefaultEndpointResolver, EndpointResolver, EnvConfig};
use volcstack_core::{
    Body, CancellationToken, Clock, CredentialCache, DispatchAdapter, Request, RequestEnvelope,
    SdkError, SdkResult, SystemClock,
};
use volcstack_middleware::stages::{
    self, CredentialsMiddleware, DefaultHeadersMiddleware, DotNMiddleware, EndpointMiddleware,
    HttpRequestMiddleware, ProviderFactory, RetryMiddleware, SignerMiddleware,
};
use volcstack_middleware::{AddOptions, ExecutionContext, Middleware, MiddlewareStack};

use crate::command::Command;
use crate::dispatch::ReqwestDispatcher;
use crate::sts;

/// Name reported in the execution context when none is set.
pub const DEFAULT_CLIENT_NAME: &str = "Client";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Token that aborts the call, including pending retry backoffs.
    pub cancellation: Option<CancellationToken>,
    /// Per-call timeout, overriding the configured one.
    pub timeout: Option<Duration>,
}

impl SendOptions {
    /// Options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// API client.
///
/// Every call merges the client's stack with the command's stack, resolves
/// it against a fresh [`ExecutionContext`] and runs a new envelope through it.
/// The client itself is never mutated by a call, so one client can serve
/// concurrent calls.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use volcstack::{Client, ClientConfig, Command, SendOptions};
///
/// # async fn example() -> volcstack::SdkResult<()> {
/// let client = Client::new(
///     ClientConfig::builder()
///         .credentials("AK", "SK")
///         .region("cn-beijing")
///         .build(),
/// )?;
///
/// let command = Command::from_meta_path(
///     "DescribeInstancesCommand",
///     json!({"MaxResults": 10}),
///     "/DescribeInstances/2020-04-01/ecs/get//",
/// )?;
/// let output = client.send(&command, SendOptions::new()).await?;
/// println!("{output}");
/// # Ok(())
/// # }
/// ```
pub struct Client {
    name: String,
    config: Arc<ClientConfig>,
    stack: MiddlewareStack,
    dispatcher: Arc<dyn DispatchAdapter>,
}

impl Client {
    /// Creates a client with the default transport, clock and resolver.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid or the HTTP
    /// transport cannot be built.
    pub fn new(config: ClientConfig) -> SdkResult<Self> {
        Self::builder().config(config).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client name reported in the execution context.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration shared by every call.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The client-level stack.
    #[must_use]
    pub const fn middleware_stack(&self) -> &MiddlewareStack {
        &self.stack
    }

    /// Registers a client-level middleware.
    pub fn add_middleware(&mut self, middleware: impl Middleware, options: AddOptions) -> &mut Self {
        self.stack.add(middleware, options);
        self
    }

    /// Renders the stack a call with `command` would run.
    #[must_use]
    pub fn debug_middleware_stack(&self, command: &Command) -> String {
        self.stack.merge(command.middleware_stack()).to_string()
    }

    /// Sends `command` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage, after retries.
    pub async fn send(&self, command: &Command, options: SendOptions) -> SdkResult<Value> {
        let stack = self.stack.merge(command.middleware_stack());
        let content_type = command
            .request_config()
            .map(|config| config.content_type.clone())
            .unwrap_or_default();
        let context = ExecutionContext::new(&self.name, command.name(), Arc::clone(&self.config))
            .with_content_type(content_type);
        let chain = stack.resolve(|envelope| Box::pin(async move { Ok(envelope) }), context);

        let request = self.build_request(command, options);
        tracing::debug!(
            client = %self.name,
            command = command.name(),
            method = %request.method,
            "Sending command"
        );
        chain
            .call_for_body(RequestEnvelope::new(command.input().clone(), request))
            .await
    }

    /// Sends `command` and deserializes the response body.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus an exception if the body does not
    /// deserialize into `T`.
    pub async fn send_as<T: DeserializeOwned>(
        &self,
        command: &Command,
        options: SendOptions,
    ) -> SdkResult<T> {
        let body = self.send(command, options).await?;
        serde_json::from_value(body).map_err(|e| {
            SdkError::exception_with_source(format!("Failed to decode {} output", command.name()), e)
        })
    }

    /// Releases the transport's resources.
    pub fn destroy(&self) {
        self.dispatcher.destroy();
    }

    fn build_request(&self, command: &Command, options: SendOptions) -> Request {
        let mut request = Request::new();
        request.host.clone_from(&self.config.host);
        request.protocol = self.config.protocol;
        request.region = Some(self.config.region().to_string());
        request.cancellation = options.cancellation;
        request.timeout = options.timeout;

        let Some(config) = command.request_config() else {
            return request;
        };
        request.params.clone_from(&config.params);
        request.service_name.clone_from(&config.service_name);
        request.pathname.clone_from(&config.pathname);

        if let Some(method) = &config.method {
            request.method = method.clone();
            if *method == Method::POST {
                request.body = Some(Body::Json(command.input().clone()));
            } else if *method == Method::GET {
                let mut params = command.input().as_object().cloned().unwrap_or_default();
                params.extend(config.params.clone());
                request.params = params;
            }
        }
        request
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
///
/// Every collaborator is optional; the defaults are a [`ReqwestDispatcher`],
/// the [`SystemClock`], a fresh [`CredentialCache`], the built-in endpoint
/// registry and the process environment.
#[derive(Default)]
pub struct ClientBuilder {
    name: Option<String>,
    config: ClientConfig,
    dispatcher: Option<Arc<dyn DispatchAdapter>>,
    clock: Option<Arc<dyn Clock>>,
    credential_cache: Option<Arc<CredentialCache>>,
    endpoint_resolver: Option<Arc<dyn EndpointResolver>>,
    provider_factory: Option<ProviderFactory>,
    env: Option<EnvConfig>,
}

impl ClientBuilder {
    /// Sets the client name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `dispatcher` as the network transport.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<dyn DispatchAdapter>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Uses `clock` for signing timestamps, backoff sleeps and cache expiry.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Shares `cache` with other clients.
    #[must_use]
    pub fn credential_cache(mut self, cache: Arc<CredentialCache>) -> Self {
        self.credential_cache = Some(cache);
        self
    }

    /// Uses `resolver` to pick hosts.
    #[must_use]
    pub fn endpoint_resolver(mut self, resolver: Arc<dyn EndpointResolver>) -> Self {
        self.endpoint_resolver = Some(resolver);
        self
    }

    /// Uses `factory` to build role-assumption providers.
    #[must_use]
    pub fn provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.provider_factory = Some(factory);
        self
    }

    /// Uses `env` instead of reading the process environment.
    #[must_use]
    pub fn env(mut self, env: EnvConfig) -> Self {
        self.env = Some(env);
        self
    }

    /// Builds the client and installs the default stack.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid or the
    /// default transport cannot be built.
    pub fn build(self) -> SdkResult<Client> {
        self.config.validate()?;

        let env = self.env.unwrap_or_else(EnvConfig::from_env);
        let clock: Arc<dyn Clock> = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let dispatcher: Arc<dyn DispatchAdapter> = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => Arc::new(ReqwestDispatcher::new(
                &self.config.http,
                env.resolve_proxy(&self.config.http),
            )?),
        };
        let cache = self
            .credential_cache
            .unwrap_or_else(|| Arc::new(CredentialCache::new(Arc::clone(&clock))));
        let resolver: Arc<dyn EndpointResolver> = self
            .endpoint_resolver
            .unwrap_or_else(|| Arc::new(DefaultEndpointResolver::new(env.clone())));
        let provider_factory = self.provider_factory.unwrap_or_else(|| {
            sts::provider_factory(Arc::clone(&dispatcher), Arc::clone(&clock))
        });

        let mut stack = MiddlewareStack::new();
        stack
            .add(DefaultHeadersMiddleware::new(), stages::DEFAULT_HEADERS.options())
            .add(
                CredentialsMiddleware::new(cache, env.credentials, Some(provider_factory)),
                stages::CREDENTIALS.options(),
            )
            .add(EndpointMiddleware::new(resolver), stages::ENDPOINT.options())
            .add(DotNMiddleware::new(), stages::DOT_N.options())
            .add(SignerMiddleware::new(Arc::clone(&clock)), stages::SIGNER.options())
            .add(
                HttpRequestMiddleware::new(Arc::clone(&dispatcher)),
                stages::HTTP_REQUEST.options(),
            )
            .add(RetryMiddleware::new(clock), stages::RETRY.options());

        Ok(Client {
            name: self.name.unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            config: Arc::new(self.config),
            stack,
            dispatcher,
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
