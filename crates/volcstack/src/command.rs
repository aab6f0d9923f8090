//! Commands: one API operation with its input and local middleware.

use http::Method;
use serde_json::{json, Value};
use volcstack_core::{Params, SdkError, SdkResult};
use volcstack_middleware::{AddOptions, Middleware, MiddlewareStack};

/// Where and how a command is sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    /// Fixed query parameters, typically `Action` and `Version`.
    pub params: Params,
    /// HTTP method. `POST` sends the input as the body, `GET` as query parameters.
    pub method: Option<Method>,
    /// Signing service name.
    pub service_name: Option<String>,
    /// Request path.
    pub pathname: Option<String>,
    /// Declared content type; empty means the client default.
    pub content_type: String,
}

impl RequestConfig {
    /// Builds the request configuration described by `meta`.
    #[must_use]
    pub fn from_meta(meta: &MetaPath) -> Self {
        let mut params = Params::new();
        params.insert("Action".into(), json!(meta.action));
        params.insert("Version".into(), json!(meta.version));
        Self {
            params,
            method: Some(meta.method.clone()),
            service_name: Some(meta.service_name.clone()),
            pathname: None,
            content_type: meta.content_type.clone(),
        }
    }

    /// Parses `meta_path` and builds the request configuration it describes.
    ///
    /// # Errors
    ///
    /// See [`MetaPath::parse`].
    pub fn from_meta_path(meta_path: &str) -> SdkResult<Self> {
        MetaPath::parse(meta_path).map(|meta| Self::from_meta(&meta))
    }
}

/// An operation descriptor of the form
/// `/<Action>/<Version>/<service>/<method>/<content_type>/`.
///
/// The method is upper-cased and `_` in the content type stands for `/`. A
/// path ending in `//` declares an empty content type.
///
/// # Example
///
/// ```
/// use volcstack::MetaPath;
///
/// let meta = MetaPath::parse("/RunInstances/2020-04-01/ecs/post/application_json/").unwrap();
/// assert_eq!(meta.method, http::Method::POST);
/// assert_eq!(meta.content_type, "application/json");
///
/// let meta = MetaPath::parse("/DescribeZones/2020-04-01/ecs/get//").unwrap();
/// assert_eq!(meta.content_type, "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaPath {
    /// API action.
    pub action: String,
    /// API version.
    pub version: String,
    /// Service name.
    pub service_name: String,
    /// HTTP method.
    pub method: Method,
    /// Content type.
    pub content_type: String,
}

impl MetaPath {
    /// Parses a meta path.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless the path has exactly five
    /// segments and a valid method.
    pub fn parse(meta_path: &str) -> SdkResult<Self> {
        let invalid = || {
            SdkError::config(format!(
                "Invalid metaPath format: {meta_path}. Expected format: /Action/Version/serviceName/method/contentType/"
            ))
        };

        let mut parts: Vec<&str> = meta_path
            .trim_start_matches('/')
            .split('/')
            .filter(|part| !part.is_empty())
            .collect();
        if meta_path.ends_with("//") && parts.len() == 4 {
            parts.push("");
        }

        let [action, version, service_name, method, content_type] = parts[..] else {
            return Err(invalid());
        };
        let method = Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|_| invalid())?;

        Ok(Self {
            action: action.to_string(),
            version: version.to_string(),
            service_name: service_name.to_string(),
            method,
            content_type: content_type.replace('_', "/"),
        })
    }
}

/// A single API call: a name, an input payload, command-local middleware and
/// the request configuration.
#[derive(Debug)]
pub struct Command {
    name: String,
    input: Value,
    middleware_stack: MiddlewareStack,
    request_config: Option<RequestConfig>,
}

impl Command {
    /// Creates a command without request configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, input: Value) -> Self {
        Self {
            name: name.into(),
            input,
            middleware_stack: MiddlewareStack::new(),
            request_config: None,
        }
    }

    /// Creates a command configured from a meta path.
    ///
    /// # Errors
    ///
    /// See [`MetaPath::parse`].
    pub fn from_meta_path(
        name: impl Into<String>,
        input: Value,
        meta_path: &str,
    ) -> SdkResult<Self> {
        let config = RequestConfig::from_meta_path(meta_path)?;
        Ok(Self::new(name, input).with_request_config(config))
    }

    /// Sets the request configuration.
    #[must_use]
    pub fn with_request_config(mut self, config: RequestConfig) -> Self {
        self.request_config = Some(config);
        self
    }

    /// Command name, used as the context's command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input payload.
    #[must_use]
    pub const fn input(&self) -> &Value {
        &self.input
    }

    /// Request configuration, if any.
    #[must_use]
    pub const fn request_config(&self) -> Option<&RequestConfig> {
        self.request_config.as_ref()
    }

    /// Command-local middleware.
    #[must_use]
    pub const fn middleware_stack(&self) -> &MiddlewareStack {
        &self.middleware_stack
    }

    /// Registers a command-local middleware.
    pub fn add_middleware(&mut self, middleware: impl Middleware, options: AddOptions) -> &mut Self {
        self.middleware_stack.add(middleware, options);
        self
    }

    /// Renders the command-local stack.
    #[must_use]
    pub fn debug_middleware_stack(&self) -> String {
        self.middleware_stack.to_string()
    }
}
