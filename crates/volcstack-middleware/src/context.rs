//! Per-call execution context.
//!
//! An [`ExecutionContext`] is built once per `send` and handed by reference to
//! every stage. Stages read it; they never mutate it. Anything a stage needs to
//! pass downstream goes into the [`RequestEnvelope`](volcstack_core::RequestEnvelope).

use std::sync::Arc;

use volcstack_config::ClientConfig;

/// Content type used when a command does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Immutable metadata for one API call.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Name of the client issuing the call.
    pub client_name: String,
    /// Name of the command being executed.
    pub command_name: String,
    /// Client configuration in effect for the call.
    pub config: Arc<ClientConfig>,
    /// Content type negotiated for the call; empty when the command declares none.
    pub content_type: String,
}

impl ExecutionContext {
    /// Creates a context with an empty content type.
    #[must_use]
    pub fn new(
        client_name: impl Into<String>,
        command_name: impl Into<String>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            command_name: command_name.into(),
            config,
            content_type: String::new(),
        }
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Returns the content type, or [`DEFAULT_CONTENT_TYPE`] when none was declared.
    #[must_use]
    pub fn effective_content_type(&self) -> &str {
        if self.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &self.content_type
        }
    }

    /// Returns true if the call uses `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn is_form_encoded(&self) -> bool {
        self.content_type
            .eq_ignore_ascii_case(crate::stages::FORM_CONTENT_TYPE)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new("", "", Arc::new(ClientConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_content_type() {
        let ctx = ExecutionContext::default();
        assert_eq!(ctx.effective_content_type(), DEFAULT_CONTENT_TYPE);

        let ctx = ctx.with_content_type("application/x-www-form-urlencoded");
        assert_eq!(ctx.effective_content_type(), "application/x-www-form-urlencoded");
        assert!(ctx.is_form_encoded());
    }

    #[test]
    fn test_names() {
        let ctx = ExecutionContext::new("EcsClient", "DescribeInstances", Arc::default());
        assert_eq!(ctx.client_name, "EcsClient");
        assert_eq!(ctx.command_name, "DescribeInstances");
        assert!(!ctx.is_form_encoded());
    }
}
