//! Parameter flattening stage ("dotN").
//!
//! Query-style APIs expect nested structures as dotted keys:
//!
//! ```text
//! {"A": {"B": 1}, "C": 2}   ─►  {"A.B": 1, "C": 2}
//! {"A": [{"B": 1}]}         ─►  {"A.1.B": 1}
//! ```
//!
//! Array positions are 1-based. `GET` requests have their query parameters
//! flattened; form-encoded `POST` requests have both the parameters and the
//! body flattened.

use http::Method;
use serde_json::{Map, Value};
use volcstack_core::{Body, BoxFuture, Params, RequestEnvelope, SdkResult};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next};

/// Flattens nested objects and arrays in `input` into dotted keys.
///
/// When `restrict` is non-empty, only the listed top-level keys are
/// flattened; the rest are copied as they are. Scalars, including `null`,
/// are kept. The input is not modified.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use volcstack_middleware::stages::flatten_dot_n;
///
/// let input = json!({"Filter": [{"Name": "zone", "Values": ["a", "b"]}]});
/// let flat = flatten_dot_n(input.as_object().unwrap(), &[]);
///
/// assert_eq!(flat["Filter.1.Name"], "zone");
/// assert_eq!(flat["Filter.1.Values.2"], "b");
/// ```
#[must_use]
pub fn flatten_dot_n(input: &Map<String, Value>, restrict: &[String]) -> Map<String, Value> {
    let mut output = Map::new();
    for (key, value) in input {
        if restrict.is_empty() || restrict.contains(key) {
            flatten_into(&mut output, key.clone(), value);
        } else {
            output.insert(key.clone(), value.clone());
        }
    }
    output
}

fn flatten_into(output: &mut Map<String, Value>, prefix: String, value: &Value) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(output, format!("{prefix}.{}", index + 1), item);
            }
        }
        Value::Object(fields) => {
            for (key, field) in fields {
                flatten_into(output, format!("{prefix}.{key}"), field);
            }
        }
        scalar => {
            output.insert(prefix, scalar.clone());
        }
    }
}

/// Stage that flattens query parameters and form bodies.
#[derive(Debug, Clone, Default)]
pub struct DotNMiddleware {
    restrict: Vec<String>,
}

impl DotNMiddleware {
    /// Creates a stage that flattens every top-level key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stage that flattens only the listed top-level keys.
    #[must_use]
    pub fn restricted_to<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            restrict: keys.into_iter().map(Into::into).collect(),
        }
    }

    fn flatten_params(&self, params: &Params) -> Params {
        flatten_dot_n(params, &self.restrict)
    }
}

impl Middleware for DotNMiddleware {
    fn handle<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        mut envelope: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, SdkResult<RequestEnvelope>> {
        let request = &mut envelope.request;
        if request.method == Method::POST && ctx.is_form_encoded() {
            request.params = self.flatten_params(&request.params);
            if let Some(Body::Json(Value::Object(fields))) = &request.body {
                let flat = self.flatten_params(fields);
                request.body = Some(Body::Json(Value::Object(flat)));
            }
        }
        if request.method == Method::GET {
            request.params = self.flatten_params(&request.params);
        }
        next.run(ctx, envelope)
    }
}
