//! Shared type aliases.

use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Query parameters or form fields, in insertion order.
pub type Params = serde_json::Map<String, serde_json::Value>;
