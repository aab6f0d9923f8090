//! Ordered header map.
//!
//! Header values are optional: a header may be present with no value, which
//! the signing engine rejects when the header is part of the signature.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An insertion-ordered map of header names to optional values.
///
/// Names are stored as given; use [`Headers::to_lowercase_names`] to obtain
/// a canonicalized copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(IndexMap<String, Option<String>>);

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Inserts a header, replacing any existing value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), Some(value.into()));
    }

    /// Inserts a header with no value.
    pub fn insert_empty(&mut self, name: impl Into<String>) {
        self.0.insert(name.into(), None);
    }

    /// Returns the value stored under exactly `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Option::as_deref)
    }

    /// Returns the first value whose name matches `name` case-insensitively.
    #[must_use]
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns true if a header named exactly `name` exists, with or without a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Removes a header, preserving the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        self.0.shift_remove(name)
    }

    /// Iterates over all headers, including those without a value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Iterates over headers that carry a value.
    pub fn iter_present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    /// Returns a copy with every name lower-cased.
    ///
    /// When two names collide after lower-casing, the later one wins.
    #[must_use]
    pub fn to_lowercase_names(&self) -> Self {
        let mut out = IndexMap::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            out.insert(key.to_ascii_lowercase(), value.clone());
        }
        Self(out)
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}
