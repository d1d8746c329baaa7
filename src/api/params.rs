//! Request parameters
//!
//! Every typed argument of an operation maps to exactly one named parameter.
//! Optional arguments that are `None` are left out entirely.

use std::fmt::Display;

/// Ordered list of named request parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter
    pub fn with(mut self, name: &str, value: impl Display) -> Self {
        self.pairs.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a parameter only when a value is present
    pub fn with_opt<V: Display>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs in the shape reqwest's `query()` and `form()` expect
    pub(crate) fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}
