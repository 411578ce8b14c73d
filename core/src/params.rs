//! Ordered path and query parameters.
//!
//! Parameters keep the order the caller supplied them in, because that
//! order is observable: path params become path segments in order, and
//! query params are joined in order. A value can be present, explicitly
//! null, or omitted; the three shapes render differently (see
//! [`crate::url`]).

use serde::{Deserialize, Serialize};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A textual value, rendered as-is.
    Text(String),
    /// An integer value.
    Int(i64),
    /// A boolean value, rendered as `true`/`false`.
    Bool(bool),
    /// An explicit null. Skipped in path segments, rendered as the
    /// literal `null` in query strings.
    Null,
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// An ordered collection of named parameter values.
///
/// `None` entries model values the caller listed but left undefined; they
/// are skipped wherever the collection is rendered.
///
/// # Example
///
/// ```
/// use lastcall_core::Params;
///
/// let query = Params::new()
///     .set("q", "rust")
///     .set("page", 2)
///     .omit("cursor");
/// assert_eq!(query.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    entries: Vec<(String, Option<ParamValue>)>,
}

impl Params {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a present value.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.entries.push((key.into(), Some(value.into())));
        self
    }

    /// Append an omitted value: the key is listed but renders nowhere.
    #[must_use]
    pub fn omit(mut self, key: impl Into<String>) -> Self {
        self.entries.push((key.into(), None));
        self
    }

    /// Append a present value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push((key.into(), Some(value.into())));
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParamValue>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    /// Number of entries, omitted ones included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection has no entries at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_render_like_their_scalars() {
        assert_eq!(ParamValue::from("a").to_string(), "a");
        assert_eq!(ParamValue::from(5).to_string(), "5");
        assert_eq!(ParamValue::from(true).to_string(), "true");
        assert_eq!(ParamValue::Null.to_string(), "null");
    }

    #[test]
    fn entries_keep_insertion_order() {
        let params = Params::new().set("b", 1).omit("a").set("c", 2);
        let keys: Vec<&str> = params.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn omitted_entries_count_but_carry_no_value() {
        let params = Params::new().omit("cursor");
        assert_eq!(params.len(), 1);
        assert!(params.iter().all(|(_, value)| value.is_none()));
    }
}
