//! Tag-based instance selection.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Errors building a [`SelectionPredicate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PredicateError {
    /// No key/value pair was supplied.
    #[error("selection predicate needs at least one tag key/value pair")]
    Empty,

    /// A tag key was blank.
    #[error("tag key cannot be empty")]
    EmptyKey,

    /// The JSON selector could not be parsed.
    #[error("invalid tag selector JSON: {0}")]
    InvalidJson(String),
}

/// Tag key/value pairs an instance must carry to belong to the pool.
///
/// All pairs must match (logical AND). An instance without one of the keys
/// is a non-match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPredicate {
    pairs: BTreeMap<String, String>,
}

impl SelectionPredicate {
    /// Predicate with a single tag key/value pair.
    pub fn single(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, PredicateError> {
        Self::from_pairs([(key.into(), value.into())])
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, PredicateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in pairs {
            let key: String = key.into();
            if key.trim().is_empty() {
                return Err(PredicateError::EmptyKey);
            }
            map.insert(key, value.into());
        }

        if map.is_empty() {
            return Err(PredicateError::Empty);
        }

        Ok(Self { pairs: map })
    }

    /// Parse a selector of the form `{"key": "value", ...}`.
    pub fn from_json(raw: &str) -> Result<Self, PredicateError> {
        let parsed: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(raw).map_err(|e| PredicateError::InvalidJson(e.to_string()))?;

        let mut pairs = Vec::with_capacity(parsed.len());
        for (key, value) in parsed {
            let serde_json::Value::String(value) = value else {
                return Err(PredicateError::InvalidJson(format!(
                    "value for tag '{key}' must be a string"
                )));
            };
            pairs.push((key, value));
        }

        Self::from_pairs(pairs)
    }

    /// Returns true if every pair is present in `tags` with an equal value.
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        self.pairs
            .iter()
            .all(|(key, value)| tags.get(key) == Some(value))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for SelectionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for SelectionPredicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}
