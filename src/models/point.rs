//! Backend point types.
//!
//! A point is the storage unit of a vector index: an identifier, a dense
//! vector, and a flat payload record. These types are the vocabulary of the
//! [`PointBackend`](crate::storage::PointBackend) trait.

use super::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat key/value record attached to a point, excluding the vector.
pub type Payload = BTreeMap<String, FieldValue>;

/// Backend point identifier.
///
/// The backend accepts unsigned integers or opaque (UUID-shaped) strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    /// Numeric identifier.
    Num(u64),
    /// Opaque string identifier.
    Str(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// A stored point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Point identifier.
    pub id: PointId,
    /// Dense vector.
    pub vector: Vec<f32>,
    /// Payload record.
    #[serde(default)]
    pub payload: Payload,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(id: PointId, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id,
            vector,
            payload,
        }
    }
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Point identifier.
    pub id: PointId,
    /// Similarity (dot, cosine) or distance (euclid, manhattan).
    pub score: f32,
    /// Payload, when requested.
    #[serde(default)]
    pub payload: Option<Payload>,
    /// Vector, when requested.
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

/// A point as returned by scrolling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Point identifier.
    pub id: PointId,
    /// Payload, when requested.
    #[serde(default)]
    pub payload: Option<Payload>,
    /// Vector, when requested.
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

/// Single equality condition on a payload key.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadFilter {
    /// Payload key to match.
    pub key: String,
    /// Value the key must equal.
    pub value: FieldValue,
}

impl PayloadFilter {
    /// Creates an equality condition.
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns true if the payload satisfies the condition.
    #[must_use]
    pub fn matches(&self, payload: &Payload) -> bool {
        payload.get(&self.key) == Some(&self.value)
    }
}

/// Nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Query vector.
    pub vector: Vec<f32>,
    /// Optional payload filter.
    pub filter: Option<PayloadFilter>,
    /// Maximum number of hits.
    pub limit: usize,
    /// Whether hits carry their payload.
    pub with_payload: bool,
    /// Whether hits carry their vector.
    pub with_vector: bool,
}

impl SearchRequest {
    /// Creates an unfiltered query that returns payloads.
    #[must_use]
    pub const fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            filter: None,
            limit,
            with_payload: true,
            with_vector: false,
        }
    }

    /// Sets whether hits carry their vector.
    #[must_use]
    pub const fn with_vector(mut self, with_vector: bool) -> Self {
        self.with_vector = with_vector;
        self
    }

    /// Adds a payload filter.
    #[must_use]
    pub fn with_filter(mut self, filter: PayloadFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Entry in the backend's collection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescription {
    /// Collection name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_untagged() {
        let ids: Vec<PointId> =
            serde_json::from_str(r#"[7, "5c56c793-69f3-4fbf-87e6-c4bf54c28c26"]"#)
                .expect("parse");
        assert_eq!(ids[0], PointId::Num(7));
        assert_eq!(
            ids[1],
            PointId::Str("5c56c793-69f3-4fbf-87e6-c4bf54c28c26".to_string())
        );
        assert_eq!(ids[0].to_string(), "7");
    }

    #[test]
    fn test_payload_filter_matches() {
        let mut payload = Payload::new();
        payload.insert("lang".to_string(), FieldValue::from("rust"));

        assert!(PayloadFilter::equals("lang", "rust").matches(&payload));
        assert!(!PayloadFilter::equals("lang", "go").matches(&payload));
        assert!(!PayloadFilter::equals("missing", "rust").matches(&payload));
    }
}
