//! Index (collection) configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Distance metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distance {
    /// Dot product (higher is closer).
    #[serde(alias = "dot", alias = "DOT")]
    Dot,
    /// Cosine similarity (higher is closer).
    #[serde(alias = "cosine", alias = "COSINE")]
    Cosine,
    /// Euclidean distance (lower is closer).
    #[serde(alias = "euclid", alias = "euclidean", alias = "EUCLID")]
    Euclid,
    /// Manhattan distance (lower is closer).
    #[serde(alias = "manhattan", alias = "MANHATTAN")]
    Manhattan,
}

impl Distance {
    /// Returns the metric in the backend's wire form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dot => "Dot",
            Self::Cosine => "Cosine",
            Self::Euclid => "Euclid",
            Self::Manhattan => "Manhattan",
        }
    }

    /// Returns true if larger scores mean closer points.
    #[must_use]
    pub const fn higher_is_better(&self) -> bool {
        matches!(self, Self::Dot | Self::Cosine)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "cosine" => Ok(Self::Cosine),
            "euclid" | "euclidean" => Ok(Self::Euclid),
            "manhattan" => Ok(Self::Manhattan),
            other => Err(Error::Configuration(format!(
                "unknown distance metric '{other}'"
            ))),
        }
    }
}

/// Vector parameters required to create a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorParams {
    /// Vector dimensionality.
    pub size: u64,
    /// Distance metric.
    pub distance: Distance,
}

/// Backend-specific configuration of an index.
///
/// Only `size` and `distance` are consumed by index creation. Anything else
/// is kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfigData {
    /// Vector dimensionality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Distance metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    /// Additional backend-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A named index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index (collection) name.
    #[serde(alias = "name")]
    pub index_name: String,
    /// Configuration data.
    #[serde(flatten)]
    pub config_data: IndexConfigData,
}

impl IndexConfig {
    /// Creates a complete index configuration.
    #[must_use]
    pub fn new(index_name: impl Into<String>, size: u64, distance: Distance) -> Self {
        Self {
            index_name: index_name.into(),
            config_data: IndexConfigData {
                size: Some(size),
                distance: Some(distance),
                extra: BTreeMap::new(),
            },
        }
    }

    /// Builds a configuration from an open key/value bag.
    ///
    /// `size` must be a non-negative integer and `distance` a metric name
    /// when present. Missing keys are allowed here and reported by
    /// [`vector_params`](Self::vector_params).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `size` or `distance` is ill-typed.
    pub fn from_config_data(
        index_name: impl Into<String>,
        mut config_data: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let index_name = index_name.into();

        let size = match config_data.remove("size") {
            None => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                Error::Configuration(format!(
                    "index '{index_name}': size must be a non-negative integer, got {value}"
                ))
            })?),
        };

        let distance = match config_data.remove("distance") {
            None => None,
            Some(serde_json::Value::String(s)) => Some(s.parse::<Distance>()?),
            Some(value) => {
                return Err(Error::Configuration(format!(
                    "index '{index_name}': distance must be a string, got {value}"
                )));
            },
        };

        Ok(Self {
            index_name,
            config_data: IndexConfigData {
                size,
                distance,
                extra: config_data.into_iter().collect(),
            },
        })
    }

    /// Adds a backend-specific key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config_data.extra.insert(key.into(), value);
        self
    }

    /// Returns the vector parameters needed to create the collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `size` or `distance` is missing.
    pub fn vector_params(&self) -> Result<VectorParams> {
        let size = self.config_data.size.ok_or_else(|| {
            Error::Configuration(format!("index '{}' is missing 'size'", self.index_name))
        })?;
        let distance = self.config_data.distance.ok_or_else(|| {
            Error::Configuration(format!(
                "index '{}' is missing 'distance'",
                self.index_name
            ))
        })?;
        Ok(VectorParams { size, distance })
    }
}
