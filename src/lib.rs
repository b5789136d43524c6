//! # Vecbridge
//!
//! Entity-to-point mapping layer for vector index backends.
//!
//! Vecbridge translates a schema-agnostic "entity with named fields" model
//! into the `(id, vector, payload)` points a vector index stores, and back.
//!
//! ## Features
//!
//! - Identifier coercion into the backend id domain (unsigned integers or opaque strings)
//! - Vector/payload separation on write with a default vector for vectorless entities
//! - Entity reconstruction on read and search
//! - Pluggable backends (in-memory, file-persisted, Qdrant-compatible REST)
//!
//! ## Example
//!
//! ```rust,ignore
//! use vecbridge::{ConnType, ConnectionParams, Connector, Distance, IndexConfig};
//!
//! let params = ConnectionParams::new(ConnType::Memory, "");
//! let connector = Connector::new(&params, Vec::new())?;
//! connector.create_index(IndexConfig::new("docs", 384, Distance::Cosine))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

pub mod config;
pub mod connector;
pub mod models;
pub mod observability;
pub mod storage;

pub use config::{ConnType, ConnectionParams, VecbridgeConfig};
pub use connector::{
    Connector, ConnectorOptions, SearchResultLayout, coerce_object_id, prepare_search_results,
};
pub use models::{
    CollectionDescription, Distance, Entity, EntityData, EntityId, EntityRef, Field, FieldData,
    FieldValue, IndexConfig, IndexConfigData, Payload, PayloadFilter, Point, PointId, Record,
    ScoredPoint, SearchRequest, VectorParams,
};
pub use storage::{InMemoryBackend, PointBackend, RestBackend};

/// Error type for vecbridge operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Configuration` | Index config lacks `size`/`distance`, bad config file, logging re-init |
/// | `NotFound` | Dropping an unregistered index, reading a missing point, no active collection |
/// | `Backend` | Any failure reported by the vector backend (connection, HTTP, bad request) |
/// | `InvalidInput` | A `"vector"` field holds a non-vector value, unsupported id or payload value |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested index, collection, or point does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The vector backend reported a failure.
    ///
    /// Raised when:
    /// - The backend cannot be reached
    /// - The backend rejects a request (unknown collection, malformed query)
    /// - A snapshot file cannot be read or written
    #[error("backend operation '{operation}' failed: {cause}")]
    Backend {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Builds a [`Error::Backend`] from an operation name and any displayable cause.
    pub(crate) fn backend(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for vecbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Configuration("missing size".to_string());
        assert_eq!(err.to_string(), "configuration error: missing size");

        let err = Error::NotFound("index 'a'".to_string());
        assert_eq!(err.to_string(), "not found: index 'a'");

        let err = Error::backend("upsert", "connection refused");
        assert_eq!(
            err.to_string(),
            "backend operation 'upsert' failed: connection refused"
        );
    }
}
