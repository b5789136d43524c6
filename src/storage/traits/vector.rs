//! Point backend trait.
//!
//! Provides the abstraction layer over vector-index engines that store points
//! as `(id, vector, payload)` tuples.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Target |
//! |---------|----------|--------|
//! | `InMemoryBackend` | Tests, embedded use | `:memory:` |
//! | `InMemoryBackend` (persisted) | Local single-process use | filesystem path |
//! | `RestBackend` | Qdrant-compatible server | `http://` / `https://` URL |
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use vecbridge::storage::{InMemoryBackend, PointBackend};
//! use vecbridge::{Distance, Point, PointId, SearchRequest, VectorParams};
//!
//! let backend = InMemoryBackend::new();
//! backend.create_collection("docs", &VectorParams { size: 3, distance: Distance::Dot })?;
//! backend.upsert("docs", vec![Point::new(PointId::Num(1), vec![1.0, 0.0, 0.0], Default::default())], true)?;
//!
//! let hits = backend.search("docs", &SearchRequest::new(vec![1.0, 0.0, 0.0], 5))?;
//! ```

use crate::Result;
use crate::models::{
    CollectionDescription, Point, PointId, Record, ScoredPoint, SearchRequest, VectorParams,
};

/// Trait for vector-index backends.
///
/// Implementations should be thread-safe (`Send + Sync`).
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn PointBackend>`
/// - Use interior mutability (e.g., `Mutex<HashMap<K,V>>`) for mutable state
/// - Report every failure as [`Error::Backend`](crate::Error::Backend); the
///   connector never retries
pub trait PointBackend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Creates a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    fn create_collection(&self, name: &str, params: &VectorParams) -> Result<()>;

    /// Deletes a collection.
    ///
    /// Returns `true` if a collection was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion request fails.
    fn delete_collection(&self, name: &str) -> Result<bool>;

    /// Lists all collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list_collections(&self) -> Result<Vec<CollectionDescription>>;

    /// Inserts or replaces points.
    ///
    /// When `wait` is true the call returns only after the points are applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the write fails.
    fn upsert(&self, collection: &str, points: Vec<Point>, wait: bool) -> Result<()>;

    /// Retrieves points by id, with vectors and payloads.
    ///
    /// Ids with no stored point are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the read fails.
    fn retrieve(&self, collection: &str, ids: &[PointId]) -> Result<Vec<Point>>;

    /// Runs a nearest-neighbour query.
    ///
    /// Hits are ordered best first and carry no vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the query fails.
    fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<ScoredPoint>>;

    /// Returns up to `limit` points with payloads and without vectors.
    ///
    /// Intended for inspection, not for paging through large collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or the read fails.
    fn scroll(&self, collection: &str, limit: usize) -> Result<Vec<Record>>;
}
