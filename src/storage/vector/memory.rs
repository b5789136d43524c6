//! In-memory point backend.
//!
//! A brute-force O(n) reference engine. It backs the reserved `:memory:`
//! target and, when opened with a path, persists every mutation to a JSON
//! snapshot so a local target survives process restarts.
//!
//! Vectors are not checked against the collection's declared size. Points
//! whose dimensionality differs from the query are scored as if the shorter
//! vector were zero-padded.

use crate::models::{
    CollectionDescription, Distance, Payload, Point, PointId, Record, ScoredPoint, SearchRequest,
    VectorParams,
};
use crate::storage::traits::PointBackend;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Reserved connection target for the in-memory backend.
pub const MEMORY_TARGET: &str = ":memory:";

/// A stored collection.
#[derive(Debug, Clone)]
struct Collection {
    params: VectorParams,
    points: BTreeMap<PointId, (Vec<f32>, Payload)>,
}

impl Collection {
    const fn new(params: VectorParams) -> Self {
        Self {
            params,
            points: BTreeMap::new(),
        }
    }
}

/// Snapshot data for serialization.
#[derive(Serialize, Deserialize)]
struct SnapshotData {
    collections: Vec<CollectionSnapshot>,
}

#[derive(Serialize, Deserialize)]
struct CollectionSnapshot {
    name: String,
    params: VectorParams,
    points: Vec<Point>,
}

/// Brute-force in-memory point backend.
///
/// Uses a `Mutex` around the collection map so the backend can be shared
/// via `Arc<dyn PointBackend>`.
pub struct InMemoryBackend {
    /// Snapshot file, if persisted.
    snapshot_path: Option<PathBuf>,
    /// Collections by name.
    collections: Mutex<BTreeMap<String, Collection>>,
}

impl InMemoryBackend {
    /// Creates an empty, non-persisted backend.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            snapshot_path: None,
            collections: Mutex::new(BTreeMap::new()),
        }
    }

    /// Opens a backend persisted at `path`, loading the snapshot if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collections = if path.exists() {
            Self::load(&path)?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(
            path = %path.display(),
            collections = collections.len(),
            "opened persisted in-memory backend"
        );

        Ok(Self {
            snapshot_path: Some(path),
            collections: Mutex::new(collections),
        })
    }

    /// Returns the snapshot path, if persisted.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn load(path: &Path) -> Result<BTreeMap<String, Collection>> {
        let content =
            fs::read_to_string(path).map_err(|e| Error::backend("load_snapshot", e))?;
        let data: SnapshotData =
            serde_json::from_str(&content).map_err(|e| Error::backend("parse_snapshot", e))?;

        Ok(data
            .collections
            .into_iter()
            .map(|snapshot| {
                let mut collection = Collection::new(snapshot.params);
                for point in snapshot.points {
                    collection
                        .points
                        .insert(point.id, (point.vector, point.payload));
                }
                (snapshot.name, collection)
            })
            .collect())
    }

    /// Writes the snapshot file. No-op when not persisted.
    fn save(&self, collections: &BTreeMap<String, Collection>) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let data = SnapshotData {
            collections: collections
                .iter()
                .map(|(name, collection)| CollectionSnapshot {
                    name: name.clone(),
                    params: collection.params,
                    points: collection
                        .points
                        .iter()
                        .map(|(id, (vector, payload))| {
                            Point::new(id.clone(), vector.clone(), payload.clone())
                        })
                        .collect(),
                })
                .collect(),
        };

        let content =
            serde_json::to_string(&data).map_err(|e| Error::backend("serialize_snapshot", e))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::backend("create_snapshot_dir", e))?;
        }

        fs::write(path, content).map_err(|e| Error::backend("write_snapshot", e))
    }

    fn lock(&self, operation: &str) -> Result<MutexGuard<'_, BTreeMap<String, Collection>>> {
        self.collections
            .lock()
            .map_err(|e| Error::backend(operation, e))
    }

    fn missing_collection(operation: &str, name: &str) -> Error {
        Error::backend(operation, format!("collection '{name}' not found"))
    }

    /// Computes the metric between two vectors, zero-padding the shorter one.
    fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
        let len = a.len().max(b.len());
        let pairs = (0..len).map(|i| {
            (
                a.get(i).copied().unwrap_or(0.0),
                b.get(i).copied().unwrap_or(0.0),
            )
        });

        match distance {
            Distance::Dot => pairs.map(|(x, y)| x * y).sum(),
            Distance::Cosine => {
                let (dot, norm_a, norm_b) = pairs.fold((0.0f32, 0.0f32, 0.0f32), |acc, (x, y)| {
                    (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
                });
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 0.0;
                }
                dot / (norm_a.sqrt() * norm_b.sqrt())
            },
            Distance::Euclid => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt(),
            Distance::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PointBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create_collection(&self, name: &str, params: &VectorParams) -> Result<()> {
        let mut collections = self.lock("create_collection")?;
        if collections.contains_key(name) {
            return Err(Error::backend(
                "create_collection",
                format!("collection '{name}' already exists"),
            ));
        }
        collections.insert(name.to_string(), Collection::new(*params));
        self.save(&collections).inspect_err(|_| {
            collections.remove(name);
        })
    }

    fn delete_collection(&self, name: &str) -> Result<bool> {
        let mut collections = self.lock("delete_collection")?;
        let Some(removed) = collections.remove(name) else {
            return Ok(false);
        };
        self.save(&collections).inspect_err(|_| {
            collections.insert(name.to_string(), removed);
        })?;
        Ok(true)
    }

    fn list_collections(&self) -> Result<Vec<CollectionDescription>> {
        let collections = self.lock("list_collections")?;
        Ok(collections
            .keys()
            .map(|name| CollectionDescription { name: name.clone() })
            .collect())
    }

    fn upsert(&self, collection: &str, points: Vec<Point>, _wait: bool) -> Result<()> {
        let mut collections = self.lock("upsert")?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing_collection("upsert", collection))?;

        let mut replaced = Vec::with_capacity(points.len());
        for point in points {
            let declared = usize::try_from(target.params.size).unwrap_or(usize::MAX);
            if point.vector.len() != declared {
                tracing::debug!(
                    collection,
                    id = %point.id,
                    expected = target.params.size,
                    actual = point.vector.len(),
                    "storing vector with non-matching dimensionality"
                );
            }
            let previous = target
                .points
                .insert(point.id.clone(), (point.vector, point.payload));
            replaced.push((point.id, previous));
        }

        self.save(&collections).inspect_err(|_| {
            // Undo in reverse so repeated ids in one batch restore the oldest value.
            if let Some(target) = collections.get_mut(collection) {
                for (id, previous) in replaced.into_iter().rev() {
                    match previous {
                        Some(entry) => target.points.insert(id, entry),
                        None => target.points.remove(&id),
                    };
                }
            }
        })
    }

    fn retrieve(&self, collection: &str, ids: &[PointId]) -> Result<Vec<Point>> {
        let collections = self.lock("retrieve")?;
        let source = collections
            .get(collection)
            .ok_or_else(|| Self::missing_collection("retrieve", collection))?;

        Ok(ids
            .iter()
            .filter_map(|id| {
                source
                    .points
                    .get(id)
                    .map(|(vector, payload)| Point::new(id.clone(), vector.clone(), payload.clone()))
            })
            .collect())
    }

    fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<ScoredPoint>> {
        let collections = self.lock("search")?;
        let source = collections
            .get(collection)
            .ok_or_else(|| Self::missing_collection("search", collection))?;
        let distance = source.params.distance;

        let mut scored: Vec<(&PointId, f32, &Vec<f32>, &Payload)> = source
            .points
            .iter()
            .filter(|(_, (_, payload))| {
                request
                    .filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(payload))
            })
            .map(|(id, (vector, payload))| {
                (id, Self::score(distance, &request.vector, vector), vector, payload)
            })
            .collect();

        if distance.higher_is_better() {
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        } else {
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        }

        Ok(scored
            .into_iter()
            .take(request.limit)
            .map(|(id, score, vector, payload)| ScoredPoint {
                id: id.clone(),
                score,
                payload: request.with_payload.then(|| payload.clone()),
                vector: request.with_vector.then(|| vector.clone()),
            })
            .collect())
    }

    fn scroll(&self, collection: &str, limit: usize) -> Result<Vec<Record>> {
        let collections = self.lock("scroll")?;
        let source = collections
            .get(collection)
            .ok_or_else(|| Self::missing_collection("scroll", collection))?;

        Ok(source
            .points
            .iter()
            .take(limit)
            .map(|(id, (_, payload))| Record {
                id: id.clone(),
                payload: Some(payload.clone()),
                vector: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, PayloadFilter};
    use tempfile::TempDir;

    fn params(size: u64, distance: Distance) -> VectorParams {
        VectorParams { size, distance }
    }

    fn point(id: u64, vector: Vec<f32>, lang: &str) -> Point {
        let mut payload = Payload::new();
        payload.insert("lang".to_string(), FieldValue::from(lang));
        Point::new(PointId::Num(id), vector, payload)
    }

    fn seeded(distance: Distance) -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend
            .create_collection("c", &params(2, distance))
            .expect("create failed");
        backend
            .upsert(
                "c",
                vec![
                    point(1, vec![1.0, 0.0], "rust"),
                    point(2, vec![0.0, 1.0], "go"),
                    point(3, vec![0.7, 0.7], "rust"),
                ],
                true,
            )
            .expect("upsert failed");
        backend
    }

    #[test]
    fn test_score_metrics() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!((InMemoryBackend::score(Distance::Dot, &a, &a) - 1.0).abs() < 1e-6);
        assert!(InMemoryBackend::score(Distance::Cosine, &a, &b).abs() < 1e-6);
        assert!(
            (InMemoryBackend::score(Distance::Euclid, &a, &b) - 2.0f32.sqrt()).abs() < 1e-6
        );
        assert!((InMemoryBackend::score(Distance::Manhattan, &a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_score_zero_pads_shorter_vector() {
        let score = InMemoryBackend::score(Distance::Dot, &[2.0, 3.0], &[0.0]);
        assert!(score.abs() < 1e-6);
        let score = InMemoryBackend::score(Distance::Euclid, &[3.0, 4.0], &[0.0]);
        assert!((score - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_collection_lifecycle() {
        let backend = InMemoryBackend::new();
        assert!(backend.list_collections().expect("list").is_empty());

        backend
            .create_collection("a", &params(4, Distance::Dot))
            .expect("create failed");
        let err = backend
            .create_collection("a", &params(4, Distance::Dot))
            .expect_err("duplicate create");
        assert!(matches!(err, Error::Backend { .. }));

        assert_eq!(backend.list_collections().expect("list").len(), 1);
        assert!(backend.delete_collection("a").expect("delete"));
        assert!(!backend.delete_collection("a").expect("delete"));
        assert!(backend.list_collections().expect("list").is_empty());
    }

    #[test]
    fn test_upsert_into_missing_collection() {
        let backend = InMemoryBackend::new();
        let err = backend
            .upsert("nope", vec![point(1, vec![0.0], "x")], true)
            .expect_err("missing collection");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_retrieve_skips_missing_ids() {
        let backend = seeded(Distance::Dot);
        let points = backend
            .retrieve("c", &[PointId::Num(2), PointId::Num(99)])
            .expect("retrieve");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, PointId::Num(2));
        assert_eq!(points[0].vector, vec![0.0, 1.0]);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let backend = seeded(Distance::Dot);
        let hits = backend
            .search("c", &SearchRequest::new(vec![1.0, 0.1], 2))
            .expect("search");
        let ids: Vec<_> = hits.iter().map(|h| h.id.clone()).collect();
        assert_eq!(ids, vec![PointId::Num(1), PointId::Num(3)]);
        assert!(hits[0].payload.is_some());
    }

    #[test]
    fn test_search_orders_by_distance() {
        let backend = seeded(Distance::Euclid);
        let hits = backend
            .search("c", &SearchRequest::new(vec![0.0, 0.9], 3))
            .expect("search");
        assert_eq!(hits[0].id, PointId::Num(2));
        assert!(hits[0].score <= hits[1].score);
    }

    #[test]
    fn test_search_with_filter() {
        let backend = seeded(Distance::Dot);
        let request = SearchRequest::new(vec![0.0, 1.0], 10)
            .with_filter(PayloadFilter::equals("lang", "rust"));
        let hits = backend.search("c", &request).expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, PointId::Num(3));
    }

    #[test]
    fn test_scroll_limit() {
        let backend = seeded(Distance::Dot);
        let records = backend.scroll("c", 2).expect("scroll");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.vector.is_none()));
    }

    #[test]
    fn test_snapshot_persistence() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("points.json");

        {
            let backend = InMemoryBackend::open(&path).expect("open");
            backend
                .create_collection("c", &params(2, Distance::Cosine))
                .expect("create");
            backend
                .upsert("c", vec![point(5, vec![0.5, 0.5], "rust")], true)
                .expect("upsert");
        }

        let reopened = InMemoryBackend::open(&path).expect("reopen");
        assert_eq!(reopened.snapshot_path(), Some(path.as_path()));
        let points = reopened
            .retrieve("c", &[PointId::Num(5)])
            .expect("retrieve");
        assert_eq!(points.len(), 1);
        assert_eq!(
            points[0].payload.get("lang"),
            Some(&FieldValue::from("rust"))
        );
    }

    #[test]
    fn test_search_returns_vectors_on_request() {
        let backend = seeded(Distance::Dot);
        let plain = backend
            .search("c", &SearchRequest::new(vec![1.0, 0.0], 1))
            .expect("search");
        assert!(plain[0].vector.is_none());

        let hits = backend
            .search("c", &SearchRequest::new(vec![1.0, 0.0], 1).with_vector(true))
            .expect("search");
        assert_eq!(hits[0].vector.as_deref(), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn test_failed_save_leaves_no_collection() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").expect("write");
        let backend = InMemoryBackend::open(blocker.join("points.json")).expect("open");

        let err = backend
            .create_collection("d", &params(2, Distance::Dot))
            .expect_err("parent is a file");
        assert!(matches!(err, Error::Backend { ref operation, .. } if operation == "create_snapshot_dir"));
        assert!(backend.list_collections().expect("list").is_empty());

        let retry = backend
            .create_collection("d", &params(2, Distance::Dot))
            .expect_err("parent is still a file");
        assert!(!retry.to_string().contains("already exists"));
    }

    #[test]
    fn test_failed_save_rolls_back_upsert_and_delete() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("points.json");
        let backend = InMemoryBackend::open(&path).expect("open");
        backend
            .create_collection("c", &params(2, Distance::Dot))
            .expect("create");
        backend
            .upsert("c", vec![point(1, vec![1.0, 0.0], "rust")], true)
            .expect("upsert");

        // A directory in place of the snapshot makes every later write fail.
        fs::remove_file(&path).expect("remove snapshot");
        fs::create_dir(&path).expect("block snapshot");

        backend
            .upsert(
                "c",
                vec![
                    point(1, vec![0.0, 1.0], "go"),
                    point(2, vec![0.5, 0.5], "go"),
                    point(1, vec![0.3, 0.3], "zig"),
                ],
                true,
            )
            .expect_err("snapshot is a directory");
        let points = backend
            .retrieve("c", &[PointId::Num(1), PointId::Num(2)])
            .expect("retrieve");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].vector, vec![1.0, 0.0]);
        assert_eq!(points[0].payload.get("lang"), Some(&FieldValue::from("rust")));

        backend
            .delete_collection("c")
            .expect_err("snapshot is a directory");
        assert_eq!(backend.list_collections().expect("list").len(), 1);
    }

    #[test]
    fn test_open_rejects_corrupt_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("points.json");
        fs::write(&path, "not json").expect("write");

        assert!(matches!(
            InMemoryBackend::open(&path),
            Err(Error::Backend { .. })
        ));
    }
}
