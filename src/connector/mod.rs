//! Entity connector.
//!
//! The [`Connector`] owns a backend handle plus a registry of index
//! configurations, and routes entity writes, reads, and searches through the
//! entity/point mapping functions.
//!
//! # Active Collection
//!
//! [`Connector::create_index`] makes the new index the active collection.
//! [`Connector::write_entities`] and [`Connector::read_entities`] target it;
//! the `_to`/`_from` variants take an explicit index name instead. Dropping
//! the active index clears the cursor.
//!
//! # Concurrency
//!
//! All operations take `&self`. The registry and cursor sit behind one
//! `RwLock`, so a connector can be shared across threads in an `Arc`.

mod mapping;

pub use mapping::{OBJECT_ID_KEY, coerce_object_id, default_vector, prepare_search_results};

use crate::config::{ConnectionParams, VecbridgeConfig};
use crate::models::{
    CollectionDescription, Entity, EntityData, Field, FieldValue, IndexConfig, PayloadFilter,
    Record, SearchRequest,
};
use crate::storage::{self, PointBackend};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::instrument;

/// Shape of search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchResultLayout {
    /// One result per hit, identified by the hit id.
    #[default]
    PerHit,
    /// Legacy single result carrying only the last hit.
    Merged,
}

impl SearchResultLayout {
    /// Returns the layout as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PerHit => "per_hit",
            Self::Merged => "merged",
        }
    }

    /// Parses a layout name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "per_hit" | "per-hit" | "perhit" => Some(Self::PerHit),
            "merged" => Some(Self::Merged),
            _ => None,
        }
    }
}

/// Tunables for a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorOptions {
    /// How search hits are shaped.
    pub search_layout: SearchResultLayout,
    /// Whether upserts wait for the backend to apply them.
    pub wait_for_upsert: bool,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            search_layout: SearchResultLayout::default(),
            wait_for_upsert: true,
        }
    }
}

#[derive(Debug, Default)]
struct IndexRegistry {
    configs: HashMap<String, IndexConfig>,
    active: Option<String>,
}

/// Maps entities onto a vector index backend.
pub struct Connector {
    backend: Arc<dyn PointBackend>,
    registry: RwLock<IndexRegistry>,
    options: ConnectorOptions,
}

impl Connector {
    /// Opens a backend for the connection parameters and registers the
    /// given index configurations.
    ///
    /// No collections are created and no active collection is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened.
    pub fn new(
        params: &ConnectionParams,
        index_configs: impl IntoIterator<Item = IndexConfig>,
    ) -> Result<Self> {
        let backend = storage::connect(params.url(), params.api_key().cloned())?;
        tracing::info!(
            conn_type = params.conn_type().as_str(),
            backend = backend.name(),
            "connector opened"
        );
        Ok(Self::with_backend(backend, index_configs))
    }

    /// Builds a connector from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened.
    pub fn from_config(config: &VecbridgeConfig) -> Result<Self> {
        Ok(Self::new(&config.connection, config.indexes.iter().cloned())?
            .with_options(config.connector))
    }

    /// Wraps an existing backend.
    #[must_use]
    pub fn with_backend(
        backend: Arc<dyn PointBackend>,
        index_configs: impl IntoIterator<Item = IndexConfig>,
    ) -> Self {
        let configs = index_configs
            .into_iter()
            .map(|config| (config.index_name.clone(), config))
            .collect();
        Self {
            backend,
            registry: RwLock::new(IndexRegistry {
                configs,
                active: None,
            }),
            options: ConnectorOptions::default(),
        }
    }

    /// Replaces the connector options.
    #[must_use]
    pub const fn with_options(mut self, options: ConnectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the connector options.
    #[must_use]
    pub const fn options(&self) -> &ConnectorOptions {
        &self.options
    }

    /// Returns the backend handle.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn PointBackend> {
        &self.backend
    }

    // Poisoning is ignored: registry updates never leave partial state.
    fn registry(&self) -> RwLockReadGuard<'_, IndexRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, IndexRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the registered configuration for an index.
    #[must_use]
    pub fn index_config(&self, name: &str) -> Option<IndexConfig> {
        self.registry().configs.get(name).cloned()
    }

    /// Returns the names of all registered indexes, sorted.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry().configs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the active collection, if any.
    #[must_use]
    pub fn active_collection(&self) -> Option<String> {
        self.registry().active.clone()
    }

    fn require_active(&self) -> Result<String> {
        self.active_collection().ok_or_else(|| {
            Error::NotFound("no active collection; create an index first".to_string())
        })
    }

    /// Registers an index configuration, creates the collection, and makes
    /// it the active collection.
    ///
    /// The configuration stays registered even if creation fails, so a
    /// failed index can still be dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration lacks `size` or
    /// `distance`, or a backend error if creation fails (for example, the
    /// collection already exists).
    #[instrument(skip(self, config), fields(index = %config.index_name))]
    pub fn create_index(&self, config: IndexConfig) -> Result<()> {
        let params = config.vector_params()?;
        let name = config.index_name.clone();
        self.registry_mut().configs.insert(name.clone(), config);

        self.backend.create_collection(&name, &params)?;
        self.registry_mut().active = Some(name);

        metrics::counter!("vecbridge_index_lifecycle_total", "op" => "create").increment(1);
        tracing::info!(
            size = params.size,
            distance = params.distance.as_str(),
            "index created"
        );
        Ok(())
    }

    /// Drops a registered index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no configuration is registered under
    /// `name`, or a backend error if deletion fails.
    #[instrument(skip(self))]
    pub fn drop_index(&self, name: &str) -> Result<()> {
        if !self.registry().configs.contains_key(name) {
            return Err(Error::NotFound(format!("index '{name}' is not registered")));
        }

        let existed = self.backend.delete_collection(name)?;
        if !existed {
            tracing::warn!("backend had no collection for registered index");
        }

        {
            let mut registry = self.registry_mut();
            registry.configs.remove(name);
            if registry.active.as_deref() == Some(name) {
                registry.active = None;
            }
        }

        metrics::counter!("vecbridge_index_lifecycle_total", "op" => "drop").increment(1);
        tracing::info!("index dropped");
        Ok(())
    }

    /// Lists the collections known to the backend.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the listing fails.
    pub fn list_collections(&self) -> Result<Vec<CollectionDescription>> {
        self.backend.list_collections()
    }

    /// Writes entities to the active collection.
    ///
    /// An empty batch is a no-op and does not require an active collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no collection is active,
    /// [`Error::InvalidInput`] if a vector-typed field holds a non-vector
    /// value, or a backend error if the upsert fails.
    pub fn write_entities(&self, data: &[EntityData]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let collection = self.require_active()?;
        self.upsert_entities(&collection, data)
    }

    /// Writes entities to a named collection.
    ///
    /// # Errors
    ///
    /// Same as [`Connector::write_entities`], minus the active check.
    pub fn write_entities_to(&self, index_name: &str, data: &[EntityData]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.upsert_entities(index_name, data)
    }

    #[instrument(skip(self, data), fields(count = data.len()))]
    fn upsert_entities(&self, collection: &str, data: &[EntityData]) -> Result<()> {
        let points = data
            .iter()
            .map(mapping::entity_to_point)
            .collect::<Result<Vec<_>>>()?;
        let count = points.len();

        self.backend
            .upsert(collection, points, self.options.wait_for_upsert)?;

        metrics::counter!("vecbridge_points_upserted_total").increment(count as u64);
        tracing::debug!(collection, count, "entities written");
        Ok(())
    }

    /// Reads entities from the active collection.
    ///
    /// Entities with no requested fields are skipped. Each remaining entity
    /// yields one result in input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no collection is active or a point is
    /// missing, or a backend error if retrieval fails.
    pub fn read_entities(&self, entities: &[Entity]) -> Result<Vec<EntityData>> {
        if entities.iter().all(|e| e.fields.is_empty()) {
            return Ok(Vec::new());
        }
        let collection = self.require_active()?;
        self.retrieve_entities(&collection, entities)
    }

    /// Reads entities from a named collection.
    ///
    /// # Errors
    ///
    /// Same as [`Connector::read_entities`], minus the active check.
    pub fn read_entities_from(
        &self,
        index_name: &str,
        entities: &[Entity],
    ) -> Result<Vec<EntityData>> {
        self.retrieve_entities(index_name, entities)
    }

    #[instrument(skip(self, entities), fields(count = entities.len()))]
    fn retrieve_entities(&self, collection: &str, entities: &[Entity]) -> Result<Vec<EntityData>> {
        let mut results = Vec::with_capacity(entities.len());

        for entity in entities.iter().filter(|e| !e.fields.is_empty()) {
            let id = coerce_object_id(&entity.entity_id.object_id);
            let point = self
                .backend
                .retrieve(collection, std::slice::from_ref(&id))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    Error::NotFound(format!("point '{id}' in collection '{collection}'"))
                })?;
            results.push(mapping::point_to_entity_data(entity, point));
        }

        metrics::counter!("vecbridge_entities_read_total").increment(results.len() as u64);
        Ok(results)
    }

    /// Searches an index for the nearest points to `vector`.
    ///
    /// Each result carries the requested fields found in the hit's payload.
    /// Vector-typed requested fields receive the hit's vector.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the search fails.
    pub fn search(
        &self,
        index_name: &str,
        vector: &[f32],
        returned_fields: &[Field],
        limit: usize,
    ) -> Result<Vec<EntityData>> {
        let request = SearchRequest::new(vector.to_vec(), limit)
            .with_vector(wants_vector(returned_fields));
        self.run_search(index_name, &request, returned_fields)
    }

    /// Searches an index, keeping only hits whose payload field `key`
    /// equals `value`.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the search fails.
    pub fn search_with_filter(
        &self,
        index_name: &str,
        vector: &[f32],
        returned_fields: &[Field],
        limit: usize,
        key: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Vec<EntityData>> {
        let request = SearchRequest::new(vector.to_vec(), limit)
            .with_vector(wants_vector(returned_fields))
            .with_filter(PayloadFilter::equals(key, value));
        self.run_search(index_name, &request, returned_fields)
    }

    #[instrument(
        skip(self, request, returned_fields),
        fields(limit = request.limit, filtered = request.filter.is_some())
    )]
    fn run_search(
        &self,
        index_name: &str,
        request: &SearchRequest,
        returned_fields: &[Field],
    ) -> Result<Vec<EntityData>> {
        let start = Instant::now();
        let filtered = if request.filter.is_some() { "true" } else { "false" };

        let hits = self.backend.search(index_name, request)?;
        let results = prepare_search_results(&hits, returned_fields, self.options.search_layout);

        metrics::counter!("vecbridge_search_requests_total", "filtered" => filtered).increment(1);
        metrics::histogram!("vecbridge_search_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(hits = hits.len(), results = results.len(), "search completed");
        Ok(results)
    }

    /// Returns the first page of records in an index, payloads included.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the scroll fails.
    pub fn scroll(&self, index_name: &str, limit: usize) -> Result<Vec<Record>> {
        self.backend.scroll(index_name, limit)
    }
}

fn wants_vector(fields: &[Field]) -> bool {
    fields.iter().any(Field::is_vector)
}
