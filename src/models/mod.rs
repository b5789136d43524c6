//! Data models for vecbridge.
//!
//! This module contains the entity model exposed to callers and the point
//! model exchanged with vector backends.

mod entity;
mod field;
mod index;
mod point;

pub use entity::{Entity, EntityData, EntityId, EntityRef};
pub use field::{Field, FieldData, FieldValue, VECTOR_FIELD_NAME, VECTOR_TYPE};
pub use index::{Distance, IndexConfig, IndexConfigData, VectorParams};
pub use point::{
    CollectionDescription, Payload, PayloadFilter, Point, PointId, Record, ScoredPoint,
    SearchRequest,
};
