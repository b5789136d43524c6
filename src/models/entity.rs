//! Entity identity, read requests, and entity data.

use super::{Field, FieldData, PointId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite entity identity.
///
/// `object_id` is the backend point identifier in string form. `schema_id`
/// is caller metadata and is never interpreted by the connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    /// Caller-defined schema identifier.
    pub schema_id: String,
    /// Object identifier, convertible to a [`PointId`].
    pub object_id: String,
}

impl EntityId {
    /// Creates a new entity ID.
    #[must_use]
    pub fn new(schema_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.schema_id, self.object_id)
    }
}

/// A read request: which entity, and which of its fields.
///
/// An entity with no fields requests nothing and is skipped by reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Identity of the entity to fetch.
    pub entity_id: EntityId,
    /// Fields to populate.
    pub fields: Vec<Field>,
}

impl Entity {
    /// Creates a new read request.
    #[must_use]
    pub const fn new(entity_id: EntityId, fields: Vec<Field>) -> Self {
        Self { entity_id, fields }
    }
}

/// Identity carried by [`EntityData`].
///
/// Reads by id echo the caller's [`EntityId`]. Search results carry the
/// backend hit identifier as-is; they are not mapped back to a schema id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    /// Full entity identity.
    Entity(EntityId),
    /// Raw backend point identifier.
    Point(PointId),
}

impl EntityRef {
    /// Returns the object identifier in string form.
    #[must_use]
    pub fn object_id(&self) -> String {
        match self {
            Self::Entity(id) => id.object_id.clone(),
            Self::Point(id) => id.to_string(),
        }
    }

    /// Returns the full entity identity, if present.
    #[must_use]
    pub const fn as_entity_id(&self) -> Option<&EntityId> {
        match self {
            Self::Entity(id) => Some(id),
            Self::Point(_) => None,
        }
    }

    /// Returns the raw backend identifier, if present.
    #[must_use]
    pub const fn as_point_id(&self) -> Option<&PointId> {
        match self {
            Self::Point(id) => Some(id),
            Self::Entity(_) => None,
        }
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        Self::Entity(id)
    }
}

impl From<PointId> for EntityRef {
    fn from(id: PointId) -> Self {
        Self::Point(id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "{id}"),
            Self::Point(id) => write!(f, "{id}"),
        }
    }
}

/// Concrete field values for one entity: a write payload or a read result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    /// Identity of the entity.
    pub entity_id: EntityRef,
    /// Field values.
    pub field_data: Vec<FieldData>,
}

impl EntityData {
    /// Creates new entity data.
    #[must_use]
    pub fn new(entity_id: impl Into<EntityRef>, field_data: Vec<FieldData>) -> Self {
        Self {
            entity_id: entity_id.into(),
            field_data,
        }
    }

    /// Returns the first field entry with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldData> {
        self.field_data.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for EntityData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity_id: {}, field_data: [", self.entity_id)?;
        for (i, data) in self.field_data.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{data}")?;
        }
        write!(f, "]")
    }
}
