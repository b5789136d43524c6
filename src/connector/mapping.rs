//! Entity ↔ point mapping.
//!
//! Pure functions shared by the connector's write, read, and search paths.

use super::SearchResultLayout;
use crate::models::{
    Entity, EntityData, EntityRef, Field, FieldData, FieldValue, Payload, Point, PointId,
    ScoredPoint, VECTOR_FIELD_NAME, VECTOR_TYPE,
};
use crate::{Error, Result};

/// Payload key holding the raw object id of every written point.
pub const OBJECT_ID_KEY: &str = "object_id";

/// Vector stored for entities written without one.
#[must_use]
pub fn default_vector() -> Vec<f32> {
    vec![0.0]
}

/// Coerces a raw object id into the backend identifier domain.
///
/// Returns [`PointId::Num`] only if `raw` is the canonical decimal form of an
/// unsigned 64-bit integer, i.e. parsing and re-formatting gives back the
/// exact same string. Everything else (`"007"`, `"+7"`, `" 7"`, `"-7"`,
/// UUIDs) is kept as an opaque [`PointId::Str`].
///
/// # Example
///
/// ```rust
/// use vecbridge::{PointId, coerce_object_id};
///
/// assert_eq!(coerce_object_id("7"), PointId::Num(7));
/// assert_eq!(coerce_object_id("007"), PointId::Str("007".to_string()));
/// ```
#[must_use]
pub fn coerce_object_id(raw: &str) -> PointId {
    match raw.parse::<u64>() {
        Ok(n) if n.to_string() == raw => PointId::Num(n),
        _ => PointId::Str(raw.to_string()),
    }
}

/// Builds the point written for one entity.
///
/// Vector-typed entries become the point vector (the last one wins); every
/// other entry lands in the payload under its name. The payload also keeps
/// the raw object id under [`OBJECT_ID_KEY`]. NaN and infinite values are
/// rejected.
pub(crate) fn entity_to_point(data: &EntityData) -> Result<Point> {
    let object_id = data.entity_id.object_id();

    let mut payload = Payload::new();
    payload.insert(
        OBJECT_ID_KEY.to_string(),
        FieldValue::Str(object_id.clone()),
    );

    let mut vector = None;
    for item in &data.field_data {
        if !item.value.is_finite() {
            return Err(Error::InvalidInput(format!(
                "field '{}' of entity '{object_id}' holds a non-finite number",
                item.name
            )));
        }
        if !item.is_vector() {
            payload.insert(item.name.clone(), item.value.clone());
            continue;
        }
        match &item.value {
            FieldValue::Vector(v) => vector = Some(v.clone()),
            other => {
                return Err(Error::InvalidInput(format!(
                    "field '{}' of entity '{object_id}' is typed '{VECTOR_TYPE}' but holds a {} value",
                    item.name,
                    other.kind()
                )));
            },
        }
    }

    let vector = match vector {
        Some(v) if !v.is_empty() => v,
        _ => {
            tracing::debug!(object_id = %object_id, "no vector field, storing default vector");
            default_vector()
        },
    };

    Ok(Point::new(coerce_object_id(&object_id), vector, payload))
}

/// Rebuilds entity data from a retrieved point.
///
/// Vector-typed requested fields receive the point vector under their own
/// name. Other requested fields are looked up in the payload and omitted if
/// absent. If no vector-typed field was requested, the vector is appended
/// as a field named `"vector"`.
pub(crate) fn point_to_entity_data(entity: &Entity, point: Point) -> EntityData {
    let Point {
        vector, payload, ..
    } = point;

    let mut field_data = Vec::with_capacity(entity.fields.len() + 1);
    let mut vector_requested = false;

    for field in &entity.fields {
        if field.is_vector() {
            vector_requested = true;
            field_data.push(FieldData::vector(&field.name, vector.clone()));
        } else if let Some(value) = payload.get(&field.name) {
            field_data.push(FieldData::typed(
                &field.name,
                &field.data_type,
                value.clone(),
            ));
        }
    }

    if !vector_requested {
        field_data.push(FieldData::vector(VECTOR_FIELD_NAME, vector));
    }

    EntityData::new(entity.entity_id.clone(), field_data)
}

/// Requested fields found in one hit, in request order.
///
/// Vector-typed fields take the hit's vector, other fields its payload.
fn hit_to_entity_data(hit: &ScoredPoint, returned_fields: &[Field]) -> EntityData {
    let field_data = returned_fields
        .iter()
        .filter_map(|field| {
            if field.is_vector() {
                hit.vector
                    .as_ref()
                    .map(|vector| FieldData::vector(&field.name, vector.clone()))
            } else {
                hit.payload.as_ref()?.get(&field.name).map(|value| {
                    FieldData::typed(&field.name, &field.data_type, value.clone())
                })
            }
        })
        .collect();

    EntityData::new(EntityRef::Point(hit.id.clone()), field_data)
}

/// Turns raw search hits into entity data.
///
/// With [`SearchResultLayout::PerHit`] every hit becomes one result, in hit
/// order, identified by its backend id. [`SearchResultLayout::Merged`]
/// reproduces the legacy single-result shape: only the last hit survives.
#[must_use]
pub fn prepare_search_results(
    hits: &[ScoredPoint],
    returned_fields: &[Field],
    layout: SearchResultLayout,
) -> Vec<EntityData> {
    let results = hits
        .iter()
        .map(|hit| hit_to_entity_data(hit, returned_fields));

    match layout {
        SearchResultLayout::PerHit => results.collect(),
        SearchResultLayout::Merged => results.last().into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityId;
    use test_case::test_case;

    #[test_case("7", PointId::Num(7); "canonical integer")]
    #[test_case("0", PointId::Num(0); "zero")]
    #[test_case("18446744073709551615", PointId::Num(u64::MAX); "u64 max")]
    #[test_case("007", PointId::Str("007".into()); "leading zeros")]
    #[test_case("+7", PointId::Str("+7".into()); "explicit sign")]
    #[test_case("-7", PointId::Str("-7".into()); "negative")]
    #[test_case(" 7", PointId::Str(" 7".into()); "whitespace")]
    #[test_case("18446744073709551616", PointId::Str("18446744073709551616".into()); "overflow")]
    #[test_case("", PointId::Str(String::new()); "empty")]
    #[test_case(
        "5c56c793-69f3-4fbf-87e6-c4bf54c28c26",
        PointId::Str("5c56c793-69f3-4fbf-87e6-c4bf54c28c26".into());
        "uuid"
    )]
    fn test_coerce_object_id(raw: &str, expected: PointId) {
        assert_eq!(coerce_object_id(raw), expected);
    }

    fn entity_data(id: &str, fields: Vec<FieldData>) -> EntityData {
        EntityData::new(EntityId::new("0", id), fields)
    }

    #[test]
    fn test_entity_to_point_splits_vector_and_payload() {
        let data = entity_data(
            "1",
            vec![
                FieldData::new("f11", "abc"),
                FieldData::vector("emb", vec![0.1, 0.2]),
                FieldData::typed("n", "int", 3i64),
            ],
        );
        let point = entity_to_point(&data).expect("map");

        assert_eq!(point.id, PointId::Num(1));
        assert_eq!(point.vector, vec![0.1, 0.2]);
        assert_eq!(point.payload.get("f11"), Some(&FieldValue::from("abc")));
        assert_eq!(point.payload.get("n"), Some(&FieldValue::Int(3)));
        assert_eq!(point.payload.get(OBJECT_ID_KEY), Some(&FieldValue::from("1")));
        assert!(!point.payload.contains_key("emb"));
    }

    #[test]
    fn test_entity_to_point_default_vector() {
        let point = entity_to_point(&entity_data("x", vec![FieldData::new("a", "b")]))
            .expect("map");
        assert_eq!(point.vector, vec![0.0]);
        assert_eq!(point.id, PointId::Str("x".to_string()));

        let point = entity_to_point(&entity_data("2", vec![FieldData::vector("v", Vec::new())]))
            .expect("map");
        assert_eq!(point.vector, vec![0.0]);
    }

    #[test]
    fn test_entity_to_point_last_vector_wins() {
        let data = entity_data(
            "1",
            vec![
                FieldData::vector("a", vec![1.0]),
                FieldData::vector("b", vec![2.0]),
            ],
        );
        assert_eq!(entity_to_point(&data).expect("map").vector, vec![2.0]);
    }

    #[test]
    fn test_entity_to_point_rejects_non_vector_value() {
        let data = entity_data("1", vec![FieldData::typed("v", VECTOR_TYPE, 0.5)]);
        let err = entity_to_point(&data).expect_err("float in vector field");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test_case(FieldData::typed("x", "float", f64::NAN); "nan payload float")]
    #[test_case(FieldData::new("x", f64::INFINITY); "infinite payload float")]
    #[test_case(FieldData::vector("v", vec![0.5, f32::NAN]); "nan in vector")]
    #[test_case(FieldData::new("v", vec![f32::NEG_INFINITY]); "infinity in untyped vector")]
    fn test_entity_to_point_rejects_non_finite(field: FieldData) {
        let err = entity_to_point(&entity_data("1", vec![field])).expect_err("non-finite");
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("non-finite")));
    }

    fn stored_point() -> Point {
        let mut payload = Payload::new();
        payload.insert("f11".to_string(), FieldValue::from("abc"));
        payload.insert(OBJECT_ID_KEY.to_string(), FieldValue::from("1"));
        Point::new(PointId::Num(1), vec![0.5, 0.25], payload)
    }

    #[test]
    fn test_point_to_entity_data_appends_vector() {
        let entity = Entity::new(
            EntityId::new("0", "1"),
            vec![Field::new("f11"), Field::new("missing")],
        );
        let data = point_to_entity_data(&entity, stored_point());

        assert_eq!(data.entity_id, EntityRef::Entity(EntityId::new("0", "1")));
        assert_eq!(data.field_data.len(), 2);
        assert_eq!(data.field_data[0], FieldData::new("f11", "abc"));
        assert_eq!(
            data.field_data[1],
            FieldData::vector(VECTOR_FIELD_NAME, vec![0.5, 0.25])
        );
    }

    #[test]
    fn test_point_to_entity_data_requested_vector_field() {
        let entity = Entity::new(
            EntityId::new("0", "1"),
            vec![Field::vector("embedding"), Field::typed("f11", "str")],
        );
        let data = point_to_entity_data(&entity, stored_point());

        assert_eq!(
            data.field_data,
            vec![
                FieldData::vector("embedding", vec![0.5, 0.25]),
                FieldData::typed("f11", "str", "abc"),
            ]
        );
    }

    fn hit(id: u64, title: &str) -> ScoredPoint {
        let mut payload = Payload::new();
        payload.insert("title".to_string(), FieldValue::from(title));
        ScoredPoint {
            id: PointId::Num(id),
            score: 1.0,
            payload: Some(payload),
            vector: None,
        }
    }

    #[test]
    fn test_prepare_search_results_per_hit() {
        let hits = vec![hit(3, "c"), hit(1, "a")];
        let results =
            prepare_search_results(&hits, &[Field::new("title")], SearchResultLayout::PerHit);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entity_id, EntityRef::Point(PointId::Num(3)));
        assert_eq!(results[0].field_data, vec![FieldData::new("title", "c")]);
        assert_eq!(results[1].entity_id, EntityRef::Point(PointId::Num(1)));
    }

    #[test]
    fn test_prepare_search_results_merged_keeps_last_hit() {
        let hits = vec![hit(3, "c"), hit(1, "a")];
        let results =
            prepare_search_results(&hits, &[Field::new("title")], SearchResultLayout::Merged);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_id, EntityRef::Point(PointId::Num(1)));
        assert_eq!(results[0].field_data, vec![FieldData::new("title", "a")]);
    }

    #[test]
    fn test_prepare_search_results_empty() {
        for layout in [SearchResultLayout::PerHit, SearchResultLayout::Merged] {
            assert!(prepare_search_results(&[], &[Field::new("title")], layout).is_empty());
        }
    }

    #[test]
    fn test_prepare_search_results_without_payload() {
        let bare = ScoredPoint {
            id: PointId::Num(9),
            score: 0.0,
            payload: None,
            vector: None,
        };
        let results =
            prepare_search_results(&[bare], &[Field::new("title")], SearchResultLayout::PerHit);
        assert_eq!(results.len(), 1);
        assert!(results[0].field_data.is_empty());
    }

    #[test]
    fn test_prepare_search_results_vector_field() {
        let mut with_vector = hit(4, "d");
        with_vector.vector = Some(vec![1.0, 2.0]);
        let fields = [Field::new("title"), Field::vector("vector")];

        let results = prepare_search_results(
            &[with_vector, hit(5, "e")],
            &fields,
            SearchResultLayout::PerHit,
        );

        assert_eq!(
            results[0].field_data,
            vec![
                FieldData::new("title", "d"),
                FieldData::vector("vector", vec![1.0, 2.0]),
            ]
        );
        assert_eq!(results[1].field_data, vec![FieldData::new("title", "e")]);
    }
}
