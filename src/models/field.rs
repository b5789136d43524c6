//! Field descriptors and field values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type tag marking a field as the point vector.
pub const VECTOR_TYPE: &str = "vector";

/// Name of the vector field synthesised on reads that did not request one.
pub const VECTOR_FIELD_NAME: &str = "vector";

/// A named, typed field descriptor.
///
/// `data_type` is an open tag. Conventional values are `"int"`, `"float"`,
/// `"str"`, `"vector"` and the empty string for untyped fields. Only
/// `"vector"` changes how the field is mapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique within one field list.
    pub name: String,
    /// Open data type tag.
    #[serde(default)]
    pub data_type: String,
}

impl Field {
    /// Creates an untyped field.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: String::new(),
        }
    }

    /// Creates a field with an explicit data type tag.
    #[must_use]
    pub fn typed(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Creates a vector-typed field.
    #[must_use]
    pub fn vector(name: impl Into<String>) -> Self {
        Self::typed(name, VECTOR_TYPE)
    }

    /// Returns true if this field designates the point vector.
    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.data_type == VECTOR_TYPE
    }
}

/// A concrete field value.
///
/// Serialized untagged so values map directly onto JSON payload entries:
/// integers, floats, strings, and arrays of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Dense float vector.
    Vector(Vec<f32>),
}

impl FieldValue {
    /// Returns the kind of value as a data type tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Vector(_) => VECTOR_TYPE,
        }
    }

    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers are widened.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the vector, if this is a vector.
    #[must_use]
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Returns false for NaN or infinite floats, including vector components.
    ///
    /// JSON has no encoding for non-finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(v) => v.is_finite(),
            Self::Vector(v) => v.iter().all(|x| x.is_finite()),
            Self::Int(_) | Self::Str(_) => true,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Vector(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Vec<f32>> for FieldValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}

/// A field together with a concrete value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    /// Field name.
    pub name: String,
    /// Open data type tag.
    #[serde(default)]
    pub data_type: String,
    /// The value.
    pub value: FieldValue,
}

impl FieldData {
    /// Creates untyped field data.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            data_type: String::new(),
            value: value.into(),
        }
    }

    /// Creates field data with an explicit data type tag.
    #[must_use]
    pub fn typed(
        name: impl Into<String>,
        data_type: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            value: value.into(),
        }
    }

    /// Creates vector-typed field data.
    #[must_use]
    pub fn vector(name: impl Into<String>, vector: Vec<f32>) -> Self {
        Self::typed(name, VECTOR_TYPE, FieldValue::Vector(vector))
    }

    /// Returns true if this entry designates the point vector.
    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.data_type == VECTOR_TYPE
    }

    /// Returns the descriptor half of this entry.
    #[must_use]
    pub fn field(&self) -> Field {
        Field::typed(self.name.clone(), self.data_type.clone())
    }
}

impl fmt::Display for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name: {}, data_type: {}, value: {}",
            self.name, self.data_type, self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_is_vector() {
        assert!(Field::vector("embedding").is_vector());
        assert!(!Field::typed("title", "str").is_vector());
        assert!(!Field::new("vector").is_vector());
    }

    #[test]
    fn test_field_value_untagged_json() {
        let values: Vec<FieldValue> =
            serde_json::from_str(r#"[3, 1.5, "abc", [0.5, 1.0]]"#).expect("parse");
        assert_eq!(
            values,
            vec![
                FieldValue::Int(3),
                FieldValue::Float(1.5),
                FieldValue::Str("abc".to_string()),
                FieldValue::Vector(vec![0.5, 1.0]),
            ]
        );

        let json = serde_json::to_string(&FieldValue::from("x")).expect("serialize");
        assert_eq!(json, r#""x""#);
    }

    #[test]
    fn test_field_value_accessors() {
        assert_eq!(FieldValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(FieldValue::from("s").as_str(), Some("s"));
        assert_eq!(FieldValue::from(vec![1.0]).as_vector(), Some(&[1.0][..]));
        assert_eq!(FieldValue::Float(0.5).as_i64(), None);
        assert_eq!(FieldValue::Float(0.5).kind(), "float");
    }

    #[test]
    fn test_field_value_is_finite() {
        assert!(FieldValue::Float(0.5).is_finite());
        assert!(FieldValue::Int(i64::MAX).is_finite());
        assert!(FieldValue::from("nan").is_finite());
        assert!(!FieldValue::Float(f64::NAN).is_finite());
        assert!(!FieldValue::Float(f64::NEG_INFINITY).is_finite());
        assert!(!FieldValue::from(vec![1.0, f32::INFINITY]).is_finite());
    }

    #[test]
    fn test_field_data_display() {
        let data = FieldData::typed("f11", "str", "abc");
        assert_eq!(data.to_string(), "name: f11, data_type: str, value: abc");
        assert_eq!(data.field(), Field::typed("f11", "str"));
    }
}
