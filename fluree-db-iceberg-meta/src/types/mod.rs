//! Typed Iceberg schema model.
//!
//! Field IDs are the canonical identifier everywhere in this crate; names are
//! for lookup convenience and display only. Types round-trip through the JSON
//! representation used in Iceberg table metadata:
//!
//! - primitives are strings (`"int"`, `"decimal(10, 2)"`, `"fixed[16]"`)
//! - nested types are objects tagged by `"type"` (`struct`, `list`, `map`)

mod schema;

pub use schema::Schema;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::{IcebergError, Result};

/// Iceberg primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Decimal { precision: u8, scale: u8 },
    /// Days since 1970-01-01
    Date,
    /// Microseconds since midnight
    Time,
    /// Microseconds since epoch, no zone
    Timestamp,
    /// Microseconds since epoch, UTC
    Timestamptz,
    String,
    Uuid,
    Fixed(u64),
    Binary,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::Decimal { precision, scale } => write!(f, "decimal({}, {})", precision, scale),
            Self::Date => write!(f, "date"),
            Self::Time => write!(f, "time"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Timestamptz => write!(f, "timestamptz"),
            Self::String => write!(f, "string"),
            Self::Uuid => write!(f, "uuid"),
            Self::Fixed(len) => write!(f, "fixed[{}]", len),
            Self::Binary => write!(f, "binary"),
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = IcebergError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let ty = match s {
            "boolean" => Self::Boolean,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" => Self::Timestamp,
            "timestamptz" => Self::Timestamptz,
            "string" => Self::String,
            "uuid" => Self::Uuid,
            "binary" => Self::Binary,
            s if s.starts_with("fixed[") && s.ends_with(']') => {
                let len = s["fixed[".len()..s.len() - 1]
                    .trim()
                    .parse()
                    .map_err(|_| IcebergError::schema(format!("Invalid fixed type: {}", s)))?;
                Self::Fixed(len)
            }
            s if s.starts_with("decimal(") && s.ends_with(')') => {
                let inner = &s["decimal(".len()..s.len() - 1];
                let (precision, scale) = inner
                    .split_once(',')
                    .ok_or_else(|| IcebergError::schema(format!("Invalid decimal type: {}", s)))?;
                let precision = precision.trim().parse().map_err(|_| {
                    IcebergError::schema(format!("Invalid decimal precision: {}", precision))
                })?;
                let scale = scale.trim().parse().map_err(|_| {
                    IcebergError::schema(format!("Invalid decimal scale: {}", scale))
                })?;
                Self::Decimal { precision, scale }
            }
            other => {
                return Err(IcebergError::schema(format!(
                    "Unknown primitive type: {}",
                    other
                )))
            }
        };
        Ok(ty)
    }
}

/// Any Iceberg type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JsonValue", into = "JsonValue")]
pub enum Type {
    Primitive(PrimitiveType),
    Struct(StructType),
    List(ListType),
    Map(MapType),
}

impl Type {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    pub fn is_nested(&self) -> bool {
        !self.is_primitive()
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveType> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl From<PrimitiveType> for Type {
    fn from(value: PrimitiveType) -> Self {
        Self::Primitive(value)
    }
}

impl From<StructType> for Type {
    fn from(value: StructType) -> Self {
        Self::Struct(value)
    }
}

impl From<ListType> for Type {
    fn from(value: ListType) -> Self {
        Self::List(value)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p),
            Self::Struct(s) => {
                let parts: Vec<String> = s
                    .fields()
                    .iter()
                    .map(|field| format!("{}: {}", field.name, field.field_type))
                    .collect();
                write!(f, "struct<{}>", parts.join(", "))
            }
            Self::List(l) => write!(f, "list<{}>", l.element_type),
            Self::Map(m) => write!(f, "map<{}, {}>", m.key_type, m.value_type),
        }
    }
}

impl TryFrom<JsonValue> for Type {
    type Error = IcebergError;

    fn try_from(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::String(s) => Ok(Self::Primitive(s.parse()?)),
            JsonValue::Object(mut obj) => {
                let kind = obj
                    .get("type")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| IcebergError::schema("Nested type without \"type\" tag"))?
                    .to_string();

                let mut take = |key: &str| {
                    obj.remove(key)
                        .ok_or_else(|| IcebergError::schema(format!("{} type missing {}", kind, key)))
                };

                match kind.as_str() {
                    "struct" => {
                        let fields: Vec<NestedField> = serde_json::from_value(take("fields")?)
                            .map_err(|e| {
                                IcebergError::schema(format!("Invalid struct fields: {}", e))
                            })?;
                        Ok(Self::Struct(StructType::new(fields)))
                    }
                    "list" => {
                        let element_id = json_i32(&take("element-id")?, "element-id")?;
                        let element_required = take("element-required")?
                            .as_bool()
                            .ok_or_else(|| IcebergError::schema("element-required must be bool"))?;
                        let element_type = Type::try_from(take("element")?)?;
                        Ok(Self::List(ListType {
                            element_id,
                            element_required,
                            element_type: Box::new(element_type),
                        }))
                    }
                    "map" => {
                        let key_id = json_i32(&take("key-id")?, "key-id")?;
                        let value_id = json_i32(&take("value-id")?, "value-id")?;
                        let value_required = take("value-required")?
                            .as_bool()
                            .ok_or_else(|| IcebergError::schema("value-required must be bool"))?;
                        let key_type = Type::try_from(take("key")?)?;
                        let value_type = Type::try_from(take("value")?)?;
                        Ok(Self::Map(MapType {
                            key_id,
                            key_type: Box::new(key_type),
                            value_id,
                            value_required,
                            value_type: Box::new(value_type),
                        }))
                    }
                    other => Err(IcebergError::schema(format!(
                        "Unknown nested type: {}",
                        other
                    ))),
                }
            }
            other => Err(IcebergError::schema(format!(
                "Invalid type definition: {}",
                other
            ))),
        }
    }
}

impl From<Type> for JsonValue {
    fn from(value: Type) -> Self {
        match value {
            Type::Primitive(p) => JsonValue::String(p.to_string()),
            Type::Struct(s) => json!({
                "type": "struct",
                "fields": s.fields,
            }),
            Type::List(l) => json!({
                "type": "list",
                "element-id": l.element_id,
                "element-required": l.element_required,
                "element": JsonValue::from(*l.element_type),
            }),
            Type::Map(m) => json!({
                "type": "map",
                "key-id": m.key_id,
                "key": JsonValue::from(*m.key_type),
                "value-id": m.value_id,
                "value-required": m.value_required,
                "value": JsonValue::from(*m.value_type),
            }),
        }
    }
}

fn json_i32(value: &JsonValue, what: &str) -> Result<i32> {
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| IcebergError::schema(format!("{} must be a 32-bit integer", what)))
}

/// A named, ID'd field of a struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedField {
    /// Field ID (canonical)
    pub id: i32,
    /// Field name
    pub name: String,
    /// Whether the field is non-nullable
    pub required: bool,
    /// Field type
    #[serde(rename = "type")]
    pub field_type: Type,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl NestedField {
    pub fn required(id: i32, name: impl Into<String>, field_type: impl Into<Type>) -> Self {
        Self {
            id,
            name: name.into(),
            required: true,
            field_type: field_type.into(),
            doc: None,
        }
    }

    pub fn optional(id: i32, name: impl Into<String>, field_type: impl Into<Type>) -> Self {
        Self {
            id,
            name: name.into(),
            required: false,
            field_type: field_type.into(),
            doc: None,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// An ordered collection of fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructType {
    fields: Vec<NestedField>,
}

impl StructType {
    pub fn new(fields: Vec<NestedField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[NestedField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Direct child by field ID.
    pub fn field(&self, id: i32) -> Option<&NestedField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Position of a direct child by field ID.
    pub fn position(&self, id: i32) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Direct child by name (case-sensitive).
    pub fn field_by_name(&self, name: &str) -> Option<&NestedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A list whose element is an unnamed field with its own ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListType {
    pub element_id: i32,
    pub element_required: bool,
    pub element_type: Box<Type>,
}

impl ListType {
    pub fn of_required(element_id: i32, element_type: impl Into<Type>) -> Self {
        Self {
            element_id,
            element_required: true,
            element_type: Box::new(element_type.into()),
        }
    }

    pub fn of_optional(element_id: i32, element_type: impl Into<Type>) -> Self {
        Self {
            element_id,
            element_required: false,
            element_type: Box::new(element_type.into()),
        }
    }

    /// The element as a field named `element`.
    pub fn element_field(&self) -> NestedField {
        NestedField {
            id: self.element_id,
            name: "element".to_string(),
            required: self.element_required,
            field_type: (*self.element_type).clone(),
            doc: None,
        }
    }
}

/// A map with ID'd key and value fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapType {
    pub key_id: i32,
    pub key_type: Box<Type>,
    pub value_id: i32,
    pub value_required: bool,
    pub value_type: Box<Type>,
}

impl MapType {
    pub fn key_field(&self) -> NestedField {
        NestedField::required(self.key_id, "key", (*self.key_type).clone())
    }

    pub fn value_field(&self) -> NestedField {
        NestedField {
            id: self.value_id,
            name: "value".to_string(),
            required: self.value_required,
            field_type: (*self.value_type).clone(),
            doc: None,
        }
    }
}
