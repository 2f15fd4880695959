//! Partition specs and transforms.
//!
//! Table metadata stores [`UnboundPartitionSpec`]s. Binding one against a
//! table schema resolves each field's source type and transform result type,
//! which is what manifest-list partition summaries are encoded with.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{IcebergError, Result};
use crate::manifest::value_codec::{decode_value, human_date, TypedValue};
use crate::types::{PrimitiveType, Schema};

/// Partition transform function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Transform {
    Identity,
    Bucket(u32),
    Truncate(u32),
    Year,
    Month,
    Day,
    Hour,
    Void,
    /// A transform this crate does not know; its bounds are not rendered.
    Unknown(String),
}

impl Transform {
    /// Type of partition values produced from a source column type.
    pub fn result_type(&self, source: &PrimitiveType) -> Option<PrimitiveType> {
        match self {
            Self::Identity | Self::Truncate(_) | Self::Void => Some(*source),
            Self::Bucket(_) | Self::Year | Self::Month | Self::Hour => Some(PrimitiveType::Int),
            Self::Day => Some(PrimitiveType::Date),
            Self::Unknown(_) => None,
        }
    }

    /// Render a partition value the way Iceberg displays partition tuples.
    pub fn to_human_string(&self, value: &TypedValue) -> String {
        match (self, value) {
            (Self::Void, _) => "null".to_string(),
            (Self::Year, TypedValue::Int32(years)) => format!("{:04}", 1970 + years),
            (Self::Month, TypedValue::Int32(months)) => human_month(*months),
            (Self::Day, TypedValue::Int32(days) | TypedValue::Date(days)) => human_date(*days),
            (Self::Hour, TypedValue::Int32(hours)) => human_hour(*hours),
            (_, value) => value.to_human_string(),
        }
    }
}

fn human_month(months: i32) -> String {
    format!(
        "{:04}-{:02}",
        1970 + months.div_euclid(12),
        months.rem_euclid(12) + 1
    )
}

fn human_hour(hours: i32) -> String {
    DateTime::from_timestamp(hours as i64 * 3600, 0)
        .map(|ts| ts.format("%Y-%m-%d-%H").to_string())
        .unwrap_or_else(|| hours.to_string())
}

fn bracketed(s: &str, prefix: &str) -> Option<Result<u32>> {
    s.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('['))
        .and_then(|rest| rest.strip_suffix(']'))
        .map(|arg| {
            arg.trim()
                .parse()
                .map_err(|_| IcebergError::metadata(format!("Invalid transform: {}", s)))
        })
}

impl FromStr for Transform {
    type Err = IcebergError;

    fn from_str(s: &str) -> Result<Self> {
        let transform = match s {
            "identity" => Self::Identity,
            "year" => Self::Year,
            "month" => Self::Month,
            "day" => Self::Day,
            "hour" => Self::Hour,
            "void" => Self::Void,
            s => {
                if let Some(n) = bracketed(s, "bucket") {
                    Self::Bucket(n?)
                } else if let Some(w) = bracketed(s, "truncate") {
                    Self::Truncate(w?)
                } else {
                    Self::Unknown(s.to_string())
                }
            }
        };
        Ok(transform)
    }
}

impl TryFrom<String> for Transform {
    type Error = IcebergError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Transform> for String {
    fn from(t: Transform) -> Self {
        t.to_string()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Bucket(n) => write!(f, "bucket[{}]", n),
            Self::Truncate(w) => write!(f, "truncate[{}]", w),
            Self::Year => write!(f, "year"),
            Self::Month => write!(f, "month"),
            Self::Day => write!(f, "day"),
            Self::Hour => write!(f, "hour"),
            Self::Void => write!(f, "void"),
            Self::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Partition field definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionField {
    /// Source column ID
    pub source_id: i32,
    /// Partition field ID
    pub field_id: i32,
    /// Partition field name
    pub name: String,
    pub transform: Transform,
}

/// Partition specification as stored in table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnboundPartitionSpec {
    /// Partition spec ID
    pub spec_id: i32,
    /// Partition fields
    #[serde(default)]
    pub fields: Vec<PartitionField>,
}

impl UnboundPartitionSpec {
    /// Resolve field types against a table schema.
    ///
    /// Fields whose source column is missing or not primitive keep no result
    /// type; their summary bounds render as null.
    pub fn bind(&self, schema: &Schema) -> PartitionSpec {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let result_type = schema
                    .primitive_type(field.source_id)
                    .and_then(|source| field.transform.result_type(&source));
                BoundPartitionField {
                    field: field.clone(),
                    result_type,
                }
            })
            .collect();

        PartitionSpec {
            spec_id: self.spec_id,
            fields,
        }
    }
}

/// A partition field with its resolved result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPartitionField {
    pub field: PartitionField,
    pub result_type: Option<PrimitiveType>,
}

impl BoundPartitionField {
    /// Decode an encoded partition value and render it as a human string.
    ///
    /// Returns `None` when the value cannot be decoded.
    pub fn human_string(&self, bytes: &[u8]) -> Option<String> {
        let result_type = self.result_type.as_ref()?;
        match decode_value(bytes, result_type) {
            Ok(value) => Some(self.field.transform.to_human_string(&value)),
            Err(e) => {
                tracing::warn!(
                    field = %self.field.name,
                    transform = %self.field.transform,
                    error = %e,
                    "Cannot decode partition bound"
                );
                None
            }
        }
    }
}

/// Partition spec bound to a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    spec_id: i32,
    fields: Vec<BoundPartitionField>,
}

impl PartitionSpec {
    /// Spec with ID 0 and no fields.
    pub fn unpartitioned() -> Self {
        Self {
            spec_id: 0,
            fields: Vec::new(),
        }
    }

    pub fn spec_id(&self) -> i32 {
        self.spec_id
    }

    pub fn fields(&self) -> &[BoundPartitionField] {
        &self.fields
    }

    pub fn is_unpartitioned(&self) -> bool {
        self.fields.is_empty()
    }
}
