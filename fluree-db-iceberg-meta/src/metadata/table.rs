//! Iceberg table metadata structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::partition::{PartitionField, PartitionSpec, UnboundPartitionSpec};
use super::Snapshot;
use crate::error::{IcebergError, Result};
use crate::types::Schema;

/// Iceberg table metadata (v1/v2 format).
///
/// This structure represents the JSON metadata file for an Iceberg table,
/// containing schemas, snapshots, partition specs, and other table properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableMetadata {
    /// Format version (1 or 2)
    pub format_version: i32,
    /// Table UUID
    #[serde(default)]
    pub table_uuid: Option<String>,
    /// Location of the table (base path for data files)
    pub location: String,
    /// Last sequence number (v2)
    #[serde(default)]
    pub last_sequence_number: i64,
    /// Last updated timestamp (ms since epoch)
    pub last_updated_ms: i64,
    /// Last assigned column ID
    pub last_column_id: i32,
    /// Current schema ID
    #[serde(default)]
    pub current_schema_id: i32,
    /// All schemas
    #[serde(default)]
    pub schemas: Vec<Schema>,
    /// Single schema written by v1 writers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Current snapshot ID
    #[serde(default)]
    pub current_snapshot_id: Option<i64>,
    /// All snapshots
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    /// Default partition spec ID
    #[serde(default)]
    pub default_spec_id: i32,
    /// Partition specs
    #[serde(default)]
    pub partition_specs: Vec<UnboundPartitionSpec>,
    /// Fields of the single partition spec written by v1 writers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_spec: Option<Vec<PartitionField>>,
    /// Table properties
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl TableMetadata {
    /// Parse metadata from JSON bytes.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json)
            .map_err(|e| IcebergError::metadata(format!("Failed to parse metadata: {}", e)))
    }

    /// Parse metadata from JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| IcebergError::metadata(format!("Failed to parse metadata: {}", e)))
    }

    /// Get the current schema.
    pub fn current_schema(&self) -> Option<&Schema> {
        self.schema(self.current_schema_id)
            .or_else(|| self.schemas.first())
            .or(self.schema.as_ref())
    }

    /// Get the current snapshot.
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.current_snapshot_id.and_then(|id| self.snapshot(id))
    }

    /// Get a snapshot by ID.
    pub fn snapshot(&self, id: i64) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.snapshot_id == id)
    }

    /// Get a schema by ID.
    pub fn schema(&self, id: i32) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.schema_id() == id)
    }

    /// All partition specs, including the legacy v1 `partition-spec` as spec 0.
    pub fn partition_specs(&self) -> Vec<UnboundPartitionSpec> {
        if self.partition_specs.is_empty() {
            if let Some(fields) = &self.partition_spec {
                return vec![UnboundPartitionSpec {
                    spec_id: 0,
                    fields: fields.clone(),
                }];
            }
        }
        self.partition_specs.clone()
    }

    /// Get the partition spec by ID.
    pub fn partition_spec(&self, id: i32) -> Option<UnboundPartitionSpec> {
        self.partition_specs().into_iter().find(|s| s.spec_id == id)
    }

    /// Every partition spec bound to the current schema, keyed by spec ID.
    pub fn specs_by_id(&self) -> HashMap<i32, PartitionSpec> {
        let empty = Schema::new(Vec::new());
        let schema = self.current_schema().unwrap_or(&empty);
        self.partition_specs()
            .iter()
            .map(|spec| (spec.spec_id, spec.bind(schema)))
            .collect()
    }

    /// Look up a table property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }
}
