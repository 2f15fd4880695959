//! Loaded Iceberg table handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::all_manifests::AllManifestsTable;
use crate::error::{IcebergError, Result};
use crate::io::IcebergStorage;
use crate::metadata::{PartitionSpec, Snapshot, TableMetadata};
use crate::types::Schema;

/// An Iceberg table: its metadata plus the storage it lives in.
///
/// Cheap to clone; metadata and storage are shared.
#[derive(Clone)]
pub struct Table {
    name: String,
    metadata: Arc<TableMetadata>,
    metadata_location: Option<String>,
    metadata_length: u64,
    io: Arc<dyn IcebergStorage>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("metadata_location", &self.metadata_location)
            .field("snapshots", &self.metadata.snapshots.len())
            .field("io", &self.io)
            .finish()
    }
}

impl Table {
    /// A table over already parsed metadata.
    pub fn new(name: impl Into<String>, metadata: TableMetadata, io: Arc<dyn IcebergStorage>) -> Self {
        Self {
            name: name.into(),
            metadata: Arc::new(metadata),
            metadata_location: None,
            metadata_length: 0,
            io,
        }
    }

    /// Record the metadata file this table was read from.
    pub fn with_metadata_location(mut self, location: impl Into<String>, length: u64) -> Self {
        self.metadata_location = Some(location.into());
        self.metadata_length = length;
        self
    }

    /// Read and parse a metadata JSON file.
    pub async fn load(
        name: impl Into<String>,
        io: Arc<dyn IcebergStorage>,
        metadata_location: &str,
    ) -> Result<Self> {
        let bytes = io
            .read(metadata_location)
            .await
            .map_err(|e| IcebergError::io(metadata_location, e))?;
        let metadata = TableMetadata::from_json(&bytes)?;

        tracing::debug!(
            location = %metadata_location,
            format_version = metadata.format_version,
            snapshots = metadata.snapshots.len(),
            "Loaded table metadata"
        );

        Ok(Self::new(name, metadata, io).with_metadata_location(metadata_location, bytes.len() as u64))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Arc<TableMetadata> {
        &self.metadata
    }

    pub fn metadata_location(&self) -> Option<&str> {
        self.metadata_location.as_deref()
    }

    /// Size of the metadata file in bytes (0 when not loaded from a file).
    pub fn metadata_length(&self) -> u64 {
        self.metadata_length
    }

    pub fn io(&self) -> &Arc<dyn IcebergStorage> {
        &self.io
    }

    /// Current table schema.
    pub fn schema(&self) -> Option<&Schema> {
        self.metadata.current_schema()
    }

    /// All retained snapshots, in metadata order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.metadata.snapshots
    }

    /// Partition specs bound to the current schema, keyed by spec ID.
    pub fn specs(&self) -> HashMap<i32, PartitionSpec> {
        self.metadata.specs_by_id()
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.metadata.properties
    }

    /// The `all_manifests` metadata table of this table.
    pub fn all_manifests(&self) -> AllManifestsTable {
        AllManifestsTable::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStorage;

    const METADATA: &str = r#"{
        "format-version": 2,
        "location": "mem://warehouse/t",
        "last-updated-ms": 1,
        "last-column-id": 1,
        "schemas": [{"type": "struct", "schema-id": 0, "fields": [
            {"id": 1, "name": "id", "required": true, "type": "long"}
        ]}],
        "snapshots": [{"snapshot-id": 1, "timestamp-ms": 1, "manifest-list": "mem://warehouse/t/metadata/snap-1.avro"}]
    }"#;

    #[tokio::test]
    async fn test_load_records_location_and_length() {
        let mut storage = MemoryStorage::new();
        storage.add_file("mem://warehouse/t/metadata/v1.metadata.json", METADATA);

        let table = Table::load("db.t", Arc::new(storage), "mem://warehouse/t/metadata/v1.metadata.json")
            .await
            .unwrap();

        assert_eq!(table.name(), "db.t");
        assert_eq!(
            table.metadata_location(),
            Some("mem://warehouse/t/metadata/v1.metadata.json")
        );
        assert_eq!(table.metadata_length(), METADATA.len() as u64);
        assert_eq!(table.snapshots().len(), 1);
        assert_eq!(table.schema().unwrap().column_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_load_missing_file_carries_path() {
        let err = Table::load("db.t", Arc::new(MemoryStorage::new()), "mem://nope.json")
            .await
            .unwrap_err();
        assert!(err.is_io());
        assert_eq!(err.path(), Some("mem://nope.json"));
    }
}
