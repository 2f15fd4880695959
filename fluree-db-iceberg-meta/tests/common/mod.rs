//! Shared fixtures for integration tests.
//!
//! Manifest-list files are written with `apache_avro::Writer` against the
//! same Avro layouts real writers produce.

#![allow(dead_code)]

use std::sync::Arc;

use apache_avro::types::{Record, Value as AvroValue};
use apache_avro::{Schema as AvroSchema, Writer};
use bytes::Bytes;
use fluree_db_iceberg_meta::manifest::{MANIFEST_LIST_SCHEMA_V1, MANIFEST_LIST_SCHEMA_V2};
use fluree_db_iceberg_meta::{
    IcebergStorage, ManifestContent, ManifestListEntry, PartitionFieldSummary, Snapshot, Table,
    TableMetadata,
};

/// Metadata of a v2 table partitioned by `identity(category)` and `bucket[4](id)`.
pub const TABLE_METADATA: &str = r#"{
    "format-version": 2,
    "table-uuid": "3f1e1a5c-8d3e-4c41-9d7a-6a1b8a0b5f10",
    "location": "mem://warehouse/db/events",
    "last-sequence-number": 2,
    "last-updated-ms": 1700000000000,
    "last-column-id": 3,
    "current-schema-id": 0,
    "schemas": [{
        "type": "struct",
        "schema-id": 0,
        "fields": [
            {"id": 1, "name": "id", "required": true, "type": "long"},
            {"id": 2, "name": "category", "required": false, "type": "string"},
            {"id": 3, "name": "ts", "required": false, "type": "timestamp"}
        ]
    }],
    "default-spec-id": 0,
    "partition-specs": [{
        "spec-id": 0,
        "fields": [
            {"source-id": 2, "field-id": 1000, "name": "category", "transform": "identity"},
            {"source-id": 1, "field-id": 1001, "name": "id_bucket", "transform": "bucket[4]"}
        ]
    }],
    "properties": {"owner": "fluree"}
}"#;

pub fn table_metadata() -> TableMetadata {
    TableMetadata::from_json_str(TABLE_METADATA).unwrap()
}

/// A table over [`TABLE_METADATA`] with the given snapshots.
pub fn table(io: Arc<dyn IcebergStorage>, snapshots: Vec<Snapshot>) -> Table {
    let mut metadata = table_metadata();
    metadata.current_snapshot_id = snapshots.last().map(|s| s.snapshot_id);
    metadata.snapshots = snapshots;
    Table::new("db.events", metadata, io)
        .with_metadata_location("mem://warehouse/db/events/metadata/v3.metadata.json", 4096)
}

/// A data manifest with both partition summaries filled in.
pub fn data_manifest(path: &str, snapshot_id: i64) -> ManifestListEntry {
    let mut entry = ManifestListEntry::new(path, 6000 + path.len() as i64, 0)
        .with_added_snapshot_id(snapshot_id)
        .with_file_counts(4, 2, 1)
        .with_partitions(vec![
            PartitionFieldSummary::new(false)
                .with_contains_nan(false)
                .with_bounds(Some(b"books".to_vec()), Some(b"toys".to_vec())),
            PartitionFieldSummary::new(false)
                .with_contains_nan(false)
                .with_bounds(Some(0i32.to_le_bytes().to_vec()), Some(3i32.to_le_bytes().to_vec())),
        ]);
    entry.sequence_number = snapshot_id;
    entry.min_sequence_number = 1;
    entry.added_rows_count = Some(400);
    entry.existing_rows_count = Some(200);
    entry.deleted_rows_count = Some(100);
    entry
}

/// A position-delete manifest.
pub fn delete_manifest(path: &str, snapshot_id: i64) -> ManifestListEntry {
    data_manifest(path, snapshot_id)
        .with_content(ManifestContent::Deletes)
        .with_file_counts(3, 0, 2)
}

fn optional<T>(value: Option<T>, to_avro: impl FnOnce(T) -> AvroValue) -> AvroValue {
    match value {
        Some(v) => AvroValue::Union(1, Box::new(to_avro(v))),
        None => AvroValue::Union(0, Box::new(AvroValue::Null)),
    }
}

fn summaries(entry: &ManifestListEntry, with_nan: bool) -> AvroValue {
    optional(entry.partitions.as_ref(), |parts| {
        AvroValue::Array(
            parts
                .iter()
                .map(|p| {
                    let mut fields = vec![("contains_null".to_string(), AvroValue::Boolean(p.contains_null))];
                    if with_nan {
                        fields.push((
                            "contains_nan".to_string(),
                            optional(p.contains_nan, AvroValue::Boolean),
                        ));
                    }
                    fields.push(("lower_bound".to_string(), optional(p.lower_bound.clone(), AvroValue::Bytes)));
                    fields.push(("upper_bound".to_string(), optional(p.upper_bound.clone(), AvroValue::Bytes)));
                    AvroValue::Record(fields)
                })
                .collect(),
        )
    })
}

/// Encode entries as a manifest-list file in the v2 layout.
pub fn write_manifest_list(entries: &[ManifestListEntry]) -> Bytes {
    let schema = AvroSchema::parse_str(MANIFEST_LIST_SCHEMA_V2).unwrap();
    let mut writer = Writer::new(&schema, Vec::new());

    for entry in entries {
        let mut record = Record::new(writer.schema()).unwrap();
        record.put("manifest_path", entry.manifest_path.as_str());
        record.put("manifest_length", entry.manifest_length);
        record.put("partition_spec_id", entry.partition_spec_id);
        record.put("content", entry.content.id());
        record.put("sequence_number", entry.sequence_number);
        record.put("min_sequence_number", entry.min_sequence_number);
        record.put("added_snapshot_id", entry.added_snapshot_id.unwrap_or(-1));
        record.put("added_data_files_count", entry.added_data_files_count.unwrap_or(0));
        record.put("existing_data_files_count", entry.existing_data_files_count.unwrap_or(0));
        record.put("deleted_data_files_count", entry.deleted_data_files_count.unwrap_or(0));
        record.put("added_rows_count", entry.added_rows_count.unwrap_or(0));
        record.put("existing_rows_count", entry.existing_rows_count.unwrap_or(0));
        record.put("deleted_rows_count", entry.deleted_rows_count.unwrap_or(0));
        record.put("partitions", summaries(entry, true));
        record.put("key_metadata", optional(entry.key_metadata.clone(), AvroValue::Bytes));
        writer.append(record).unwrap();
    }

    Bytes::from(writer.into_inner().unwrap())
}

/// Encode entries as a manifest-list file in the legacy v1 layout.
///
/// Content, sequence numbers and NaN flags do not exist in this layout.
pub fn write_legacy_manifest_list(entries: &[ManifestListEntry]) -> Bytes {
    let schema = AvroSchema::parse_str(MANIFEST_LIST_SCHEMA_V1).unwrap();
    let mut writer = Writer::new(&schema, Vec::new());

    for entry in entries {
        let mut record = Record::new(writer.schema()).unwrap();
        record.put("manifest_path", entry.manifest_path.as_str());
        record.put("manifest_length", entry.manifest_length);
        record.put("partition_spec_id", entry.partition_spec_id);
        record.put("added_snapshot_id", optional(entry.added_snapshot_id, AvroValue::Long));
        record.put("added_files_count", optional(entry.added_data_files_count, AvroValue::Int));
        record.put("existing_files_count", optional(entry.existing_data_files_count, AvroValue::Int));
        record.put("deleted_files_count", optional(entry.deleted_data_files_count, AvroValue::Int));
        record.put("partitions", summaries(entry, false));
        record.put("added_rows_count", optional(entry.added_rows_count, AvroValue::Long));
        record.put("existing_rows_count", optional(entry.existing_rows_count, AvroValue::Long));
        record.put("deleted_rows_count", optional(entry.deleted_rows_count, AvroValue::Long));
        writer.append(record).unwrap();
    }

    Bytes::from(writer.into_inner().unwrap())
}
