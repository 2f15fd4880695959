//! Manifest list entries for Iceberg tables.
//!
//! A manifest list is an Avro file that lists all manifest files for a snapshot,
//! along with partition field summaries for manifest-level pruning. The logical
//! record layout is fixed by field ID; [`manifest_file_schema`] describes it.
//!
//! Older writers used different record and field names for the same IDs
//! (`r508` for the summary record, `added_files_count` before delete files
//! existed). [`crate::manifest::reader`] maps those names back onto this layout.

use std::sync::LazyLock;

use crate::types::{ListType, NestedField, PrimitiveType, Schema, StructType};

/// Field IDs of the logical manifest-list record.
pub mod field_ids {
    pub const MANIFEST_PATH: i32 = 500;
    pub const MANIFEST_LENGTH: i32 = 501;
    pub const PARTITION_SPEC_ID: i32 = 502;
    pub const ADDED_SNAPSHOT_ID: i32 = 503;
    pub const ADDED_FILES_COUNT: i32 = 504;
    pub const EXISTING_FILES_COUNT: i32 = 505;
    pub const DELETED_FILES_COUNT: i32 = 506;
    pub const PARTITIONS: i32 = 507;
    pub const PARTITION_SUMMARY: i32 = 508;
    pub const CONTAINS_NULL: i32 = 509;
    pub const LOWER_BOUND: i32 = 510;
    pub const UPPER_BOUND: i32 = 511;
    pub const ADDED_ROWS_COUNT: i32 = 512;
    pub const EXISTING_ROWS_COUNT: i32 = 513;
    pub const DELETED_ROWS_COUNT: i32 = 514;
    pub const SEQUENCE_NUMBER: i32 = 515;
    pub const MIN_SEQUENCE_NUMBER: i32 = 516;
    pub const CONTENT: i32 = 517;
    pub const CONTAINS_NAN: i32 = 518;
    pub const KEY_METADATA: i32 = 519;
}

/// Logical name of the manifest-list record.
pub const MANIFEST_FILE_RECORD: &str = "manifest_file";

/// Logical name of the partition summary record.
pub const FIELD_SUMMARY_RECORD: &str = "field_summary";

static MANIFEST_FILE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    use field_ids::*;

    Schema::new(vec![
        NestedField::required(MANIFEST_PATH, "manifest_path", PrimitiveType::String),
        NestedField::required(MANIFEST_LENGTH, "manifest_length", PrimitiveType::Long),
        NestedField::required(PARTITION_SPEC_ID, "partition_spec_id", PrimitiveType::Int),
        NestedField::optional(CONTENT, "content", PrimitiveType::Int),
        NestedField::optional(SEQUENCE_NUMBER, "sequence_number", PrimitiveType::Long),
        NestedField::optional(MIN_SEQUENCE_NUMBER, "min_sequence_number", PrimitiveType::Long),
        NestedField::optional(ADDED_SNAPSHOT_ID, "added_snapshot_id", PrimitiveType::Long),
        NestedField::optional(ADDED_FILES_COUNT, "added_data_files_count", PrimitiveType::Int),
        NestedField::optional(
            EXISTING_FILES_COUNT,
            "existing_data_files_count",
            PrimitiveType::Int,
        ),
        NestedField::optional(DELETED_FILES_COUNT, "deleted_data_files_count", PrimitiveType::Int),
        NestedField::optional(ADDED_ROWS_COUNT, "added_rows_count", PrimitiveType::Long),
        NestedField::optional(EXISTING_ROWS_COUNT, "existing_rows_count", PrimitiveType::Long),
        NestedField::optional(DELETED_ROWS_COUNT, "deleted_rows_count", PrimitiveType::Long),
        NestedField::optional(
            PARTITIONS,
            "partitions",
            ListType::of_required(
                PARTITION_SUMMARY,
                StructType::new(vec![
                    NestedField::required(CONTAINS_NULL, "contains_null", PrimitiveType::Boolean),
                    NestedField::optional(CONTAINS_NAN, "contains_nan", PrimitiveType::Boolean),
                    NestedField::optional(LOWER_BOUND, "lower_bound", PrimitiveType::Binary),
                    NestedField::optional(UPPER_BOUND, "upper_bound", PrimitiveType::Binary),
                ]),
            ),
        ),
        NestedField::optional(KEY_METADATA, "key_metadata", PrimitiveType::Binary),
    ])
});

/// The logical schema of a manifest-list record, keyed by field ID.
pub fn manifest_file_schema() -> &'static Schema {
    &MANIFEST_FILE_SCHEMA
}

/// The partition summary struct of [`manifest_file_schema`].
pub fn field_summary_type() -> &'static StructType {
    static SUMMARY: LazyLock<StructType> = LazyLock::new(|| {
        manifest_file_schema()
            .field_by_id(field_ids::PARTITION_SUMMARY)
            .and_then(|f| f.field_type.as_struct())
            .cloned()
            .unwrap_or_default()
    });
    &SUMMARY
}

/// Content type for manifest files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestContent {
    /// Data files (default)
    #[default]
    Data = 0,
    /// Delete files (equality or position deletes)
    Deletes = 1,
}

impl ManifestContent {
    /// Parse from Avro integer value. Unknown values are treated as data.
    pub fn from_avro(value: i32) -> Self {
        match value {
            1 => Self::Deletes,
            _ => Self::Data,
        }
    }

    /// The integer ID stored in manifest lists.
    pub fn id(&self) -> i32 {
        *self as i32
    }
}

/// Partition field summary from manifest list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionFieldSummary {
    /// Whether this field contains any null values
    pub contains_null: bool,
    /// Whether this field contains any NaN values (absent in v1 lists)
    pub contains_nan: Option<bool>,
    /// Lower bound for this field (Iceberg binary encoding)
    pub lower_bound: Option<Vec<u8>>,
    /// Upper bound for this field (Iceberg binary encoding)
    pub upper_bound: Option<Vec<u8>>,
}

impl PartitionFieldSummary {
    pub fn new(contains_null: bool) -> Self {
        Self {
            contains_null,
            ..Default::default()
        }
    }

    pub fn with_bounds(mut self, lower: Option<Vec<u8>>, upper: Option<Vec<u8>>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn with_contains_nan(mut self, contains_nan: bool) -> Self {
        self.contains_nan = Some(contains_nan);
        self
    }
}

/// Entry in a manifest list (points to a manifest file).
///
/// Optional fields are `None` when the writer did not record them or when
/// they were not part of the read projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestListEntry {
    /// Path to the manifest file
    pub manifest_path: String,
    /// Length of the manifest file in bytes
    pub manifest_length: i64,
    /// Partition spec ID used by this manifest
    pub partition_spec_id: i32,
    /// Content type: Data or Deletes
    pub content: ManifestContent,
    /// Sequence number when this manifest was added (0 for v1)
    pub sequence_number: i64,
    /// Minimum sequence number of files in this manifest (0 for v1)
    pub min_sequence_number: i64,
    /// Snapshot ID that added this manifest
    pub added_snapshot_id: Option<i64>,
    /// Number of files added by this manifest
    pub added_data_files_count: Option<i32>,
    /// Number of files with existing status in this manifest
    pub existing_data_files_count: Option<i32>,
    /// Number of files deleted by this manifest
    pub deleted_data_files_count: Option<i32>,
    /// Number of rows added by this manifest
    pub added_rows_count: Option<i64>,
    /// Number of rows in existing files
    pub existing_rows_count: Option<i64>,
    /// Number of rows deleted by this manifest
    pub deleted_rows_count: Option<i64>,
    /// Partition field summaries, one per partition field
    pub partitions: Option<Vec<PartitionFieldSummary>>,
    /// Encryption key metadata
    pub key_metadata: Option<Vec<u8>>,
}

impl ManifestListEntry {
    /// A data manifest with only the required fields set.
    pub fn new(manifest_path: impl Into<String>, manifest_length: i64, partition_spec_id: i32) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            manifest_length,
            partition_spec_id,
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: ManifestContent) -> Self {
        self.content = content;
        self
    }

    pub fn with_added_snapshot_id(mut self, snapshot_id: i64) -> Self {
        self.added_snapshot_id = Some(snapshot_id);
        self
    }

    /// Set added/existing/deleted file counts.
    pub fn with_file_counts(mut self, added: i32, existing: i32, deleted: i32) -> Self {
        self.added_data_files_count = Some(added);
        self.existing_data_files_count = Some(existing);
        self.deleted_data_files_count = Some(deleted);
        self
    }

    pub fn with_partitions(mut self, partitions: Vec<PartitionFieldSummary>) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Check if this is a data manifest (not deletes).
    pub fn is_data(&self) -> bool {
        self.content == ManifestContent::Data
    }

    /// Check if this is a delete manifest.
    pub fn is_deletes(&self) -> bool {
        self.content == ManifestContent::Deletes
    }
}

/// Avro layout written by format v2 writers.
pub const MANIFEST_LIST_SCHEMA_V2: &str = r#"{
  "type": "record",
  "name": "manifest_file",
  "fields": [
    {"name": "manifest_path", "type": "string", "field-id": 500},
    {"name": "manifest_length", "type": "long", "field-id": 501},
    {"name": "partition_spec_id", "type": "int", "field-id": 502},
    {"name": "content", "type": "int", "default": 0, "field-id": 517},
    {"name": "sequence_number", "type": "long", "default": 0, "field-id": 515},
    {"name": "min_sequence_number", "type": "long", "default": 0, "field-id": 516},
    {"name": "added_snapshot_id", "type": "long", "field-id": 503},
    {"name": "added_data_files_count", "type": "int", "field-id": 504},
    {"name": "existing_data_files_count", "type": "int", "field-id": 505},
    {"name": "deleted_data_files_count", "type": "int", "field-id": 506},
    {"name": "added_rows_count", "type": "long", "field-id": 512},
    {"name": "existing_rows_count", "type": "long", "field-id": 513},
    {"name": "deleted_rows_count", "type": "long", "field-id": 514},
    {"name": "partitions", "type": ["null", {
      "type": "array",
      "element-id": 508,
      "items": {
        "type": "record",
        "name": "r508",
        "fields": [
          {"name": "contains_null", "type": "boolean", "field-id": 509},
          {"name": "contains_nan", "type": ["null", "boolean"], "default": null, "field-id": 518},
          {"name": "lower_bound", "type": ["null", "bytes"], "default": null, "field-id": 510},
          {"name": "upper_bound", "type": ["null", "bytes"], "default": null, "field-id": 511}
        ]
      }
    }], "default": null, "field-id": 507},
    {"name": "key_metadata", "type": ["null", "bytes"], "default": null, "field-id": 519}
  ]
}"#;

/// Avro layout written by format v1 writers, before delete files existed.
pub const MANIFEST_LIST_SCHEMA_V1: &str = r#"{
  "type": "record",
  "name": "manifest_file",
  "fields": [
    {"name": "manifest_path", "type": "string", "field-id": 500},
    {"name": "manifest_length", "type": "long", "field-id": 501},
    {"name": "partition_spec_id", "type": "int", "field-id": 502},
    {"name": "added_snapshot_id", "type": ["null", "long"], "default": null, "field-id": 503},
    {"name": "added_files_count", "type": ["null", "int"], "default": null, "field-id": 504},
    {"name": "existing_files_count", "type": ["null", "int"], "default": null, "field-id": 505},
    {"name": "deleted_files_count", "type": ["null", "int"], "default": null, "field-id": 506},
    {"name": "partitions", "type": ["null", {
      "type": "array",
      "element-id": 508,
      "items": {
        "type": "record",
        "name": "partitions",
        "fields": [
          {"name": "contains_null", "type": "boolean", "field-id": 509},
          {"name": "lower_bound", "type": ["null", "bytes"], "default": null, "field-id": 510},
          {"name": "upper_bound", "type": ["null", "bytes"], "default": null, "field-id": 511}
        ]
      }
    }], "default": null, "field-id": 507},
    {"name": "added_rows_count", "type": ["null", "long"], "default": null, "field-id": 512},
    {"name": "existing_rows_count", "type": ["null", "long"], "default": null, "field-id": 513},
    {"name": "deleted_rows_count", "type": ["null", "long"], "default": null, "field-id": 514}
  ]
}"#;
