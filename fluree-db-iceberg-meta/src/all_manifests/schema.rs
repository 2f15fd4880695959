//! Output schema of the `all_manifests` table.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::Result;
use crate::manifest::manifest_list::field_ids as list_ids;
use crate::manifest::manifest_file_schema;
use crate::types::{ListType, NestedField, PrimitiveType, Schema, StructType};

/// Field IDs of the `all_manifests` schema. These never change.
pub mod field_ids {
    pub const CONTENT: i32 = 14;
    pub const PATH: i32 = 1;
    pub const LENGTH: i32 = 2;
    pub const PARTITION_SPEC_ID: i32 = 3;
    pub const ADDED_SNAPSHOT_ID: i32 = 4;
    pub const ADDED_DATA_FILES_COUNT: i32 = 5;
    pub const EXISTING_DATA_FILES_COUNT: i32 = 6;
    pub const DELETED_DATA_FILES_COUNT: i32 = 7;
    pub const ADDED_DELETE_FILES_COUNT: i32 = 15;
    pub const EXISTING_DELETE_FILES_COUNT: i32 = 16;
    pub const DELETED_DELETE_FILES_COUNT: i32 = 17;
    pub const PARTITION_SUMMARIES: i32 = 8;
    pub const PARTITION_SUMMARY: i32 = 9;
    pub const CONTAINS_NULL: i32 = 10;
    pub const CONTAINS_NAN: i32 = 11;
    pub const LOWER_BOUND: i32 = 12;
    pub const UPPER_BOUND: i32 = 13;
}

static ALL_MANIFESTS_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    use field_ids::*;

    Schema::new(vec![
        NestedField::required(CONTENT, "content", PrimitiveType::Int),
        NestedField::required(PATH, "path", PrimitiveType::String),
        NestedField::required(LENGTH, "length", PrimitiveType::Long),
        NestedField::optional(PARTITION_SPEC_ID, "partition_spec_id", PrimitiveType::Int),
        NestedField::optional(ADDED_SNAPSHOT_ID, "added_snapshot_id", PrimitiveType::Long),
        NestedField::optional(
            ADDED_DATA_FILES_COUNT,
            "added_data_files_count",
            PrimitiveType::Int,
        ),
        NestedField::optional(
            EXISTING_DATA_FILES_COUNT,
            "existing_data_files_count",
            PrimitiveType::Int,
        ),
        NestedField::optional(
            DELETED_DATA_FILES_COUNT,
            "deleted_data_files_count",
            PrimitiveType::Int,
        ),
        NestedField::required(
            ADDED_DELETE_FILES_COUNT,
            "added_delete_files_count",
            PrimitiveType::Int,
        ),
        NestedField::required(
            EXISTING_DELETE_FILES_COUNT,
            "existing_delete_files_count",
            PrimitiveType::Int,
        ),
        NestedField::required(
            DELETED_DELETE_FILES_COUNT,
            "deleted_delete_files_count",
            PrimitiveType::Int,
        ),
        NestedField::optional(
            PARTITION_SUMMARIES,
            "partition_summaries",
            ListType::of_required(
                PARTITION_SUMMARY,
                StructType::new(vec![
                    NestedField::required(CONTAINS_NULL, "contains_null", PrimitiveType::Boolean),
                    NestedField::required(CONTAINS_NAN, "contains_nan", PrimitiveType::Boolean),
                    NestedField::optional(LOWER_BOUND, "lower_bound", PrimitiveType::String),
                    NestedField::optional(UPPER_BOUND, "upper_bound", PrimitiveType::String),
                ]),
            ),
        ),
    ])
});

/// The `all_manifests` schema.
pub fn all_manifests_schema() -> &'static Schema {
    &ALL_MANIFESTS_SCHEMA
}

/// Manifest-list fields needed to produce the columns of `projected`.
///
/// The result is a sub-schema of [`manifest_file_schema`] suitable for
/// [`crate::manifest::ManifestListReaderBuilder::project`]. Path, length and
/// spec ID are always read.
pub fn manifest_file_projection(projected: &Schema) -> Result<Schema> {
    use field_ids::*;

    let wanted: HashSet<i32> = projected.index_by_id().keys().copied().collect();
    let mut ids = vec![
        list_ids::MANIFEST_PATH,
        list_ids::MANIFEST_LENGTH,
        list_ids::PARTITION_SPEC_ID,
    ];

    let direct = [
        (CONTENT, list_ids::CONTENT),
        (ADDED_SNAPSHOT_ID, list_ids::ADDED_SNAPSHOT_ID),
        (ADDED_DATA_FILES_COUNT, list_ids::ADDED_FILES_COUNT),
        (EXISTING_DATA_FILES_COUNT, list_ids::EXISTING_FILES_COUNT),
        (DELETED_DATA_FILES_COUNT, list_ids::DELETED_FILES_COUNT),
        (ADDED_DELETE_FILES_COUNT, list_ids::ADDED_FILES_COUNT),
        (EXISTING_DELETE_FILES_COUNT, list_ids::EXISTING_FILES_COUNT),
        (DELETED_DELETE_FILES_COUNT, list_ids::DELETED_FILES_COUNT),
    ];
    for (output, source) in direct {
        if wanted.contains(&output) {
            ids.push(source);
        }
    }

    // File counters land in data or delete columns depending on content
    let counters = [
        ADDED_DATA_FILES_COUNT,
        EXISTING_DATA_FILES_COUNT,
        DELETED_DATA_FILES_COUNT,
        ADDED_DELETE_FILES_COUNT,
        EXISTING_DELETE_FILES_COUNT,
        DELETED_DELETE_FILES_COUNT,
    ];
    if counters.iter().any(|id| wanted.contains(id)) {
        ids.push(list_ids::CONTENT);
    }

    let summary_fields = [
        (CONTAINS_NULL, list_ids::CONTAINS_NULL),
        (CONTAINS_NAN, list_ids::CONTAINS_NAN),
        (LOWER_BOUND, list_ids::LOWER_BOUND),
        (UPPER_BOUND, list_ids::UPPER_BOUND),
    ];
    let summary_ids: Vec<i32> = summary_fields
        .iter()
        .filter(|(output, _)| wanted.contains(output))
        .map(|(_, source)| *source)
        .collect();
    if summary_ids.is_empty() {
        if wanted.contains(&PARTITION_SUMMARIES) {
            ids.push(list_ids::PARTITIONS);
        }
    } else {
        ids.extend(summary_ids);
    }

    ids.sort_unstable();
    ids.dedup();
    manifest_file_schema().select_ids(&ids)
}
