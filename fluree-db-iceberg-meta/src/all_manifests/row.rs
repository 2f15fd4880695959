//! Conversion of manifest-list entries into `all_manifests` rows.

use crate::manifest::{ManifestContent, ManifestListEntry, PartitionFieldSummary};
use crate::metadata::PartitionSpec;
use crate::row::{Row, Value};

/// Build the `all_manifests` row for a manifest-list entry.
///
/// The row follows [`super::all_manifests_schema`] column order. Data file
/// counters are only set for data manifests and delete file counters only
/// for delete manifests; the other group is zero. `partition_summaries` has
/// exactly one element per field of `spec` (none when `spec` is `None`).
pub fn manifest_file_to_row(spec: Option<&PartitionSpec>, entry: &ManifestListEntry) -> Row {
    let is_data = entry.content == ManifestContent::Data;
    let is_deletes = entry.content == ManifestContent::Deletes;

    let data_count = |count: Option<i32>| {
        if is_data {
            Value::from(count)
        } else {
            Value::Int(0)
        }
    };
    let delete_count = |count: Option<i32>| {
        if is_deletes {
            Value::Int(count.unwrap_or(0))
        } else {
            Value::Int(0)
        }
    };

    Row::new(vec![
        Value::Int(entry.content.id()),
        Value::from(entry.manifest_path.as_str()),
        Value::Long(entry.manifest_length),
        Value::Int(entry.partition_spec_id),
        Value::from(entry.added_snapshot_id),
        data_count(entry.added_data_files_count),
        data_count(entry.existing_data_files_count),
        data_count(entry.deleted_data_files_count),
        delete_count(entry.added_data_files_count),
        delete_count(entry.existing_data_files_count),
        delete_count(entry.deleted_data_files_count),
        Value::List(partition_summaries(spec, entry.partitions.as_deref())),
    ])
}

fn partition_summaries(
    spec: Option<&PartitionSpec>,
    summaries: Option<&[PartitionFieldSummary]>,
) -> Vec<Value> {
    let Some(spec) = spec else {
        return Vec::new();
    };
    let summaries = summaries.unwrap_or_default();
    let missing = PartitionFieldSummary::default();

    spec.fields()
        .iter()
        .enumerate()
        .map(|(pos, field)| {
            let summary = summaries.get(pos).unwrap_or(&missing);
            let bound = |bytes: &Option<Vec<u8>>| {
                Value::from(bytes.as_deref().and_then(|b| field.human_string(b)))
            };
            Value::Struct(Row::new(vec![
                Value::Boolean(summary.contains_null),
                Value::Boolean(summary.contains_nan.unwrap_or(false)),
                bound(&summary.lower_bound),
                bound(&summary.upper_bound),
            ]))
        })
        .collect()
}
