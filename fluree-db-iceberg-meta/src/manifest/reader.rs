//! Streaming manifest-list decoder.
//!
//! [`ManifestListReader`] decodes the records of a manifest-list Avro file one
//! at a time. Writer field names are mapped onto the logical layout of
//! [`manifest_file_schema`] by field ID when the writer schema carries
//! `field-id` attributes, and by name (after [`RenameRules`]) otherwise, so
//! files written by older format versions decode without migration.
//!
//! Projection is applied after Avro decoding: `apache_avro` still decodes
//! every writer field of a record, and the reader only skips converting
//! unrequested fields into [`ManifestListEntry`] values.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use apache_avro::types::Value as AvroValue;
use bytes::Bytes;
use serde_json::Value as JsonValue;

use super::manifest_list::{
    field_ids::*, field_summary_type, manifest_file_schema, ManifestContent, ManifestListEntry,
    PartitionFieldSummary, FIELD_SUMMARY_RECORD, MANIFEST_FILE_RECORD,
};
use crate::error::{IcebergError, Result};
use crate::types::{Schema, StructType};

/// What a [`RenameRule`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameKind {
    /// An Avro record (type) name
    Record,
    /// A field name inside a record
    Field,
}

/// Maps a name used by older writers to its current logical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameRule {
    pub kind: RenameKind,
    pub legacy: &'static str,
    pub current: &'static str,
    /// Format version that introduced the current name.
    pub format_version: u8,
}

impl RenameRule {
    pub const fn record(legacy: &'static str, current: &'static str, format_version: u8) -> Self {
        Self {
            kind: RenameKind::Record,
            legacy,
            current,
            format_version,
        }
    }

    pub const fn field(legacy: &'static str, current: &'static str, format_version: u8) -> Self {
        Self {
            kind: RenameKind::Field,
            legacy,
            current,
            format_version,
        }
    }
}

/// Names older manifest-list writers used for the current layout.
pub const MANIFEST_LIST_RENAMES: &[RenameRule] = &[
    RenameRule::record("r508", FIELD_SUMMARY_RECORD, 1),
    RenameRule::record("partitions", FIELD_SUMMARY_RECORD, 1),
    RenameRule::field("added_files_count", "added_data_files_count", 2),
    RenameRule::field("existing_files_count", "existing_data_files_count", 2),
    RenameRule::field("deleted_files_count", "deleted_data_files_count", 2),
];

/// Legacy-to-current name table applied while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRules {
    records: HashMap<String, String>,
    fields: HashMap<String, String>,
}

impl Default for RenameRules {
    fn default() -> Self {
        Self::manifest_list()
    }
}

impl RenameRules {
    /// No renames.
    pub fn empty() -> Self {
        Self {
            records: HashMap::new(),
            fields: HashMap::new(),
        }
    }

    /// The renames needed to read every manifest-list format version.
    pub fn manifest_list() -> Self {
        Self::from_rules(MANIFEST_LIST_RENAMES)
    }

    pub fn from_rules(rules: &[RenameRule]) -> Self {
        rules.iter().fold(Self::empty(), |acc, rule| match rule.kind {
            RenameKind::Record => acc.rename_record(rule.legacy, rule.current),
            RenameKind::Field => acc.rename_field(rule.legacy, rule.current),
        })
    }

    pub fn rename_record(mut self, legacy: impl Into<String>, current: impl Into<String>) -> Self {
        self.records.insert(legacy.into(), current.into());
        self
    }

    pub fn rename_field(mut self, legacy: impl Into<String>, current: impl Into<String>) -> Self {
        self.fields.insert(legacy.into(), current.into());
        self
    }

    /// Current name for a record name (unchanged when no rule applies).
    pub fn record_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.records.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Current name for a field name (unchanged when no rule applies).
    pub fn field_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.fields.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Writer field name to logical field ID, per record.
#[derive(Debug, Default)]
struct WriterLayout {
    entry: HashMap<String, i32>,
    summary: HashMap<String, i32>,
}

impl WriterLayout {
    fn resolve(schema: &apache_avro::Schema, rules: &RenameRules) -> std::result::Result<Self, String> {
        let json = serde_json::to_value(schema)
            .map_err(|e| format!("Cannot inspect writer schema: {}", e))?;

        check_record_name(&json, rules, MANIFEST_FILE_RECORD)?;
        let fields = record_fields(&json)?;
        let entry = map_fields(fields, manifest_file_schema().as_struct(), rules);

        let partitions = entry
            .iter()
            .find(|(_, id)| **id == PARTITIONS)
            .map(|(name, _)| name.as_str())
            .and_then(|name| {
                fields
                    .iter()
                    .find(|f| f.get("name").and_then(JsonValue::as_str) == Some(name))
            })
            .and_then(|field| field.get("type"))
            .and_then(array_item_record);

        let summary = match partitions {
            Some(record) => {
                check_record_name(record, rules, FIELD_SUMMARY_RECORD)?;
                map_fields(record_fields(record)?, field_summary_type(), rules)
            }
            None => field_summary_type()
                .fields()
                .iter()
                .map(|f| (f.name.clone(), f.id))
                .collect(),
        };

        Ok(Self { entry, summary })
    }
}

fn check_record_name(
    record: &JsonValue,
    rules: &RenameRules,
    expected: &str,
) -> std::result::Result<(), String> {
    let full_name = record
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| "Writer schema is not a named record".to_string())?;
    let name = full_name.rsplit('.').next().unwrap_or(full_name);
    let current = rules.record_name(name);
    if current != expected {
        return Err(format!(
            "Unexpected record type '{}' (expected '{}')",
            full_name, expected
        ));
    }
    Ok(())
}

fn record_fields(record: &JsonValue) -> std::result::Result<&Vec<JsonValue>, String> {
    record
        .get("fields")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| "Writer record has no fields".to_string())
}

/// Find the record schema of array items, looking through unions.
fn array_item_record(ty: &JsonValue) -> Option<&JsonValue> {
    match ty {
        JsonValue::Array(branches) => branches.iter().find_map(array_item_record),
        JsonValue::Object(obj) if obj.get("type").and_then(JsonValue::as_str) == Some("array") => {
            obj.get("items").filter(|items| items.is_object())
        }
        _ => None,
    }
}

fn map_fields(fields: &[JsonValue], logical: &StructType, rules: &RenameRules) -> HashMap<String, i32> {
    let mut mapped = HashMap::new();
    for field in fields {
        let Some(name) = field.get("name").and_then(JsonValue::as_str) else {
            continue;
        };
        let by_id = field
            .get("field-id")
            .and_then(JsonValue::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .filter(|id| logical.field(*id).is_some());
        let id = by_id.or_else(|| logical.field_by_name(rules.field_name(name)).map(|f| f.id));
        if let Some(id) = id {
            mapped.insert(name.to_string(), id);
        }
    }
    mapped
}

/// Lazily decodes the records of one manifest-list file.
///
/// Every yielded entry is an owned value. The reader is fused after the first
/// error.
pub struct ManifestListReader {
    location: String,
    reader: apache_avro::Reader<'static, Cursor<Bytes>>,
    layout: WriterLayout,
    projected: HashSet<i32>,
    records_read: usize,
    done: bool,
}

impl std::fmt::Debug for ManifestListReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestListReader")
            .field("location", &self.location)
            .field("records_read", &self.records_read)
            .field("done", &self.done)
            .finish()
    }
}

impl ManifestListReader {
    pub fn builder(location: impl Into<String>) -> ManifestListReaderBuilder {
        ManifestListReaderBuilder {
            location: location.into(),
            rules: RenameRules::default(),
            projection: None,
        }
    }

    /// Location of the file being decoded.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn decode_entry(&self, value: AvroValue) -> std::result::Result<ManifestListEntry, String> {
        let AvroValue::Record(fields) = value else {
            return Err("Expected Avro record for manifest list entry".to_string());
        };

        let mut entry = ManifestListEntry::default();
        let mut seen = HashSet::new();

        for (name, value) in fields {
            let Some(&id) = self.layout.entry.get(&name) else {
                continue;
            };
            if !self.projected.contains(&id) {
                continue;
            }
            seen.insert(id);

            let value = unwrap_union(value);
            match id {
                MANIFEST_PATH => entry.manifest_path = required(&name, string(&name, value)?)?,
                MANIFEST_LENGTH => entry.manifest_length = required(&name, long(&name, value)?)?,
                PARTITION_SPEC_ID => entry.partition_spec_id = required(&name, int(&name, value)?)?,
                CONTENT => {
                    entry.content = ManifestContent::from_avro(int(&name, value)?.unwrap_or(0))
                }
                SEQUENCE_NUMBER => entry.sequence_number = long(&name, value)?.unwrap_or(0),
                MIN_SEQUENCE_NUMBER => entry.min_sequence_number = long(&name, value)?.unwrap_or(0),
                ADDED_SNAPSHOT_ID => entry.added_snapshot_id = long(&name, value)?,
                ADDED_FILES_COUNT => entry.added_data_files_count = int(&name, value)?,
                EXISTING_FILES_COUNT => entry.existing_data_files_count = int(&name, value)?,
                DELETED_FILES_COUNT => entry.deleted_data_files_count = int(&name, value)?,
                ADDED_ROWS_COUNT => entry.added_rows_count = long(&name, value)?,
                EXISTING_ROWS_COUNT => entry.existing_rows_count = long(&name, value)?,
                DELETED_ROWS_COUNT => entry.deleted_rows_count = long(&name, value)?,
                KEY_METADATA => entry.key_metadata = binary(&name, value)?,
                PARTITIONS => entry.partitions = self.decode_summaries(&name, value)?,
                _ => {}
            }
        }

        for id in [MANIFEST_PATH, MANIFEST_LENGTH, PARTITION_SPEC_ID] {
            if self.projected.contains(&id) && !seen.contains(&id) {
                let name = manifest_file_schema()
                    .find_column_name(id)
                    .unwrap_or_default();
                return Err(format!("Missing required field: {}", name));
            }
        }

        Ok(entry)
    }

    fn decode_summaries(
        &self,
        name: &str,
        value: AvroValue,
    ) -> std::result::Result<Option<Vec<PartitionFieldSummary>>, String> {
        match value {
            AvroValue::Null => Ok(None),
            AvroValue::Array(items) => items
                .into_iter()
                .map(|item| self.decode_summary(unwrap_union(item)))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Some),
            other => Err(unexpected(name, &other)),
        }
    }

    fn decode_summary(&self, value: AvroValue) -> std::result::Result<PartitionFieldSummary, String> {
        let AvroValue::Record(fields) = value else {
            return Err("Expected Avro record for partition field summary".to_string());
        };

        let mut summary = PartitionFieldSummary::default();
        for (name, value) in fields {
            let Some(&id) = self.layout.summary.get(&name) else {
                continue;
            };
            if !self.projected.contains(&id) {
                continue;
            }

            let value = unwrap_union(value);
            match id {
                CONTAINS_NULL => summary.contains_null = boolean(&name, value)?.unwrap_or(false),
                CONTAINS_NAN => summary.contains_nan = boolean(&name, value)?,
                LOWER_BOUND => summary.lower_bound = binary(&name, value)?,
                UPPER_BOUND => summary.upper_bound = binary(&name, value)?,
                _ => {}
            }
        }
        Ok(summary)
    }
}

impl Iterator for ManifestListReader {
    type Item = Result<ManifestListEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.reader.next()? {
            Ok(value) => self
                .decode_entry(value)
                .map_err(|msg| IcebergError::decode(&self.location, msg)),
            Err(e) => Err(IcebergError::decode(
                &self.location,
                format!("Failed to read Avro record: {}", e),
            )),
        };

        match &result {
            Ok(_) => self.records_read += 1,
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

impl Drop for ManifestListReader {
    fn drop(&mut self) {
        tracing::trace!(
            location = %self.location,
            records_read = self.records_read,
            "Closing manifest list"
        );
    }
}

/// Configures a [`ManifestListReader`].
#[derive(Debug, Clone)]
pub struct ManifestListReaderBuilder {
    location: String,
    rules: RenameRules,
    projection: Option<Schema>,
}

impl ManifestListReaderBuilder {
    pub fn rename_record(mut self, legacy: impl Into<String>, current: impl Into<String>) -> Self {
        self.rules = self.rules.rename_record(legacy, current);
        self
    }

    pub fn rename_field(mut self, legacy: impl Into<String>, current: impl Into<String>) -> Self {
        self.rules = self.rules.rename_field(legacy, current);
        self
    }

    /// Replace the rename table.
    pub fn with_rules(mut self, rules: RenameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Only convert the fields of `projection`, a sub-schema of
    /// [`manifest_file_schema`]. Fields outside it keep their defaults.
    pub fn project(mut self, projection: Schema) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Open the file contents and read the Avro header.
    pub fn build(self, data: Bytes) -> Result<ManifestListReader> {
        let logical = manifest_file_schema();
        let projected: HashSet<i32> = match &self.projection {
            Some(projection) => {
                let ids: HashSet<i32> = projection.index_by_id().keys().copied().collect();
                if let Some(id) = ids.iter().find(|id| logical.field_by_id(**id).is_none()) {
                    return Err(IcebergError::schema(format!(
                        "Field ID {} is not part of the manifest list schema",
                        id
                    )));
                }
                ids
            }
            None => logical.index_by_id().keys().copied().collect(),
        };

        let size = data.len();
        let reader = apache_avro::Reader::new(Cursor::new(data)).map_err(|e| {
            IcebergError::decode(&self.location, format!("Failed to read Avro header: {}", e))
        })?;
        let layout = WriterLayout::resolve(reader.writer_schema(), &self.rules)
            .map_err(|msg| IcebergError::decode(&self.location, msg))?;

        tracing::debug!(
            location = %self.location,
            bytes = size,
            projected_fields = projected.len(),
            "Opened manifest list"
        );

        Ok(ManifestListReader {
            location: self.location,
            reader,
            layout,
            projected,
            records_read: 0,
            done: false,
        })
    }
}

/// Decode every entry of a manifest list with the default renames.
pub fn parse_manifest_list(location: &str, data: Bytes) -> Result<Vec<ManifestListEntry>> {
    ManifestListReader::builder(location).build(data)?.collect()
}

fn unwrap_union(value: AvroValue) -> AvroValue {
    match value {
        AvroValue::Union(_, inner) => *inner,
        other => other,
    }
}

fn unexpected(name: &str, value: &AvroValue) -> String {
    format!("Unexpected value for field {}: {:?}", name, value)
}

fn required<T>(name: &str, value: Option<T>) -> std::result::Result<T, String> {
    value.ok_or_else(|| format!("Missing required field: {}", name))
}

fn string(name: &str, value: AvroValue) -> std::result::Result<Option<String>, String> {
    match value {
        AvroValue::Null => Ok(None),
        AvroValue::String(s) => Ok(Some(s)),
        other => Err(unexpected(name, &other)),
    }
}

fn int(name: &str, value: AvroValue) -> std::result::Result<Option<i32>, String> {
    match value {
        AvroValue::Null => Ok(None),
        AvroValue::Int(i) => Ok(Some(i)),
        AvroValue::Long(l) => i32::try_from(l)
            .map(Some)
            .map_err(|_| format!("Value {} of field {} does not fit an int", l, name)),
        other => Err(unexpected(name, &other)),
    }
}

fn long(name: &str, value: AvroValue) -> std::result::Result<Option<i64>, String> {
    match value {
        AvroValue::Null => Ok(None),
        AvroValue::Long(l) => Ok(Some(l)),
        AvroValue::Int(i) => Ok(Some(i as i64)),
        other => Err(unexpected(name, &other)),
    }
}

fn boolean(name: &str, value: AvroValue) -> std::result::Result<Option<bool>, String> {
    match value {
        AvroValue::Null => Ok(None),
        AvroValue::Boolean(b) => Ok(Some(b)),
        other => Err(unexpected(name, &other)),
    }
}

fn binary(name: &str, value: AvroValue) -> std::result::Result<Option<Vec<u8>>, String> {
    match value {
        AvroValue::Null => Ok(None),
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => Ok(Some(b)),
        other => Err(unexpected(name, &other)),
    }
}
