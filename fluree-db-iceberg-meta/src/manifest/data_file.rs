//! File descriptors handed to the execution path by scan tasks.
//!
//! Metadata table tasks do not read table data; their "data file" is the
//! manifest list (Avro) or the table metadata file itself.

use std::collections::HashMap;
use std::fmt;

/// File format of a metadata table task's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Manifest-list Avro file
    Avro,
    /// Table metadata JSON (rows served from memory)
    Metadata,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Avro => "AVRO",
            Self::Metadata => "METADATA",
        };
        f.write_str(s)
    }
}

/// Partition data for a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionData {
    /// Partition field values (field_id -> value bytes)
    pub values: HashMap<i32, Option<Vec<u8>>>,
}

impl PartitionData {
    /// Partition tuple of an unpartitioned file.
    pub fn unpartitioned() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A file descriptor as seen by a scan task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    /// Path to the file
    pub file_path: String,
    pub file_format: FileFormat,
    /// Number of records (1 for manifest lists, which are read whole)
    pub record_count: i64,
    /// Size of the file in bytes
    pub file_size_in_bytes: i64,
    /// Partition values
    pub partition: PartitionData,
    /// Partition spec the partition tuple conforms to
    pub spec_id: i32,
}

impl DataFile {
    /// Descriptor for a manifest-list file.
    pub fn manifest_list(path: impl Into<String>, file_size_in_bytes: i64) -> Self {
        Self {
            file_path: path.into(),
            file_format: FileFormat::Avro,
            record_count: 1,
            file_size_in_bytes,
            partition: PartitionData::unpartitioned(),
            spec_id: 0,
        }
    }

    /// Descriptor for rows served from table metadata.
    pub fn metadata(path: impl Into<String>, file_size_in_bytes: i64, record_count: i64) -> Self {
        Self {
            file_path: path.into(),
            file_format: FileFormat::Metadata,
            record_count,
            file_size_in_bytes,
            partition: PartitionData::unpartitioned(),
            spec_id: 0,
        }
    }
}
