//! Manifest list handling for Iceberg tables.
//!
//! - **Manifest list**: Avro file listing the manifest files of a snapshot,
//!   with partition summaries
//! - **Reader**: streaming decoder with legacy-name renames and projection
//! - **Value codec**: Iceberg's binary encoding of partition summary bounds

pub mod data_file;
pub mod manifest_list;
pub mod reader;
pub mod value_codec;

pub use data_file::{DataFile, FileFormat, PartitionData};
pub use manifest_list::{
    field_summary_type, manifest_file_schema, ManifestContent, ManifestListEntry,
    PartitionFieldSummary, MANIFEST_LIST_SCHEMA_V1, MANIFEST_LIST_SCHEMA_V2,
};
pub use reader::{
    parse_manifest_list, ManifestListReader, ManifestListReaderBuilder, RenameKind, RenameRule,
    RenameRules, MANIFEST_LIST_RENAMES,
};
pub use value_codec::{decode_value, encode_value, TypedValue};
