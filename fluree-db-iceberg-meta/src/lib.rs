//! Iceberg metadata tables for Fluree DB graph sources.
//!
//! This crate exposes the `all_manifests` metadata table: one row per manifest
//! file referenced by any snapshot a table still retains. Rows come either from
//! manifest-list Avro files, decoded lazily when a task is read, or from
//! manifest entries already held in table metadata.
//!
//! # Architecture
//!
//! - [`types`] - Typed Iceberg schemas with field-ID lookups and pruning
//! - [`metadata`] - Table metadata, snapshots and partition specs
//! - [`manifest`] - Manifest-list records and the evolving Avro reader
//! - [`row`] - Output rows and field-ID based projection
//! - [`all_manifests`] - The metadata table schema and row materialization
//! - [`scan`] - Scan planning and the tasks it produces
//! - [`io`] - Storage abstraction
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use futures::TryStreamExt;
//! use fluree_db_iceberg_meta::{LocalFileStorage, Table};
//!
//! let io = Arc::new(LocalFileStorage::new());
//! let table = Table::load("db.events", io, "/warehouse/events/metadata/v3.metadata.json").await?;
//!
//! let scan = table.all_manifests().new_scan().select(["path", "added_snapshot_id"]);
//! let tasks: Vec<_> = scan.plan_files().try_collect().await?;
//! for task in &tasks {
//!     for row in task.rows().await? {
//!         println!("{:?}", row?);
//!     }
//! }
//! ```

pub mod all_manifests;
pub mod error;
pub mod io;
pub mod manifest;
pub mod metadata;
pub mod row;
pub mod scan;
pub mod table;
pub mod types;

pub use all_manifests::{all_manifests_schema, manifest_file_to_row, AllManifestsTable};
pub use error::{IcebergError, Result};
pub use io::{CountingStorage, IcebergStorage, LocalFileStorage, MemoryStorage};
pub use manifest::{
    DataFile, ManifestContent, ManifestListEntry, ManifestListReader, PartitionFieldSummary,
    RenameRules, TypedValue,
};
pub use metadata::{PartitionSpec, Snapshot, TableMetadata};
pub use row::{Row, StructProjection, Value};
pub use scan::{
    AllManifestsTableScan, ComparisonOp, Expression, LiteralValue, ManifestRows, ManifestsScanTask,
    ScanConfig,
};
pub use table::Table;
pub use types::Schema;
