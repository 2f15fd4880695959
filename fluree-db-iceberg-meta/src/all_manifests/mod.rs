//! The `all_manifests` metadata table.
//!
//! One row per manifest file referenced by any retained snapshot of a table.
//! A manifest shared by several snapshots appears once per snapshot.

mod row;
mod schema;

pub use row::manifest_file_to_row;
pub use schema::{all_manifests_schema, field_ids, manifest_file_projection};

use crate::scan::AllManifestsTableScan;
use crate::table::Table;
use crate::types::Schema;

/// Read-only view over the manifests of all snapshots of a table.
#[derive(Debug, Clone)]
pub struct AllManifestsTable {
    table: Table,
}

impl AllManifestsTable {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    /// Name of the view, `<table>.all_manifests`.
    pub fn name(&self) -> String {
        format!("{}.all_manifests", self.table.name())
    }

    /// The fixed `all_manifests` schema.
    pub fn schema(&self) -> &'static Schema {
        all_manifests_schema()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Start a scan configured from the table's properties.
    pub fn new_scan(&self) -> AllManifestsTableScan {
        AllManifestsTableScan::new(self.table.clone())
    }
}
