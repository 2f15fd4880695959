//! Iceberg snapshot structures.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::manifest::ManifestListEntry;

/// Iceberg table snapshot.
///
/// A snapshot points at the manifests that describe the table's data files,
/// either through a manifest-list file (v2, and v1 tables written by newer
/// writers) or through a plain list of manifest paths (legacy v1). Manifest
/// entries may also be attached in memory, e.g. when they were already read
/// by another component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    /// Unique snapshot ID
    pub snapshot_id: i64,
    /// Parent snapshot ID (None for the first snapshot)
    #[serde(default)]
    pub parent_snapshot_id: Option<i64>,
    /// Sequence number (v2 only)
    #[serde(default)]
    pub sequence_number: i64,
    /// Timestamp when snapshot was created (ms since epoch)
    pub timestamp_ms: i64,
    /// Path to manifest list file
    #[serde(default)]
    pub manifest_list: Option<String>,
    /// Direct manifest paths (v1 format)
    #[serde(default)]
    pub manifests: Option<Vec<String>>,
    /// Summary statistics
    #[serde(default)]
    pub summary: HashMap<String, String>,
    /// Schema ID at snapshot time
    #[serde(default)]
    pub schema_id: Option<i32>,
    #[serde(skip)]
    resident_manifests: Option<Arc<[ManifestListEntry]>>,
}

impl Snapshot {
    /// A snapshot backed by a manifest-list file.
    pub fn new(snapshot_id: i64, timestamp_ms: i64, manifest_list: impl Into<String>) -> Self {
        Self {
            snapshot_id,
            parent_snapshot_id: None,
            sequence_number: 0,
            timestamp_ms,
            manifest_list: Some(manifest_list.into()),
            manifests: None,
            summary: HashMap::new(),
            schema_id: None,
            resident_manifests: None,
        }
    }

    /// A snapshot whose manifest entries are held in memory.
    pub fn with_resident_manifests(
        snapshot_id: i64,
        timestamp_ms: i64,
        entries: Vec<ManifestListEntry>,
    ) -> Self {
        Self {
            snapshot_id,
            parent_snapshot_id: None,
            sequence_number: 0,
            timestamp_ms,
            manifest_list: None,
            manifests: None,
            summary: HashMap::new(),
            schema_id: None,
            resident_manifests: Some(entries.into()),
        }
    }

    /// Attach manifest entries already read for this snapshot.
    pub fn attach_manifests(&mut self, entries: Vec<ManifestListEntry>) {
        self.resident_manifests = Some(entries.into());
    }

    /// Get the manifest list location.
    pub fn manifest_list_location(&self) -> Option<&str> {
        self.manifest_list.as_deref()
    }

    /// Manifest entries held in memory, if attached.
    pub fn resident_manifests(&self) -> Option<&Arc<[ManifestListEntry]>> {
        self.resident_manifests.as_ref()
    }

    /// Get manifest paths (for v1 tables without manifest list).
    pub fn manifest_paths(&self) -> Option<&[String]> {
        self.manifests.as_deref()
    }

    /// Get the operation that created this snapshot.
    pub fn operation(&self) -> Option<&str> {
        self.summary.get("operation").map(|s| s.as_str())
    }
}
