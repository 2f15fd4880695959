//! Scan planning for the `all_manifests` metadata table.
//!
//! Planning walks the table's snapshots lazily and builds one task per
//! snapshot:
//! 1. A snapshot with a manifest-list file gets a task that decodes the file
//!    when its rows are read
//! 2. A snapshot whose manifest entries are already in memory gets a task with
//!    rows materialized at plan time
//! 3. A legacy snapshot listing manifest paths directly gets a task over
//!    entries synthesized from those paths
//!
//! No file is opened during planning; only file sizes are looked up.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::all_manifests::{all_manifests_schema, manifest_file_projection};
use crate::error::{IcebergError, Result};
use crate::manifest::{DataFile, ManifestListEntry};
use crate::metadata::{PartitionSpec, Snapshot};
use crate::row::StructProjection;
use crate::scan::predicate::Expression;
use crate::scan::residual::ResidualEvaluator;
use crate::scan::task::{ManifestListReadTask, ManifestsScanTask, StaticDataTask, TaskContext};
use crate::table::Table;
use crate::types::Schema;

/// Table property holding the target split size in bytes.
pub const SPLIT_TARGET_SIZE_PROPERTY: &str = "read.split.target-size";

/// Default target split size (128 MiB).
pub const DEFAULT_SPLIT_TARGET_SIZE: u64 = 128 * 1024 * 1024;

/// Configuration for a metadata table scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Column names to read. If None, read all columns.
    pub selected_columns: Option<Vec<String>>,
    /// Field IDs to read (canonical). Takes precedence over `selected_columns`.
    pub projected_field_ids: Option<Vec<i32>>,
    /// Whether column names match case-sensitively (default: true).
    pub case_sensitive: bool,
    /// Drop the filter from task residuals (default: false).
    pub ignore_residuals: bool,
    /// Filter handed to tasks as their residual.
    #[serde(skip)]
    pub filter: Option<Expression>,
    /// Target split size in bytes (default: 128 MiB).
    pub split_target_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            selected_columns: None,
            projected_field_ids: None,
            case_sensitive: true,
            ignore_residuals: false,
            filter: None,
            split_target_size: DEFAULT_SPLIT_TARGET_SIZE,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by table properties.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_table_properties(properties: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = properties.get(SPLIT_TARGET_SIZE_PROPERTY) {
            match raw.trim().parse::<u64>() {
                Ok(size) if size > 0 => config.split_target_size = size,
                _ => tracing::warn!(
                    property = SPLIT_TARGET_SIZE_PROPERTY,
                    value = %raw,
                    "Ignoring invalid split target size"
                ),
            }
        }
        config
    }

    /// Set the columns to read by name.
    pub fn with_selected_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.selected_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the columns to read by field ID.
    pub fn with_projected_field_ids(mut self, field_ids: Vec<i32>) -> Self {
        self.projected_field_ids = Some(field_ids);
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_ignore_residuals(mut self, ignore_residuals: bool) -> Self {
        self.ignore_residuals = ignore_residuals;
        self
    }

    /// Set the filter predicate.
    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_split_target_size(mut self, size: u64) -> Self {
        self.split_target_size = size;
        self
    }

    /// Filter tasks carry as their residual.
    pub fn effective_filter(&self) -> Expression {
        if self.ignore_residuals {
            Expression::AlwaysTrue
        } else {
            self.filter.clone().unwrap_or_default()
        }
    }
}

/// A configured scan of the `all_manifests` table.
///
/// Builder methods consume and return the scan. Planning never mutates it, so
/// the same scan can be planned any number of times.
#[derive(Debug, Clone)]
pub struct AllManifestsTableScan {
    table: Table,
    config: ScanConfig,
    projection: Option<Schema>,
}

impl AllManifestsTableScan {
    pub(crate) fn new(table: Table) -> Self {
        let config = ScanConfig::from_table_properties(table.properties());
        Self {
            table,
            config,
            projection: None,
        }
    }

    /// Read only the named columns (dotted names select nested fields).
    pub fn select<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.config = self.config.with_selected_columns(columns);
        self
    }

    /// Read rows shaped like `schema`, a sub-schema of the table schema.
    pub fn project(mut self, schema: Schema) -> Self {
        self.projection = Some(schema);
        self
    }

    /// Add a filter, combined with any existing filter by AND.
    pub fn filter(mut self, expr: Expression) -> Self {
        let combined = match self.config.filter.take() {
            Some(existing) => Expression::and(vec![existing, expr]),
            None => expr,
        };
        self.config.filter = Some(combined);
        self
    }

    pub fn ignore_residuals(mut self) -> Self {
        self.config.ignore_residuals = true;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.config.case_sensitive = case_sensitive;
        self
    }

    /// Replace the whole scan configuration.
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Schema of the rows this scan produces.
    ///
    /// An explicit projection wins over field IDs, which win over column
    /// names. Without any of them the full table schema is returned.
    pub fn schema(&self) -> Result<Schema> {
        let full = all_manifests_schema();
        if let Some(schema) = &self.projection {
            return Ok(schema.clone());
        }
        if let Some(ids) = &self.config.projected_field_ids {
            return full.select_ids(ids);
        }
        if let Some(columns) = &self.config.selected_columns {
            return full.select(columns.as_slice(), self.config.case_sensitive);
        }
        Ok(full.clone())
    }

    /// Plan one task per snapshot.
    ///
    /// The stream is lazy: each poll plans one snapshot. A failure for one
    /// snapshot is yielded as an error item and planning moves on to the next.
    /// An invalid projection yields a single error.
    pub fn plan_files(&self) -> BoxStream<'static, Result<ManifestsScanTask>> {
        let context = match self.plan_context() {
            Ok(context) => Arc::new(context),
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        tracing::debug!(
            table = %self.table.name(),
            snapshots = self.table.snapshots().len(),
            columns = context.task.schema.columns().len(),
            "Planning all_manifests scan"
        );

        let count = self.table.snapshots().len();
        stream::iter(0..count)
            .then(move |index| {
                let context = Arc::clone(&context);
                async move { context.plan_snapshot(index).await }
            })
            .boxed()
    }

    /// Plan tasks split to the configured target size.
    ///
    /// Tasks of this table are never split, so this yields the same tasks as
    /// [`Self::plan_files`].
    pub fn plan_tasks(&self) -> BoxStream<'static, Result<ManifestsScanTask>> {
        let target_size = self.config.split_target_size;
        self.plan_files()
            .flat_map(move |task| {
                let tasks = match task {
                    Ok(task) => task.split(target_size).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(tasks)
            })
            .boxed()
    }

    fn plan_context(&self) -> Result<PlanContext> {
        let schema = self.schema()?;
        let projection = StructProjection::create(all_manifests_schema().as_struct(), schema.as_struct())?;
        let read_schema = manifest_file_projection(&schema)?;
        let residuals = ResidualEvaluator::unpartitioned(self.config.effective_filter());

        Ok(PlanContext {
            table: self.table.clone(),
            residuals,
            task: Arc::new(TaskContext {
                specs: Arc::new(self.table.specs()),
                schema,
                projection,
                read_schema,
                spec: PartitionSpec::unpartitioned(),
            }),
        })
    }
}

/// Everything a snapshot needs to be planned, shared by the plan stream.
#[derive(Debug)]
struct PlanContext {
    table: Table,
    residuals: ResidualEvaluator,
    task: Arc<TaskContext>,
}

impl PlanContext {
    async fn plan_snapshot(&self, index: usize) -> Result<ManifestsScanTask> {
        let snapshot = self.table.snapshots().get(index).ok_or_else(|| {
            IcebergError::scan(format!("Snapshot at position {} no longer exists", index))
        })?;

        if let Some(location) = snapshot.manifest_list_location() {
            return self.manifest_list_task(snapshot, location).await;
        }
        if let Some(entries) = snapshot.resident_manifests() {
            tracing::debug!(
                snapshot_id = snapshot.snapshot_id,
                manifests = entries.len(),
                "Using manifest entries from table metadata"
            );
            return Ok(self.static_task(entries));
        }
        if let Some(paths) = snapshot.manifest_paths() {
            let entries = self.legacy_entries(paths).await?;
            tracing::debug!(
                snapshot_id = snapshot.snapshot_id,
                manifests = entries.len(),
                "Using manifest paths from legacy snapshot"
            );
            return Ok(self.static_task(&entries));
        }

        tracing::debug!(snapshot_id = snapshot.snapshot_id, "Snapshot lists no manifests");
        Ok(self.static_task(&[]))
    }

    async fn manifest_list_task(&self, snapshot: &Snapshot, location: &str) -> Result<ManifestsScanTask> {
        let size = self
            .table
            .io()
            .file_size(location)
            .await
            .map_err(|e| IcebergError::io(location, e))?;

        tracing::debug!(
            snapshot_id = snapshot.snapshot_id,
            manifest_list = %location,
            bytes = size,
            "Planned manifest-list task"
        );

        let file = DataFile::manifest_list(location, to_i64(size));
        let residual = self.residuals.residual_for(&file.partition);
        Ok(ManifestsScanTask::ManifestList(ManifestListReadTask::new(
            Arc::clone(self.table.io()),
            file,
            residual,
            Arc::clone(&self.task),
        )))
    }

    fn static_task(&self, entries: &[ManifestListEntry]) -> ManifestsScanTask {
        let rows = entries.iter().map(|entry| self.task.to_row(entry)).collect::<Vec<_>>();
        let file = DataFile::metadata(
            self.table.metadata_location().unwrap_or_default(),
            to_i64(self.table.metadata_length()),
            rows.len() as i64,
        );
        let residual = self.residuals.residual_for(&file.partition);
        ManifestsScanTask::Static(StaticDataTask::new(file, rows, residual, Arc::clone(&self.task)))
    }

    async fn legacy_entries(&self, paths: &[String]) -> Result<Vec<ManifestListEntry>> {
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let size = self
                .table
                .io()
                .file_size(path)
                .await
                .map_err(|e| IcebergError::io(path.as_str(), e))?;
            entries.push(ManifestListEntry::new(path.as_str(), to_i64(size), 0));
        }
        Ok(entries)
    }
}

fn to_i64(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::predicate::LiteralValue;

    #[test]
    fn test_scan_config_default() {
        let config = ScanConfig::default();
        assert!(config.selected_columns.is_none());
        assert!(config.projected_field_ids.is_none());
        assert!(config.case_sensitive);
        assert!(!config.ignore_residuals);
        assert!(config.filter.is_none());
        assert_eq!(config.split_target_size, 128 * 1024 * 1024);
        assert_eq!(config.effective_filter(), Expression::AlwaysTrue);
    }

    #[test]
    fn test_scan_config_builder() {
        let filter = Expression::gt(2, "length", LiteralValue::Int64(100));
        let config = ScanConfig::new()
            .with_selected_columns(["path", "length"])
            .with_case_sensitive(false)
            .with_filter(filter.clone())
            .with_split_target_size(1024);

        assert_eq!(
            config.selected_columns,
            Some(vec!["path".to_string(), "length".to_string()])
        );
        assert!(!config.case_sensitive);
        assert_eq!(config.effective_filter(), filter);
        assert_eq!(config.split_target_size, 1024);

        let config = config.with_ignore_residuals(true);
        assert_eq!(config.effective_filter(), Expression::AlwaysTrue);
    }

    #[test]
    fn test_scan_config_from_properties() {
        let mut props = HashMap::new();
        props.insert(SPLIT_TARGET_SIZE_PROPERTY.to_string(), "4096".to_string());
        assert_eq!(ScanConfig::from_table_properties(&props).split_target_size, 4096);

        props.insert(SPLIT_TARGET_SIZE_PROPERTY.to_string(), "lots".to_string());
        assert_eq!(
            ScanConfig::from_table_properties(&props).split_target_size,
            DEFAULT_SPLIT_TARGET_SIZE
        );
    }

    #[test]
    fn test_scan_config_deserialize_partial() {
        let config: ScanConfig =
            serde_json::from_str(r#"{"selected_columns": ["path"], "case_sensitive": false}"#).unwrap();
        assert_eq!(config.selected_columns, Some(vec!["path".to_string()]));
        assert!(!config.case_sensitive);
        assert!(!config.ignore_residuals);
        assert_eq!(config.split_target_size, DEFAULT_SPLIT_TARGET_SIZE);
    }
}
