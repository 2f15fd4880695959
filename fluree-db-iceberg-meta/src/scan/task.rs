//! Scan tasks produced by metadata table planning.
//!
//! A task is an immutable description of work. Nothing is opened until
//! [`ManifestsScanTask::rows`] is called, and every call reads the underlying
//! file again.

use std::collections::HashMap;
use std::sync::Arc;

use crate::all_manifests::manifest_file_to_row;
use crate::error::{IcebergError, Result};
use crate::io::IcebergStorage;
use crate::manifest::{DataFile, ManifestListEntry, ManifestListReader};
use crate::metadata::PartitionSpec;
use crate::row::{Row, StructProjection};
use crate::scan::predicate::Expression;
use crate::types::Schema;

/// Shared state of every task of one scan.
#[derive(Debug)]
pub(crate) struct TaskContext {
    /// Partition specs of the table, keyed by spec ID
    pub(crate) specs: Arc<HashMap<i32, PartitionSpec>>,
    /// Output schema after projection
    pub(crate) schema: Schema,
    /// Full row to projected row
    pub(crate) projection: StructProjection,
    /// Manifest-list fields needed for the projected columns
    pub(crate) read_schema: Schema,
    /// Spec of task files (metadata files are unpartitioned)
    pub(crate) spec: PartitionSpec,
}

impl TaskContext {
    /// Materialize and project one entry.
    pub(crate) fn to_row(&self, entry: &ManifestListEntry) -> Row {
        let spec = self.specs.get(&entry.partition_spec_id);
        if spec.is_none() {
            tracing::debug!(
                manifest = %entry.manifest_path,
                spec_id = entry.partition_spec_id,
                "Unknown partition spec, emitting empty partition summaries"
            );
        }
        self.projection.project(manifest_file_to_row(spec, entry))
    }
}

/// Rows computed at plan time from entries held in table metadata.
#[derive(Debug, Clone)]
pub struct StaticDataTask {
    file: DataFile,
    rows: Arc<[Row]>,
    residual: Expression,
    context: Arc<TaskContext>,
}

impl StaticDataTask {
    pub(crate) fn new(
        file: DataFile,
        rows: Vec<Row>,
        residual: Expression,
        context: Arc<TaskContext>,
    ) -> Self {
        Self {
            file,
            rows: rows.into(),
            residual,
            context,
        }
    }

    /// Number of rows this task produces.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Rows decoded lazily from one manifest-list file.
#[derive(Debug, Clone)]
pub struct ManifestListReadTask {
    io: Arc<dyn IcebergStorage>,
    file: DataFile,
    residual: Expression,
    context: Arc<TaskContext>,
}

impl ManifestListReadTask {
    pub(crate) fn new(
        io: Arc<dyn IcebergStorage>,
        file: DataFile,
        residual: Expression,
        context: Arc<TaskContext>,
    ) -> Self {
        Self {
            io,
            file,
            residual,
            context,
        }
    }

    async fn open(&self) -> Result<ManifestRows> {
        let path = self.file.file_path.as_str();
        let data = self
            .io
            .read(path)
            .await
            .map_err(|e| IcebergError::io(path, e))?;

        let reader = ManifestListReader::builder(path)
            .project(self.context.read_schema.clone())
            .build(data)?;

        Ok(ManifestRows {
            source: RowSource::Decoding {
                reader,
                context: Arc::clone(&self.context),
            },
        })
    }
}

/// A unit of planned work for the `all_manifests` table.
///
/// Tasks are never split: each covers a whole file.
#[derive(Debug, Clone)]
pub enum ManifestsScanTask {
    /// Rows already materialized from in-memory manifest entries
    Static(StaticDataTask),
    /// Rows decoded from a manifest-list file when read
    ManifestList(ManifestListReadTask),
}

impl ManifestsScanTask {
    /// The file this task covers.
    pub fn file(&self) -> &DataFile {
        match self {
            Self::Static(task) => &task.file,
            Self::ManifestList(task) => &task.file,
        }
    }

    /// Partition spec of the task's file. Always unpartitioned.
    pub fn spec(&self) -> &PartitionSpec {
        &self.context().spec
    }

    /// Schema of the rows this task produces.
    pub fn schema(&self) -> &Schema {
        &self.context().schema
    }

    /// Byte offset the task starts at.
    pub fn start(&self) -> u64 {
        0
    }

    /// Bytes covered by the task (the whole file).
    pub fn length(&self) -> u64 {
        u64::try_from(self.file().file_size_in_bytes).unwrap_or(0)
    }

    /// Filter the execution path still has to apply to produced rows.
    pub fn residual(&self) -> &Expression {
        match self {
            Self::Static(task) => &task.residual,
            Self::ManifestList(task) => &task.residual,
        }
    }

    /// Delete files to apply. Metadata tables have none.
    pub fn deletes(&self) -> &[DataFile] {
        &[]
    }

    /// Split into tasks of roughly `_target_size` bytes.
    ///
    /// Manifest lists must be decoded whole, so this always yields the task itself.
    pub fn split(&self, _target_size: u64) -> Vec<ManifestsScanTask> {
        vec![self.clone()]
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    /// Open the task and return its rows.
    ///
    /// Manifest-list tasks read the file here; I/O failures carry the file
    /// location. The file contents are released when the iterator is dropped.
    pub async fn rows(&self) -> Result<ManifestRows> {
        match self {
            Self::Static(task) => Ok(ManifestRows {
                source: RowSource::Static {
                    rows: Arc::clone(&task.rows),
                    pos: 0,
                },
            }),
            Self::ManifestList(task) => task.open().await,
        }
    }

    fn context(&self) -> &TaskContext {
        match self {
            Self::Static(task) => &task.context,
            Self::ManifestList(task) => &task.context,
        }
    }
}

/// Rows of one task, produced one at a time.
///
/// Decoding stops at the first error; no partial rows are produced.
#[derive(Debug)]
pub struct ManifestRows {
    source: RowSource,
}

#[derive(Debug)]
enum RowSource {
    Static {
        rows: Arc<[Row]>,
        pos: usize,
    },
    Decoding {
        reader: ManifestListReader,
        context: Arc<TaskContext>,
    },
}

impl Iterator for ManifestRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            RowSource::Static { rows, pos } => {
                let row = rows.get(*pos)?.clone();
                *pos += 1;
                Some(Ok(row))
            }
            RowSource::Decoding { reader, context } => {
                let entry = reader.next()?;
                Some(entry.map(|entry| context.to_row(&entry)))
            }
        }
    }
}
