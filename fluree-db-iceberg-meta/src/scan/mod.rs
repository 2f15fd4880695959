//! Scan planning for Iceberg metadata tables.
//!
//! This module provides:
//! - [`predicate`] - Filter expressions carried as task residuals
//! - [`residual`] - Residual computation for unpartitioned metadata files
//! - [`planner`] - Snapshot enumeration and task generation
//! - [`task`] - Scan tasks and their row iterators

pub mod planner;
pub mod predicate;
pub mod residual;
pub mod task;

pub use planner::{AllManifestsTableScan, ScanConfig, DEFAULT_SPLIT_TARGET_SIZE, SPLIT_TARGET_SIZE_PROPERTY};
pub use predicate::{ComparisonOp, Expression, LiteralValue};
pub use residual::ResidualEvaluator;
pub use task::{ManifestListReadTask, ManifestRows, ManifestsScanTask, StaticDataTask};
