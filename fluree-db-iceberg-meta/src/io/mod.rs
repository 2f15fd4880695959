//! IO module for reading Iceberg metadata files.

pub mod storage;

pub use storage::{CountingStorage, IcebergStorage, LocalFileStorage, MemoryStorage};
