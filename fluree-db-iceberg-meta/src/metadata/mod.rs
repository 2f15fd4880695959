//! Iceberg table metadata: snapshots, partition specs and the metadata file.

pub mod partition;
pub mod snapshot;
pub mod table;

pub use partition::{
    BoundPartitionField, PartitionField, PartitionSpec, Transform, UnboundPartitionSpec,
};
pub use snapshot::Snapshot;
pub use table::TableMetadata;
