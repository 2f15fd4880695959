//! Integration tests for the `all_manifests` metadata table.
//!
//! Tables are built over in-memory storage; one test round-trips through the
//! local filesystem.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use pretty_assertions::assert_eq;

use fluree_db_iceberg_meta::all_manifests::field_ids;
use fluree_db_iceberg_meta::{
    all_manifests_schema, CountingStorage, Expression, IcebergError, IcebergStorage, LiteralValue,
    LocalFileStorage, ManifestsScanTask, MemoryStorage, Result, Row, ScanConfig, Snapshot,
    StructProjection, Table, Value,
};

use common::{data_manifest, delete_manifest, table, write_legacy_manifest_list, write_manifest_list};

const LIST_1: &str = "mem://warehouse/db/events/metadata/snap-1.avro";
const LIST_2: &str = "mem://warehouse/db/events/metadata/snap-2.avro";

fn manifest_path(n: usize) -> String {
    format!("mem://warehouse/db/events/metadata/m{}.avro", n)
}

async fn plan(table: &Table) -> Vec<ManifestsScanTask> {
    table.all_manifests().new_scan().plan_files().try_collect().await.unwrap()
}

async fn read_all(tasks: &[ManifestsScanTask]) -> Vec<Row> {
    let mut rows = Vec::new();
    for task in tasks {
        for row in task.rows().await.unwrap() {
            rows.push(row.unwrap());
        }
    }
    rows
}

fn column<'a>(row: &'a Row, id: i32) -> &'a Value {
    let pos = all_manifests_schema()
        .columns()
        .iter()
        .position(|f| f.id == id)
        .unwrap();
    row.get(pos).unwrap()
}

/// Two snapshots, each with its own manifest list of 3 and 5 data manifests.
fn two_snapshot_table() -> (Table, Arc<CountingStorage<MemoryStorage>>) {
    let first: Vec<_> = (0..3).map(|i| data_manifest(&manifest_path(i), 1)).collect();
    let second: Vec<_> = (3..8).map(|i| data_manifest(&manifest_path(i), 2)).collect();

    let mut storage = MemoryStorage::new();
    storage.add_file(LIST_1, write_manifest_list(&first));
    storage.add_file(LIST_2, write_manifest_list(&second));
    let storage = Arc::new(CountingStorage::new(storage));

    let snapshots = vec![Snapshot::new(1, 1_000, LIST_1), Snapshot::new(2, 2_000, LIST_2)];
    (table(storage.clone(), snapshots), storage)
}

#[tokio::test]
async fn test_manifest_list_snapshots_yield_one_row_per_entry() {
    let (table, storage) = two_snapshot_table();

    let tasks = plan(&table).await;
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| !t.is_static()));
    assert_eq!(storage.read_calls(), 0, "planning must not open manifest lists");
    assert_eq!(storage.size_calls(), 2);

    let rows = read_all(&tasks).await;
    assert_eq!(rows.len(), 8);

    let paths: Vec<_> = rows
        .iter()
        .map(|r| column(r, field_ids::PATH).as_str().unwrap().to_string())
        .collect();
    let expected: Vec<_> = (0..8).map(manifest_path).collect();
    assert_eq!(paths, expected);

    for row in &rows {
        assert_eq!(column(row, field_ids::CONTENT), &Value::Int(0));
        assert_eq!(column(row, field_ids::ADDED_DATA_FILES_COUNT), &Value::Int(4));
        assert_eq!(column(row, field_ids::ADDED_DELETE_FILES_COUNT), &Value::Int(0));
        assert_eq!(column(row, field_ids::EXISTING_DELETE_FILES_COUNT), &Value::Int(0));
        assert_eq!(column(row, field_ids::DELETED_DELETE_FILES_COUNT), &Value::Int(0));
    }
    assert_eq!(column(&rows[0], field_ids::ADDED_SNAPSHOT_ID), &Value::Long(1));
    assert_eq!(column(&rows[7], field_ids::ADDED_SNAPSHOT_ID), &Value::Long(2));
}

#[tokio::test]
async fn test_resident_entries_never_touch_storage() {
    let storage = Arc::new(CountingStorage::new(MemoryStorage::new()));
    let entries = vec![
        data_manifest(&manifest_path(0), 1),
        delete_manifest(&manifest_path(1), 1),
    ];
    let table = table(
        storage.clone(),
        vec![Snapshot::with_resident_manifests(1, 1_000, entries)],
    );

    let tasks = plan(&table).await;
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].is_static());
    assert_eq!(
        tasks[0].file().file_path,
        "mem://warehouse/db/events/metadata/v3.metadata.json"
    );
    assert_eq!(tasks[0].file().record_count, 2);

    let rows = read_all(&tasks).await;
    assert_eq!(storage.total_calls(), 0);
    assert_eq!(rows.len(), 2);

    let deletes = &rows[1];
    assert_eq!(column(deletes, field_ids::CONTENT), &Value::Int(1));
    assert_eq!(column(deletes, field_ids::ADDED_DATA_FILES_COUNT), &Value::Int(0));
    assert_eq!(column(deletes, field_ids::ADDED_DELETE_FILES_COUNT), &Value::Int(3));
    assert_eq!(column(deletes, field_ids::DELETED_DELETE_FILES_COUNT), &Value::Int(2));
}

#[tokio::test]
async fn test_unknown_spec_id_yields_empty_summaries() {
    let mut entry = data_manifest(&manifest_path(0), 1);
    entry.partition_spec_id = 7;

    let mut storage = MemoryStorage::new();
    storage.add_file(LIST_1, write_manifest_list(&[entry, data_manifest(&manifest_path(1), 1)]));
    let table = table(Arc::new(storage), vec![Snapshot::new(1, 1_000, LIST_1)]);

    let rows = read_all(&plan(&table).await).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(column(&rows[0], field_ids::PARTITION_SPEC_ID), &Value::Int(7));
    assert_eq!(column(&rows[0], field_ids::PARTITION_SUMMARIES), &Value::List(vec![]));
    assert_eq!(
        column(&rows[1], field_ids::PARTITION_SUMMARIES)
            .as_list()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_shared_manifests_are_not_deduplicated() {
    let shared = data_manifest(&manifest_path(0), 1);
    let mut storage = MemoryStorage::new();
    storage.add_file(LIST_1, write_manifest_list(&[shared.clone()]));
    storage.add_file(
        LIST_2,
        write_manifest_list(&[shared, data_manifest(&manifest_path(1), 2)]),
    );
    let table = table(
        Arc::new(storage),
        vec![Snapshot::new(1, 1_000, LIST_1), Snapshot::new(2, 2_000, LIST_2)],
    );

    let rows = read_all(&plan(&table).await).await;
    assert_eq!(rows.len(), 3);
    let shared_rows = rows
        .iter()
        .filter(|r| column(r, field_ids::PATH).as_str() == Some(manifest_path(0).as_str()))
        .count();
    assert_eq!(shared_rows, 2);
}

#[tokio::test]
async fn test_partition_summaries_render_human_bounds() {
    let (table, _) = two_snapshot_table();
    let rows = read_all(&plan(&table).await).await;

    for row in &rows {
        let summaries = column(row, field_ids::PARTITION_SUMMARIES).as_list().unwrap();
        assert_eq!(summaries.len(), 2);
    }

    let summaries = column(&rows[0], field_ids::PARTITION_SUMMARIES).as_list().unwrap();
    assert_eq!(
        summaries[0],
        Value::Struct(Row::new(vec![
            Value::Boolean(false),
            Value::Boolean(false),
            Value::from("books"),
            Value::from("toys"),
        ]))
    );
    assert_eq!(
        summaries[1],
        Value::Struct(Row::new(vec![
            Value::Boolean(false),
            Value::Boolean(false),
            Value::from("0"),
            Value::from("3"),
        ]))
    );
}

#[tokio::test]
async fn test_projection_matches_projected_full_rows() {
    let (table, _) = two_snapshot_table();
    let columns = [
        "path",
        "added_delete_files_count",
        "partition_summaries.lower_bound",
        "content",
    ];

    let full_rows = read_all(&plan(&table).await).await;

    let scan = table.all_manifests().new_scan().select(columns);
    let projected_schema = scan.schema().unwrap();
    let tasks: Vec<_> = scan.plan_files().try_collect().await.unwrap();
    let projected_rows = read_all(&tasks).await;

    let projection =
        StructProjection::create(all_manifests_schema().as_struct(), projected_schema.as_struct())
            .unwrap();
    let expected: Vec<_> = full_rows.into_iter().map(|r| projection.project(r)).collect();
    assert_eq!(projected_rows, expected);

    assert_eq!(projected_schema.column_ids(), vec![14, 1, 15, 8]);
    let first = &projected_rows[0];
    assert_eq!(first.len(), 4);
    assert_eq!(first.get(1), Some(&Value::from(manifest_path(0))));
    let summary = first.get(3).and_then(Value::as_list).unwrap()[0]
        .as_struct()
        .unwrap()
        .clone();
    assert_eq!(summary, Row::new(vec![Value::from("books")]));
}

#[tokio::test]
async fn test_projection_of_resident_and_decoded_rows_agree() {
    let entries: Vec<_> = (0..3).map(|i| data_manifest(&manifest_path(i), 1)).collect();
    let mut storage = MemoryStorage::new();
    storage.add_file(LIST_1, write_manifest_list(&entries));
    let storage: Arc<dyn IcebergStorage> = Arc::new(storage);

    let decoded = table(storage.clone(), vec![Snapshot::new(1, 1_000, LIST_1)]);
    let resident = table(storage, vec![Snapshot::with_resident_manifests(1, 1_000, entries)]);

    let select = ["length", "partition_summaries.upper_bound", "added_snapshot_id"];
    let scan_rows = |table: Table| async move {
        let tasks: Vec<_> = table
            .all_manifests()
            .new_scan()
            .select(select)
            .plan_files()
            .try_collect()
            .await
            .unwrap();
        read_all(&tasks).await
    };

    assert_eq!(scan_rows(decoded).await, scan_rows(resident).await);
}

#[tokio::test]
async fn test_tasks_cover_whole_files_and_never_split() {
    let (table, _) = two_snapshot_table();
    let tasks = plan(&table).await;

    for task in &tasks {
        assert_eq!(task.start(), 0);
        assert!(task.length() > 0);
        assert!(task.deletes().is_empty());
        assert!(task.spec().is_unpartitioned());
        assert_eq!(task.file().record_count, 1);

        let splits = task.split(1);
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].file(), task.file());
        assert_eq!(splits[0].length(), task.length());
        assert_eq!(splits[0].residual(), task.residual());
    }

    let split_tasks: Vec<_> = table
        .all_manifests()
        .new_scan()
        .with_config(ScanConfig::new().with_split_target_size(16))
        .plan_tasks()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(split_tasks.len(), tasks.len());
}

#[tokio::test]
async fn test_filter_is_passed_through_as_residual() {
    let (table, _) = two_snapshot_table();
    let filter = Expression::eq(field_ids::CONTENT, "content", LiteralValue::Int32(0));

    let scan = table.all_manifests().new_scan().filter(filter.clone());
    let tasks: Vec<_> = scan.plan_files().try_collect().await.unwrap();
    assert!(tasks.iter().all(|t| t.residual() == &filter));
    assert_eq!(read_all(&tasks).await.len(), 8);

    let tasks: Vec<_> = scan.ignore_residuals().plan_files().try_collect().await.unwrap();
    assert!(tasks.iter().all(|t| t.residual().is_always_true()));
}

#[tokio::test]
async fn test_legacy_manifest_list_reads_like_current() {
    let entries: Vec<_> = (0..2).map(|i| data_manifest(&manifest_path(i), 1)).collect();
    let mut storage = MemoryStorage::new();
    storage.add_file(LIST_1, write_legacy_manifest_list(&entries));
    storage.add_file(LIST_2, write_manifest_list(&entries));
    let storage: Arc<dyn IcebergStorage> = Arc::new(storage);

    let legacy = table(storage.clone(), vec![Snapshot::new(1, 1_000, LIST_1)]);
    let current = table(storage, vec![Snapshot::new(1, 1_000, LIST_2)]);

    let legacy_rows = read_all(&plan(&legacy).await).await;
    let current_rows = read_all(&plan(&current).await).await;
    assert_eq!(legacy_rows.len(), 2);
    assert_eq!(legacy_rows, current_rows);
}

#[tokio::test]
async fn test_v1_manifest_paths_become_static_rows() {
    let mut storage = MemoryStorage::new();
    storage.add_file(manifest_path(0), vec![0u8; 100]);
    storage.add_file(manifest_path(1), vec![0u8; 250]);

    let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
        "snapshot-id": 5,
        "timestamp-ms": 1000,
        "manifests": [manifest_path(0), manifest_path(1)]
    }))
    .unwrap();
    let table = table(Arc::new(storage), vec![snapshot]);

    let tasks = plan(&table).await;
    assert!(tasks[0].is_static());

    let rows = read_all(&tasks).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(column(&rows[0], field_ids::LENGTH), &Value::Long(100));
    assert_eq!(column(&rows[1], field_ids::LENGTH), &Value::Long(250));
    assert_eq!(column(&rows[1], field_ids::PARTITION_SPEC_ID), &Value::Int(0));
    assert_eq!(column(&rows[1], field_ids::CONTENT), &Value::Int(0));
    assert_eq!(column(&rows[1], field_ids::ADDED_SNAPSHOT_ID), &Value::Null);
}

#[tokio::test]
async fn test_snapshot_planning_failure_does_not_stop_the_stream() {
    let mut storage = MemoryStorage::new();
    storage.add_file(LIST_2, write_manifest_list(&[data_manifest(&manifest_path(0), 2)]));
    let table = table(
        Arc::new(storage),
        vec![Snapshot::new(1, 1_000, LIST_1), Snapshot::new(2, 2_000, LIST_2)],
    );

    let results: Vec<Result<ManifestsScanTask>> = futures::StreamExt::collect(
        table.all_manifests().new_scan().plan_files(),
    )
    .await;
    assert_eq!(results.len(), 2);

    let err = results[0].as_ref().unwrap_err();
    assert!(err.is_io());
    assert_eq!(err.path(), Some(LIST_1));

    let task = results[1].as_ref().unwrap();
    assert_eq!(task.file().file_path, LIST_2);
}

#[tokio::test]
async fn test_invalid_projection_yields_single_error() {
    let (table, _) = two_snapshot_table();
    let results: Vec<Result<ManifestsScanTask>> = futures::StreamExt::collect(
        table.all_manifests().new_scan().select(["no_such_column"]).plan_files(),
    )
    .await;

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(IcebergError::Schema(_))));
}

/// Reports sizes for every file but fails all reads.
#[derive(Debug)]
struct UnreadableStorage;

#[async_trait]
impl IcebergStorage for UnreadableStorage {
    async fn read(&self, path: &str) -> Result<Bytes> {
        Err(IcebergError::storage(format!("Access denied: {}", path)))
    }

    async fn file_size(&self, _path: &str) -> Result<u64> {
        Ok(1024)
    }
}

#[tokio::test]
async fn test_read_failure_carries_file_location() {
    let table = table(Arc::new(UnreadableStorage), vec![Snapshot::new(1, 1_000, LIST_1)]);
    let tasks = plan(&table).await;
    assert_eq!(tasks[0].length(), 1024);

    let err = tasks[0].rows().await.unwrap_err();
    assert!(err.is_io());
    assert_eq!(err.path(), Some(LIST_1));
    assert!(err.to_string().contains("Access denied"));
}

#[tokio::test]
async fn test_corrupt_manifest_list_is_a_decode_error() {
    let mut storage = MemoryStorage::new();
    storage.add_file(LIST_1, &b"definitely not avro"[..]);
    let table = table(Arc::new(storage), vec![Snapshot::new(1, 1_000, LIST_1)]);

    let tasks = plan(&table).await;
    let err = match tasks[0].rows().await {
        Err(e) => e,
        Ok(rows) => rows
            .filter_map(|r| r.err())
            .next()
            .expect("corrupt file must fail"),
    };
    assert!(err.is_decode());
    assert_eq!(err.path(), Some(LIST_1));
}

#[tokio::test]
async fn test_rows_can_be_dropped_early_and_reread() {
    let (table, storage) = two_snapshot_table();
    let tasks = plan(&table).await;

    let mut rows = tasks[1].rows().await.unwrap();
    let first = rows.next().unwrap().unwrap();
    drop(rows);
    assert_eq!(storage.read_calls(), 1);

    let again: Vec<_> = tasks[1].rows().await.unwrap().collect::<Result<_>>().unwrap();
    assert_eq!(storage.read_calls(), 2);
    assert_eq!(again.len(), 5);
    assert_eq!(again[0], first);
}

#[tokio::test]
async fn test_replanning_reenumerates_snapshots() {
    let (table, storage) = two_snapshot_table();
    let scan = table.all_manifests().new_scan();

    let first: Vec<_> = scan.plan_files().try_collect().await.unwrap();
    let second: Vec<_> = scan.plan_files().try_collect().await.unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(storage.size_calls(), 4);
}

#[tokio::test]
async fn test_table_without_snapshots_plans_nothing() {
    let table = table(Arc::new(MemoryStorage::new()), vec![]);
    assert!(plan(&table).await.is_empty());
    assert_eq!(table.all_manifests().name(), "db.events.all_manifests");
}

#[tokio::test]
async fn test_local_filesystem_table() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let list_path = root.join("snap-1.avro");
    let metadata_path = root.join("v1.metadata.json");

    let entries = vec![
        data_manifest(&root.join("m0.avro").to_string_lossy(), 1),
        delete_manifest(&root.join("m1.avro").to_string_lossy(), 1),
    ];
    std::fs::write(&list_path, write_manifest_list(&entries)).unwrap();

    let mut metadata: serde_json::Value = serde_json::from_str(common::TABLE_METADATA).unwrap();
    metadata["current-snapshot-id"] = serde_json::json!(1);
    metadata["snapshots"] = serde_json::json!([{
        "snapshot-id": 1,
        "timestamp-ms": 1000,
        "manifest-list": list_path.to_string_lossy(),
        "summary": {"operation": "append"}
    }]);
    std::fs::write(&metadata_path, serde_json::to_vec(&metadata).unwrap()).unwrap();

    let table = Table::load(
        "db.events",
        Arc::new(LocalFileStorage::new()),
        &metadata_path.to_string_lossy(),
    )
    .await
    .unwrap();

    let scan = table
        .all_manifests()
        .new_scan()
        .select(["content", "path", "deleted_delete_files_count"]);
    let tasks: Vec<_> = scan.plan_files().try_collect().await.unwrap();
    let rows = read_all(&tasks).await;

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[1],
        Row::new(vec![
            Value::Int(1),
            Value::from(root.join("m1.avro").to_string_lossy().to_string()),
            Value::Int(2),
        ])
    );
}

fn assert_send<T: Send>(_: &T) {}

fn assert_send_sync_clone<T: Send + Sync + Clone>() {}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tasks_run_on_worker_threads() {
    assert_send_sync_clone::<ManifestsScanTask>();

    let (table, storage) = two_snapshot_table();
    let scan = table.all_manifests().new_scan().select(["path"]);

    let stream = scan.plan_files();
    assert_send(&stream);
    let tasks: Vec<ManifestsScanTask> = stream.try_collect().await.unwrap();

    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            tokio::spawn(async move {
                let rows = task.rows().await?;
                assert_send(&rows);
                rows.collect::<Result<Vec<Row>>>()
            })
        })
        .collect();

    let mut counts = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap().unwrap().len());
    }
    assert_eq!(counts, vec![3, 5]);
    assert_eq!(storage.read_calls(), 2);
}
