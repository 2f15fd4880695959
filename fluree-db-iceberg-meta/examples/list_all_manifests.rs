//! Example: List every manifest of a local Iceberg table.
//!
//! Prints one line per row of the `all_manifests` metadata table.
//!
//! Run with:
//! ```
//! cargo run --example list_all_manifests -p fluree-db-iceberg-meta -- \
//!     /warehouse/db/events/metadata/v3.metadata.json [column ...]
//! ```
//!
//! Set `RUST_LOG=fluree_db_iceberg_meta=debug` to see planning decisions.

use std::sync::Arc;

use futures::TryStreamExt;
use tracing_subscriber::EnvFilter;

use fluree_db_iceberg_meta::{LocalFileStorage, Table, Value};

fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Binary(v) => format!("<{} bytes>", v.len()),
        Value::List(items) => {
            let parts: Vec<_> = items.iter().map(render).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Struct(row) => {
            let parts: Vec<_> = row.values().iter().map(render).collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let metadata_path = args
        .next()
        .ok_or("usage: list_all_manifests <metadata.json> [column ...]")?;
    let columns: Vec<String> = args.collect();

    let table = Table::load("local", Arc::new(LocalFileStorage::new()), &metadata_path).await?;
    let all_manifests = table.all_manifests();

    let mut scan = all_manifests.new_scan();
    if !columns.is_empty() {
        scan = scan.select(columns);
    }
    let schema = scan.schema()?;

    println!("=== {} ===", all_manifests.name());
    println!("Snapshots: {}", table.snapshots().len());
    let names: Vec<_> = schema.columns().iter().map(|f| f.name.as_str()).collect();
    println!("{}", names.join(" | "));

    let tasks: Vec<_> = scan.plan_files().try_collect().await?;
    let mut total = 0usize;
    for task in &tasks {
        for row in task.rows().await? {
            let row = row?;
            let values: Vec<_> = row.values().iter().map(render).collect();
            println!("{}", values.join(" | "));
            total += 1;
        }
    }

    println!("\n{} manifests in {} tasks", total, tasks.len());
    Ok(())
}
