//! Common test utilities and helpers for integration tests

use datafusion::arrow::array::{Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use std::sync::Arc;
use ytspark_common::{StorageBackend, StorageBuilder};
use ytspark_core::{Dataset, JobConfig, JobContext, StorageSettings};

/// Create a context over in-memory storage
pub async fn create_test_context() -> JobContext {
    let storage = StorageBuilder::new()
        .build()
        .await
        .expect("Failed to create memory storage");
    JobContext::new(JobConfig::default(), storage)
}

/// Create a context storing tables under `root`
#[allow(dead_code)] // not every test binary uses the filesystem backend
pub async fn create_local_context(root: &std::path::Path) -> JobContext {
    let settings = StorageSettings::Local {
        root_path: root.to_string_lossy().to_string(),
    };
    let storage = StorageBuilder::new()
        .backend(StorageBackend::from(&settings))
        .build()
        .await
        .expect("Failed to create local storage");
    let config = JobConfig {
        storage: settings,
        ..JobConfig::default()
    };
    JobContext::new(config, storage)
}

pub fn id_uuid_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("uuid", DataType::Utf8, true),
    ]))
}

/// Build an `(id, uuid)` dataset
pub fn id_uuid_dataset(ctx: &JobContext, rows: &[(i64, &str)]) -> Dataset {
    let ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
    let uuids: Vec<&str> = rows.iter().map(|(_, uuid)| *uuid).collect();
    let batch = RecordBatch::try_new(
        id_uuid_schema(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(uuids)),
        ],
    )
    .expect("Failed to build batch");
    ctx.create_dataset(id_uuid_schema(), vec![batch])
        .expect("Failed to create dataset")
}

/// All values of a string column, sorted
pub async fn sorted_strings(dataset: &Dataset, column: &str) -> Vec<String> {
    let batches = dataset
        .select_columns(&[column])
        .expect("column exists")
        .collect()
        .await
        .expect("collect");
    let mut values = Vec::new();
    for batch in &batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Utf8 column");
        values.extend(array.iter().map(|v| v.unwrap_or_default().to_string()));
    }
    values.sort();
    values
}
