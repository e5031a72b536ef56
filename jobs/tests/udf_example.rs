//! End-to-end tests for the UDF example job

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tempfile::TempDir;
use tracing_test::traced_test;
use ytspark_common::{StorageBackend, StorageBuilder, TableStorage};
use ytspark_core::app::{AppArgs, execute};
use ytspark_core::{JobConfig, JobContext, JobError, SaveMode};
use ytspark_jobs::udf_example::{
    DEFAULT_DESTINATION, DEFAULT_SOURCE, run_seed_example, run_udf_example, seed_example,
};

async fn memory_context() -> (JobContext, Arc<dyn TableStorage>) {
    let storage = StorageBuilder::new()
        .build()
        .await
        .expect("Failed to create memory storage");
    (JobContext::new(JobConfig::default(), storage.clone()), storage)
}

async fn write_source(ctx: &JobContext, path: &str, rows: &[(i64, &str)]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("uuid", DataType::Utf8, true),
    ]));
    let ids: Int64Array = rows.iter().map(|(id, _)| *id).collect();
    let uuids: StringArray = rows.iter().map(|(_, uuid)| Some(*uuid)).collect();
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(ids), Arc::new(uuids)])
        .expect("batch");

    ctx.create_dataset(schema, vec![batch])
        .expect("dataset")
        .write()
        .mode(SaveMode::Overwrite)
        .save(path)
        .await
        .expect("write source");
}

async fn read_values(ctx: &JobContext, path: &str) -> Vec<String> {
    let dataset = ctx.read().format("yt").load(path).await.expect("load output");
    assert_eq!(dataset.column_names(), vec!["value"]);

    let mut values = Vec::new();
    for batch in dataset.collect().await.expect("collect") {
        let column = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Utf8 column");
        values.extend(column.iter().map(|v| v.expect("non-null").to_string()));
    }
    values.sort();
    values
}

#[tokio::test]
async fn test_example_rows() {
    let (ctx, client) = memory_context().await;
    write_source(&ctx, DEFAULT_SOURCE, &[(3, "a-b"), (7, "x-y-z")]).await;

    run_udf_example(vec![], ctx.clone(), client)
        .await
        .expect("job succeeds");

    assert_eq!(read_values(&ctx, DEFAULT_DESTINATION).await, vec!["y"]);
}

#[tokio::test]
async fn test_only_rows_above_five_are_mapped() {
    let (ctx, client) = memory_context().await;
    let rows = [
        (1, "a-one-x"),
        (5, "b-five"),
        (6, "c-six"),
        (10, "d-ten-more"),
        (-4, "e-negative"),
    ];
    write_source(&ctx, "/home/in", &rows).await;

    run_udf_example(
        vec!["/home/in".to_string(), "/home/out".to_string()],
        ctx.clone(),
        client,
    )
    .await
    .expect("job succeeds");

    let expected: Vec<String> = {
        let mut v: Vec<String> = rows
            .iter()
            .filter(|(id, _)| *id > 5)
            .map(|(_, uuid)| uuid.split('-').nth(1).expect("has segment").to_string())
            .collect();
        v.sort();
        v
    };
    assert_eq!(read_values(&ctx, "/home/out").await, expected);
    assert_eq!(expected, vec!["six", "ten"]);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let (ctx, client) = memory_context().await;
    write_source(&ctx, DEFAULT_SOURCE, &[(6, "a-b"), (8, "c-d")]).await;

    run_udf_example(vec![], ctx.clone(), client.clone())
        .await
        .expect("first run");
    let first = read_values(&ctx, DEFAULT_DESTINATION).await;

    run_udf_example(vec![], ctx.clone(), client)
        .await
        .expect("second run");
    assert_eq!(read_values(&ctx, DEFAULT_DESTINATION).await, first);
}

#[tokio::test]
async fn test_uuid_without_dash_fails() {
    let (ctx, client) = memory_context().await;
    write_source(&ctx, DEFAULT_SOURCE, &[(2, "ignored"), (9, "nodash")]).await;

    let err = run_udf_example(vec![], ctx.clone(), client)
        .await
        .expect_err("malformed uuid");

    match err {
        JobError::Transform(transform) => {
            assert_eq!(transform.function, "split_uuid");
            assert_eq!(transform.value, "nodash");
        }
        other => panic!("Expected Transform, got {:?}", other),
    }

    let missing = ctx.read().load(DEFAULT_DESTINATION).await;
    assert!(matches!(missing, Err(JobError::PathNotFound(_))));
}

#[tokio::test]
async fn test_dash_free_row_below_threshold_is_fine() {
    let (ctx, client) = memory_context().await;
    write_source(&ctx, DEFAULT_SOURCE, &[(1, "nodash"), (6, "k-v")]).await;

    run_udf_example(vec![], ctx.clone(), client)
        .await
        .expect("filtered rows are never mapped");
    assert_eq!(read_values(&ctx, DEFAULT_DESTINATION).await, vec!["v"]);
}

#[tokio::test]
async fn test_missing_source() {
    let (ctx, client) = memory_context().await;
    let err = run_udf_example(vec![], ctx, client)
        .await
        .expect_err("nothing seeded");
    assert!(matches!(err, JobError::PathNotFound(_)));
}

#[tokio::test]
async fn test_empty_selection_writes_empty_table() {
    let (ctx, client) = memory_context().await;
    write_source(&ctx, DEFAULT_SOURCE, &[(1, "a-b"), (2, "c-d")]).await;

    run_udf_example(vec![], ctx.clone(), client)
        .await
        .expect("job succeeds");
    assert!(read_values(&ctx, DEFAULT_DESTINATION).await.is_empty());
}

#[tokio::test]
async fn test_seeded_table_feeds_the_job() {
    let (ctx, client) = memory_context().await;
    seed_example(&ctx, DEFAULT_SOURCE, 12).await.expect("seed");

    run_udf_example(vec![], ctx.clone(), client)
        .await
        .expect("job succeeds");

    let values = read_values(&ctx, DEFAULT_DESTINATION).await;
    // ids 6..=12
    assert_eq!(values.len(), 7);
    // second group of a v4 uuid
    assert!(values.iter().all(|v| v.len() == 4));
}

#[tokio::test]
#[traced_test]
async fn test_bootstrapped_run_on_local_storage() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path().to_str().expect("utf-8 path").to_string();
    let args = AppArgs {
        app_name: Some("udf-example".to_string()),
        config: None,
        storage_root: Some(root.clone()),
        batch_size: None,
        target_partitions: None,
        log_level: None,
        job_args: vec![],
    };
    let config = args.resolve_config(|_| None).expect("config resolves");

    execute(config.clone(), vec!["20".to_string()], run_seed_example)
        .await
        .expect("seed job");
    execute(config, args.job_args, run_udf_example)
        .await
        .expect("udf job");

    let storage = StorageBuilder::new()
        .backend(StorageBackend::LocalFileSystem { root_path: root })
        .build()
        .await
        .expect("reopen storage");
    let ctx = JobContext::new(JobConfig::default(), storage);
    assert_eq!(read_values(&ctx, DEFAULT_DESTINATION).await.len(), 15);
    assert!(logs_contain("running udf example"));
}
