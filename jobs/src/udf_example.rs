//! The UDF example job.
//!
//! Reads an `(id, uuid)` table, keeps rows with `id > 5`, maps each `uuid`
//! to the segment between its first and second `-` and overwrites the
//! destination table with a single `value` column.

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::info;
use ytspark_common::TableStorage;
use ytspark_core::{
    Dataset, JobContext, JobError, JobResult, SaveMode, UserDefinedFunction, col, lit,
    split_part_strict, udf_str,
};

pub const DEFAULT_SOURCE: &str = "/sys/spark/examples/example_1";
pub const DEFAULT_DESTINATION: &str = "/sys/spark/examples/example_1_map";

/// Rows written by `seed_example` when no count is given.
pub const DEFAULT_SEED_ROWS: usize = 10;

/// Positional job arguments: `[source] [destination]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdfExampleArgs {
    pub source: String,
    pub destination: String,
}

impl UdfExampleArgs {
    pub fn from_args(args: &[String]) -> JobResult<Self> {
        match args {
            [] => Ok(Self::default()),
            [source] => Ok(Self {
                source: source.clone(),
                ..Self::default()
            }),
            [source, destination] => Ok(Self {
                source: source.clone(),
                destination: destination.clone(),
            }),
            _ => Err(JobError::Configuration(format!(
                "expected at most 2 arguments (source, destination), got {}",
                args.len()
            ))),
        }
    }
}

impl Default for UdfExampleArgs {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
        }
    }
}

/// `split(uuid, "-")[1]`; a uuid without `-` fails the job.
pub fn split_udf() -> UserDefinedFunction {
    udf_str("split_uuid", split_part_strict("-", 1))
}

/// The transformation part of the job, without any I/O.
pub fn filter_map(input: &Dataset) -> JobResult<Dataset> {
    let split = split_udf();
    input
        .filter(col("id").gt(lit(5)))?
        .select(vec![split.apply(vec![col("uuid")]).alias("value")])
}

pub async fn run_udf_example(
    args: Vec<String>,
    ctx: JobContext,
    _client: Arc<dyn TableStorage>,
) -> JobResult<()> {
    let args = UdfExampleArgs::from_args(&args)?;
    info!(source = %args.source, destination = %args.destination, "running udf example");

    let input = ctx.read().format("yt").load(&args.source).await?;
    filter_map(&input)?
        .write()
        .mode(SaveMode::Overwrite)
        .format("yt")
        .save(&args.destination)
        .await
}

/// Overwrite `path` with `rows` rows of `(id, uuid)`, ids starting at 1.
pub async fn seed_example(ctx: &JobContext, path: &str, rows: usize) -> JobResult<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("uuid", DataType::Utf8, false),
    ]));
    let last_id = i64::try_from(rows).map_err(|_| {
        JobError::Configuration(format!("row count {} does not fit in an i64 id", rows))
    })?;
    let ids: Int64Array = (1..=last_id).collect();
    let uuids: StringArray = (0..rows)
        .map(|_| Some(uuid::Uuid::new_v4().to_string()))
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(ids), Arc::new(uuids)])?;

    ctx.create_dataset(schema, vec![batch])?
        .write()
        .mode(SaveMode::Overwrite)
        .save(path)
        .await?;
    info!(path, rows, "seeded example table");
    Ok(())
}

/// Job entry for `seed_example`: `[rows] [destination]`.
pub async fn run_seed_example(
    args: Vec<String>,
    ctx: JobContext,
    _client: Arc<dyn TableStorage>,
) -> JobResult<()> {
    let rows = match args.first() {
        Some(value) => value.parse::<usize>().map_err(|_| {
            JobError::Configuration(format!("row count must be a number, got '{}'", value))
        })?,
        None => DEFAULT_SEED_ROWS,
    };
    let path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_SOURCE);
    seed_example(&ctx, path, rows).await
}
