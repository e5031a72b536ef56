use super::{DataSourceFormat, codec};
use crate::context::{JobContext, same_columns};
use crate::dataset::Dataset;
use crate::error::{JobError, JobResult};
use datafusion::arrow::datatypes::{Field, Schema, SchemaRef};
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use ytspark_common::TablePath;

/// Builder for loading a [`Dataset`], obtained from [`JobContext::read`].
///
/// ```ignore
/// let rows = ctx.read().format("yt").load("/sys/spark/examples/example_1").await?;
/// ```
#[derive(Debug)]
pub struct DataFrameReader {
    context: JobContext,
    format: String,
    options: HashMap<String, String>,
}

impl DataFrameReader {
    pub fn new(context: JobContext) -> Self {
        Self {
            context,
            format: DataSourceFormat::Yt.to_string(),
            options: HashMap::new(),
        }
    }

    /// Source format: `yt` (default), `csv` or `parquet`.
    pub fn format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    /// Format-specific option. CSV understands `header` and `delimiter`.
    pub fn option(mut self, key: &str, value: impl ToString) -> Self {
        self.options.insert(key.to_ascii_lowercase(), value.to_string());
        self
    }

    pub async fn load(self, path: &str) -> JobResult<Dataset> {
        let format: DataSourceFormat = self.format.parse()?;
        match format {
            DataSourceFormat::Yt => self.load_table(path).await,
            DataSourceFormat::Csv => self.load_csv(path).await,
            DataSourceFormat::Parquet => self.load_parquet(path).await,
        }
    }

    async fn load_table(self, path: &str) -> JobResult<Dataset> {
        self.warn_unused_options(&[]);

        let table = TablePath::parse(path)?;
        let storage = self.context.storage();
        let parts = storage.list_parts(&table).await?;
        let batch_size = self.context.config().batch_size;

        let mut schema: Option<SchemaRef> = None;
        let mut batches = Vec::new();
        for part in &parts {
            let data = storage.read_part(part).await?;
            let (part_schema, part_batches) = codec::decode_part(data, batch_size)?;
            schema = Some(match schema.take() {
                None => part_schema,
                Some(expected) if !same_columns(&expected, &part_schema) => {
                    return Err(JobError::SchemaMismatch(format!(
                        "part {} of {} has schema {:?}, expected {:?}",
                        part.location(),
                        table,
                        part_schema,
                        expected
                    )));
                }
                Some(expected) => widen_nullability(&expected, &part_schema),
            });
            batches.extend(part_batches);
        }

        let Some(schema) = schema else {
            return Err(JobError::PathNotFound(table.to_string()));
        };

        let rows: usize = batches.iter().map(|batch| batch.num_rows()).sum();
        info!(table = %table, parts = parts.len(), rows, "loaded table");
        self.context.create_dataset(schema, batches)
    }

    async fn load_csv(self, path: &str) -> JobResult<Dataset> {
        self.warn_unused_options(&["header", "delimiter"]);
        ensure_local_path(path).await?;

        let has_header = self.bool_option("header", true)?;
        let delimiter = self.delimiter_option()?;
        let options = CsvReadOptions::new()
            .has_header(has_header)
            .delimiter(delimiter);

        let df = self.context.df_session_ctx().read_csv(path, options).await?;
        info!(path, "loaded csv");
        Ok(Dataset::new(self.context, df))
    }

    async fn load_parquet(self, path: &str) -> JobResult<Dataset> {
        self.warn_unused_options(&[]);
        ensure_local_path(path).await?;

        let df = self
            .context
            .df_session_ctx()
            .read_parquet(path, ParquetReadOptions::default())
            .await?;
        info!(path, "loaded parquet");
        Ok(Dataset::new(self.context, df))
    }

    fn bool_option(&self, key: &str, default: bool) -> JobResult<bool> {
        match self.options.get(key) {
            None => Ok(default),
            Some(value) => value.trim().to_ascii_lowercase().parse().map_err(|_| {
                JobError::Configuration(format!("option '{}' must be true or false, got '{}'", key, value))
            }),
        }
    }

    fn delimiter_option(&self) -> JobResult<u8> {
        match self.options.get("delimiter").map(String::as_bytes) {
            None => Ok(b','),
            Some([byte]) => Ok(*byte),
            Some(_) => Err(JobError::Configuration(
                "option 'delimiter' must be a single ASCII character".to_string(),
            )),
        }
    }

    fn warn_unused_options(&self, known: &[&str]) {
        for key in self.options.keys() {
            if !known.contains(&key.as_str()) {
                warn!(format = %self.format, option = %key, "ignoring unknown reader option");
            }
        }
    }
}

/// A column is nullable if it is nullable in either schema.
fn widen_nullability(schema: &SchemaRef, other: &SchemaRef) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(other.fields().iter())
        .map(|(left, right)| {
            left.as_ref()
                .clone()
                .with_nullable(left.is_nullable() || right.is_nullable())
        })
        .collect();
    Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()))
}

async fn ensure_local_path(path: &str) -> JobResult<()> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(JobError::PathNotFound(path.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(JobError::Permission(format!("{}: {}", path, e)))
        }
        Err(e) => Err(JobError::Storage(format!("{}: {}", path, e))),
    }
}
