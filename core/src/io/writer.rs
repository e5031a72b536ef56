use super::{DataSourceFormat, SaveMode, codec};
use crate::context::same_columns;
use crate::dataset::Dataset;
use crate::error::{JobError, JobResult};
use tracing::{debug, info};
use ytspark_common::{TablePath, TableStorage};

/// Builder for persisting a [`Dataset`], obtained from [`Dataset::write`].
///
/// The dataset is fully evaluated before anything at the destination is
/// touched, so a failing computation leaves existing data in place.
#[derive(Debug)]
pub struct DataFrameWriter {
    dataset: Dataset,
    format: String,
    mode: SaveMode,
}

impl DataFrameWriter {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            format: DataSourceFormat::Yt.to_string(),
            mode: SaveMode::default(),
        }
    }

    /// Destination format. Only `yt` tables are writable.
    pub fn format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn save(self, path: &str) -> JobResult<()> {
        let format: DataSourceFormat = self.format.parse()?;
        if format != DataSourceFormat::Yt {
            return Err(JobError::UnsupportedFormat(format!(
                "{} sources are read-only",
                format
            )));
        }

        let table = TablePath::parse(path)?;
        let storage = self.dataset.context().storage();
        let exists = storage.exists(&table).await?;

        match (self.mode, exists) {
            (SaveMode::ErrorIfExists, true) => {
                return Err(JobError::WriteConflict(format!(
                    "table {} already exists",
                    table
                )));
            }
            (SaveMode::Ignore, true) => {
                info!(table = %table, "table exists, skipping write");
                return Ok(());
            }
            _ => {}
        }

        let batches = self.dataset.collect().await?;
        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .unwrap_or_else(|| self.dataset.schema());

        if self.mode == SaveMode::Append && exists {
            check_append_schema(storage.as_ref(), &table, &schema).await?;
        }

        let rows: usize = batches.iter().map(|batch| batch.num_rows()).sum();
        let data = codec::encode_part(schema, &batches)?;

        if self.mode == SaveMode::Overwrite && exists {
            debug!(table = %table, "removing existing table before overwrite");
            storage.remove(&table).await?;
        }
        let part = storage.write_part(&table, data).await?;

        info!(
            table = %table,
            mode = %self.mode,
            rows,
            bytes = part.size,
            "wrote table"
        );
        Ok(())
    }
}

async fn check_append_schema(
    storage: &dyn TableStorage,
    table: &TablePath,
    schema: &datafusion::arrow::datatypes::SchemaRef,
) -> JobResult<()> {
    let parts = storage.list_parts(table).await?;
    let Some(first) = parts.first() else {
        return Ok(());
    };
    let existing = codec::decode_schema(storage.read_part(first).await?)?;
    if same_columns(&existing, schema) {
        Ok(())
    } else {
        Err(JobError::SchemaMismatch(format!(
            "cannot append {:?} to table {} with schema {:?}",
            schema, table, existing
        )))
    }
}
