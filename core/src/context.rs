//! The main context for a ytspark job.

use crate::config::JobConfig;
use crate::dataset::Dataset;
use crate::error::{JobError, JobResult};
use crate::functions::UserDefinedFunction;
use crate::io::DataFrameReader;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::execution::context::SessionContext;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use ytspark_common::TableStorage;

/// `JobContext` is the main entry point of a job.
///
/// It wraps DataFusion's `SessionContext` together with the table storage
/// client the job reads from and writes to. Cloning is cheap; clones share
/// the same session and storage.
#[derive(Clone)]
pub struct JobContext {
    /// The underlying DataFusion session context, which provides query planning and execution capabilities.
    df_session_ctx: SessionContext,
    storage: Arc<dyn TableStorage>,
    config: Arc<JobConfig>,
}

impl JobContext {
    /// Creates a new `JobContext` over the given storage client.
    pub fn new(config: JobConfig, storage: Arc<dyn TableStorage>) -> Self {
        let df_session_ctx = SessionContext::new_with_config(config.session_config());
        Self {
            df_session_ctx,
            storage,
            config: Arc::new(config),
        }
    }

    /// Returns a clone of the underlying DataFusion `SessionContext`.
    pub fn df_session_ctx(&self) -> SessionContext {
        self.df_session_ctx.clone()
    }

    /// The storage client tables are read from and written to.
    pub fn storage(&self) -> Arc<dyn TableStorage> {
        self.storage.clone()
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Start reading a dataset.
    pub fn read(&self) -> DataFrameReader {
        DataFrameReader::new(self.clone())
    }

    /// Register a scalar function so SQL queries can call it by name.
    pub fn register_udf(&self, udf: &UserDefinedFunction) {
        debug!(function = udf.name(), "registering scalar function");
        self.df_session_ctx.register_udf(udf.to_scalar_udf());
    }

    /// Register a dataset as a named view for SQL queries.
    pub fn register_dataset(&self, name: &str, dataset: &Dataset) -> JobResult<()> {
        self.df_session_ctx
            .register_table(name, dataset.dataframe().clone().into_view())?;
        Ok(())
    }

    /// Run a SQL query against registered datasets.
    pub async fn sql(&self, query: &str) -> JobResult<Dataset> {
        let df = self.df_session_ctx.sql(query).await?;
        Ok(Dataset::new(self.clone(), df))
    }

    /// Build a dataset from in-memory record batches.
    ///
    /// Every batch must carry the column names and types of `schema`; an
    /// empty batch list yields an empty dataset.
    pub fn create_dataset(&self, schema: SchemaRef, batches: Vec<RecordBatch>) -> JobResult<Dataset> {
        if let Some(bad) = batches
            .iter()
            .find(|batch| !same_columns(&batch.schema(), &schema))
        {
            return Err(JobError::SchemaMismatch(format!(
                "batch schema {:?} does not match dataset schema {:?}",
                bad.schema(),
                schema
            )));
        }
        let batches = batches
            .into_iter()
            .map(|batch| RecordBatch::try_new(schema.clone(), batch.columns().to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        let table = MemTable::try_new(schema, vec![batches])?;
        let df = self.df_session_ctx.read_table(Arc::new(table))?;
        Ok(Dataset::new(self.clone(), df))
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("session_id", &self.df_session_ctx.session_id())
            .field("storage", &self.storage)
            .field("config", &self.config)
            .finish()
    }
}

/// Two schemas carry the same column names and types, in order.
pub(crate) fn same_columns(left: &SchemaRef, right: &SchemaRef) -> bool {
    left.fields().len() == right.fields().len()
        && left
            .fields()
            .iter()
            .zip(right.fields().iter())
            .all(|(l, r)| l.name() == r.name() && l.data_type() == r.data_type())
}
