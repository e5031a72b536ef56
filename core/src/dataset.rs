//! `Dataset`, a lazily evaluated table handle on top of DataFusion.

use crate::context::JobContext;
use crate::error::JobResult;
use crate::io::DataFrameWriter;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::Expr;
use std::fmt;

/// A collection of rows with a named-column schema.
///
/// A `Dataset` only describes a computation; nothing runs until an action
/// (`collect`, `count`, `show` or a write) is triggered.
#[derive(Clone)]
pub struct Dataset {
    /// The job context, providing access to the session and the storage client.
    context: JobContext,
    /// The DataFusion dataframe holding the dataset's lineage.
    dataframe: DataFrame,
}

impl Dataset {
    pub fn new(context: JobContext, dataframe: DataFrame) -> Self {
        Self { context, dataframe }
    }

    /// Returns the context associated with this dataset.
    pub fn context(&self) -> &JobContext {
        &self.context
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.dataframe
    }

    /// The Arrow schema of the rows this dataset produces.
    pub fn schema(&self) -> SchemaRef {
        self.dataframe.schema().inner().clone()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    fn derive(&self, dataframe: DataFrame) -> Self {
        Self::new(self.context.clone(), dataframe)
    }

    // --- Transformations ---

    /// Returns a new dataset containing only the rows that satisfy a predicate.
    pub fn filter(&self, predicate: Expr) -> JobResult<Self> {
        Ok(self.derive(self.dataframe.clone().filter(predicate)?))
    }

    /// Returns a new dataset with one column per expression.
    pub fn select(&self, exprs: Vec<Expr>) -> JobResult<Self> {
        Ok(self.derive(self.dataframe.clone().select(exprs)?))
    }

    /// Returns a new dataset by selecting a set of columns by name.
    pub fn select_columns(&self, columns: &[&str]) -> JobResult<Self> {
        Ok(self.derive(self.dataframe.clone().select_columns(columns)?))
    }

    /// Adds a column, or replaces the column with the same name.
    pub fn with_column(&self, name: &str, expr: Expr) -> JobResult<Self> {
        Ok(self.derive(self.dataframe.clone().with_column(name, expr)?))
    }

    pub fn limit(&self, n: usize) -> JobResult<Self> {
        Ok(self.derive(self.dataframe.clone().limit(0, Some(n))?))
    }

    // --- Actions ---

    /// Returns all rows of the dataset as a collection of `RecordBatch`es.
    pub async fn collect(&self) -> JobResult<Vec<RecordBatch>> {
        Ok(self.dataframe.clone().collect().await?)
    }

    /// Returns the number of rows in the dataset.
    pub async fn count(&self) -> JobResult<usize> {
        Ok(self.dataframe.clone().count().await?)
    }

    /// Print the rows to stdout.
    pub async fn show(&self) -> JobResult<()> {
        Ok(self.dataframe.clone().show().await?)
    }

    /// Start writing this dataset to storage.
    pub fn write(&self) -> DataFrameWriter {
        DataFrameWriter::new(self.clone())
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("schema", &self.schema())
            .finish_non_exhaustive()
    }
}
