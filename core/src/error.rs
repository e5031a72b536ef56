//! Error types for ytspark jobs.
//!
//! `JobError` is the taxonomy a job driver sees: every failure coming out of
//! the engine, the storage client or a user-defined function is folded into
//! one of these variants and propagated to the process entry point.

use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use datafusion::parquet::errors::ParquetError;
use std::error::Error as StdError;
use thiserror::Error;
use ytspark_common::CommonError;

/// Failure raised by a scalar transformation on a single value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{function}({value:?}) failed{}: {message}", at_row(.row))]
pub struct TransformError {
    /// Name of the registered function.
    pub function: String,
    /// The offending input value.
    pub value: String,
    /// Row index inside the batch being evaluated, when known.
    pub row: Option<usize>,
    pub message: String,
}

fn at_row(row: &Option<usize>) -> String {
    row.map(|row| format!(" at row {}", row)).unwrap_or_default()
}

impl TransformError {
    /// Create an error with only a message; the function wrapper fills in the rest.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            function: String::new(),
            value: String::new(),
            row: None,
            message: message.into(),
        }
    }

    pub(crate) fn located(mut self, function: &str, value: &str, row: usize) -> Self {
        self.function = function.to_string();
        self.value = value.to_string();
        self.row = Some(row);
        self
    }
}

/// Error types for job operations
#[derive(Error, Debug, Clone)]
pub enum JobError {
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Transformation failed: {0}")]
    Transform(TransformError),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("DataFusion error: {0}")]
    DataFusion(String),
}

/// Result type for job operations
pub type JobResult<T> = Result<T, JobError>;

/// Walk the source chain looking for a transformation failure.
fn find_transform_error(err: &(dyn StdError + 'static)) -> Option<TransformError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(transform) = e.downcast_ref::<TransformError>() {
            return Some(transform.clone());
        }
        current = e.source();
    }
    None
}

impl From<DataFusionError> for JobError {
    fn from(err: DataFusionError) -> Self {
        if let Some(transform) = find_transform_error(&err) {
            return JobError::Transform(transform);
        }
        match err.find_root() {
            root @ DataFusionError::SchemaError(..) => JobError::SchemaMismatch(root.to_string()),
            DataFusionError::ObjectStore(e) => JobError::Storage(e.to_string()),
            _ => JobError::DataFusion(err.to_string()),
        }
    }
}

impl From<ArrowError> for JobError {
    fn from(err: ArrowError) -> Self {
        if let Some(transform) = find_transform_error(&err) {
            return JobError::Transform(transform);
        }
        match err {
            ArrowError::SchemaError(msg) => JobError::SchemaMismatch(msg),
            other => JobError::DataFusion(other.to_string()),
        }
    }
}

impl From<ParquetError> for JobError {
    fn from(err: ParquetError) -> Self {
        JobError::Serialization(err.to_string())
    }
}

impl From<CommonError> for JobError {
    fn from(err: CommonError) -> Self {
        let message = err.to_string();
        match err {
            CommonError::NotFoundError { .. } => JobError::PathNotFound(message),
            CommonError::AlreadyExistsError { .. } => JobError::WriteConflict(message),
            CommonError::PermissionError { .. } => JobError::Permission(message),
            CommonError::ConfigurationError { .. } | CommonError::InvalidPathError { .. } => {
                JobError::Configuration(message)
            }
            CommonError::StorageError { .. } => JobError::Storage(message),
        }
    }
}

impl From<JobError> for DataFusionError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Transform(transform) => DataFusionError::External(Box::new(transform)),
            JobError::SchemaMismatch(msg) => DataFusionError::Plan(msg),
            other => DataFusionError::Execution(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::common::{Column, SchemaError};

    #[test]
    fn test_transform_error_display() {
        let err = TransformError::new("no segment 1").located("split_uuid", "abc", 4);
        assert_eq!(
            err.to_string(),
            "split_uuid(\"abc\") failed at row 4: no segment 1"
        );

        let bare = TransformError::new("boom");
        assert_eq!(bare.row, None);
        assert_eq!(bare.to_string(), "(\"\") failed: boom");
    }

    #[test]
    fn test_transform_error_survives_datafusion_wrapping() {
        let transform = TransformError::new("bad input").located("f", "x", 0);
        let wrapped = DataFusionError::Context(
            "while executing".to_string(),
            Box::new(DataFusionError::External(Box::new(transform.clone()))),
        );

        match JobError::from(wrapped) {
            JobError::Transform(found) => assert_eq!(found, transform),
            other => panic!("Expected Transform, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_error_survives_arrow_wrapping() {
        let transform = TransformError::new("bad input").located("f", "x", 2);
        let arrow = ArrowError::ExternalError(Box::new(DataFusionError::External(Box::new(
            transform.clone(),
        ))));

        match JobError::from(arrow) {
            JobError::Transform(found) => assert_eq!(found.row, Some(2)),
            other => panic!("Expected Transform, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_error_maps_to_schema_mismatch() {
        let err = DataFusionError::SchemaError(
            SchemaError::FieldNotFound {
                field: Box::new(Column::from_name("missing")),
                valid_fields: vec![],
            },
            Box::new(None),
        );

        assert!(matches!(JobError::from(err), JobError::SchemaMismatch(_)));
    }

    #[test]
    fn test_common_error_mapping() {
        let not_found = JobError::from(CommonError::not_found_error("/t"));
        assert!(matches!(not_found, JobError::PathNotFound(_)));

        let storage = JobError::from(CommonError::storage_error("backend down"));
        assert!(matches!(storage, JobError::Storage(_)));

        let invalid = JobError::from(CommonError::invalid_path_error("relative"));
        assert!(matches!(invalid, JobError::Configuration(_)));
    }

    #[test]
    fn test_job_error_into_datafusion_keeps_transform() {
        let transform = TransformError::new("nope");
        let df: DataFusionError = JobError::Transform(transform.clone()).into();
        match JobError::from(df) {
            JobError::Transform(found) => assert_eq!(found, transform),
            other => panic!("Expected Transform, got {:?}", other),
        }
    }
}
