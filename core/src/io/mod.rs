//! Reading datasets from, and writing them to, storage.

mod codec;
mod reader;
mod writer;

pub use reader::DataFrameReader;
pub use writer::DataFrameWriter;

use crate::error::JobError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a write behaves when the destination table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SaveMode {
    /// Add a new part next to the existing ones.
    Append,
    /// Replace the existing contents.
    Overwrite,
    /// Fail with a write conflict.
    #[default]
    ErrorIfExists,
    /// Leave the existing table untouched and skip the write.
    Ignore,
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveMode::Append => "append",
            SaveMode::Overwrite => "overwrite",
            SaveMode::ErrorIfExists => "errorifexists",
            SaveMode::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

impl FromStr for SaveMode {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(SaveMode::Append),
            "overwrite" => Ok(SaveMode::Overwrite),
            "errorifexists" | "error" | "default" => Ok(SaveMode::ErrorIfExists),
            "ignore" => Ok(SaveMode::Ignore),
            _ => Err(JobError::Configuration(format!("unknown save mode '{}'", s))),
        }
    }
}

/// Source formats understood by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceFormat {
    /// Tables in the job's table store.
    Yt,
    /// CSV files on the local filesystem.
    Csv,
    /// Parquet files on the local filesystem.
    Parquet,
}

impl fmt::Display for DataSourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataSourceFormat::Yt => "yt",
            DataSourceFormat::Csv => "csv",
            DataSourceFormat::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

impl FromStr for DataSourceFormat {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yt" => Ok(DataSourceFormat::Yt),
            "csv" => Ok(DataSourceFormat::Csv),
            "parquet" => Ok(DataSourceFormat::Parquet),
            _ => Err(JobError::UnsupportedFormat(s.to_string())),
        }
    }
}
