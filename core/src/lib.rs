//! ytspark Core - Spark-style jobs over DataFusion
//!
//! This is the core library of the ytspark project. It provides the job
//! context, lazily evaluated datasets, user-defined scalar functions,
//! readers and writers for the table store, and the process bootstrap
//! every job binary goes through.

pub mod app;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod functions;
pub mod io;

pub use config::{JobConfig, StorageSettings};
pub use context::JobContext;
pub use dataset::Dataset;
pub use error::{JobError, JobResult, TransformError};
pub use functions::{UserDefinedFunction, col, lit, split_part_strict, udf_str};
pub use io::{DataFrameReader, DataFrameWriter, DataSourceFormat, SaveMode};
