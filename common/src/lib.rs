//! Common utilities and abstractions for the ytspark project.
//!
//! This crate provides the error type shared by every crate and the
//! path-addressed table storage the jobs read from and write to.

pub mod error;
pub mod storage;

pub use error::{CommonError, Result};
pub use storage::{
    StorageBackend, StorageBuilder, StorageStats, TablePart, TablePath, TableStorage,
};
