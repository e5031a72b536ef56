//! Example jobs built on ytspark-core.

pub mod udf_example;
