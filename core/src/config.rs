//! Job configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `YTSPARK_*` environment variables, then command-line flags.

use crate::error::{JobError, JobResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use ytspark_common::StorageBackend;

pub const ENV_STORAGE_ROOT: &str = "YTSPARK_STORAGE_ROOT";
pub const ENV_BATCH_SIZE: &str = "YTSPARK_BATCH_SIZE";
pub const ENV_TARGET_PARTITIONS: &str = "YTSPARK_TARGET_PARTITIONS";
pub const ENV_LOG_LEVEL: &str = "YTSPARK_LOG";

/// Where tables are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageSettings {
    #[default]
    Memory,
    Local {
        root_path: String,
    },
}

impl From<&StorageSettings> for StorageBackend {
    fn from(settings: &StorageSettings) -> Self {
        match settings {
            StorageSettings::Memory => StorageBackend::Memory,
            StorageSettings::Local { root_path } => StorageBackend::LocalFileSystem {
                root_path: root_path.clone(),
            },
        }
    }
}

/// Configuration for a job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub app_name: String,
    pub batch_size: usize,
    pub target_partitions: usize,
    pub storage: StorageSettings,
    pub log_level: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            app_name: "ytspark-app".to_string(),
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            storage: StorageSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl JobConfig {
    /// Load a configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> JobResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            JobError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> JobResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| JobError::Configuration(format!("invalid configuration JSON: {}", e)))
    }

    /// Apply overrides from the environment.
    ///
    /// The lookup is injected so callers can pass `std::env::var` or a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> JobResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root_path) = lookup(ENV_STORAGE_ROOT) {
            self.storage = StorageSettings::Local { root_path };
        }
        if let Some(value) = lookup(ENV_BATCH_SIZE) {
            self.batch_size = parse_usize(ENV_BATCH_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_TARGET_PARTITIONS) {
            self.target_partitions = parse_usize(ENV_TARGET_PARTITIONS, &value)?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> JobResult<()> {
        if self.batch_size == 0 {
            return Err(JobError::Configuration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.target_partitions == 0 {
            return Err(JobError::Configuration(
                "target_partitions must be greater than zero".to_string(),
            ));
        }
        if let StorageSettings::Local { root_path } = &self.storage {
            if root_path.trim().is_empty() {
                return Err(JobError::Configuration(
                    "local storage requires a root_path".to_string(),
                ));
            }
        }
        self.log_level
            .parse::<tracing::Level>()
            .map_err(|_| JobError::Configuration(format!("unknown log level '{}'", self.log_level)))?;
        Ok(())
    }

    /// DataFusion session settings derived from this configuration.
    pub fn session_config(&self) -> datafusion::prelude::SessionConfig {
        datafusion::prelude::SessionConfig::new()
            .with_batch_size(self.batch_size)
            .with_target_partitions(self.target_partitions)
    }
}

fn parse_usize(key: &str, value: &str) -> JobResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| JobError::Configuration(format!("{} must be a number, got '{}'", key, value)))
}
