//! Process entry point for ytspark jobs.
//!
//! A job is a plain async function. [`run`] parses the command line,
//! resolves configuration, initialises logging, builds the storage client
//! and the [`JobContext`], then hands them to the job:
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     ytspark_core::app::run(my_job)
//! }
//!
//! async fn my_job(args: Vec<String>, ctx: JobContext, client: Arc<dyn TableStorage>) -> JobResult<()> {
//!     // ...
//! }
//! ```

use crate::config::{JobConfig, StorageSettings};
use crate::context::JobContext;
use crate::error::JobResult;
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use ytspark_common::{StorageBackend, StorageBuilder, TableStorage};

/// Command-line arguments shared by every job binary.
///
/// Positional arguments are forwarded to the job unmodified. Put `--` in
/// front of them when the first one starts with a dash.
#[derive(Debug, Clone, Parser)]
#[command(about = "Run a ytspark job")]
pub struct AppArgs {
    /// Application name reported in logs
    #[arg(long)]
    pub app_name: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store tables under this local directory instead of in memory
    #[arg(long)]
    pub storage_root: Option<String>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub target_partitions: Option<usize>,

    /// trace, debug, info, warn or error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Arguments for the job itself
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub job_args: Vec<String>,
}

impl AppArgs {
    /// Resolve the configuration: defaults, then `--config`, then the
    /// environment, then command-line flags.
    pub fn resolve_config<F>(&self, env: F) -> JobResult<JobConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config {
            Some(path) => JobConfig::from_json_file(path)?,
            None => JobConfig::default(),
        };
        config.apply_env(env)?;

        if let Some(app_name) = &self.app_name {
            config.app_name = app_name.clone();
        }
        if let Some(root_path) = &self.storage_root {
            config.storage = StorageSettings::Local {
                root_path: root_path.clone(),
            };
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(target_partitions) = self.target_partitions {
            config.target_partitions = target_partitions;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Run `job` with arguments from the process command line.
pub fn run<J, Fut>(job: J) -> ExitCode
where
    J: FnOnce(Vec<String>, JobContext, Arc<dyn TableStorage>) -> Fut,
    Fut: Future<Output = JobResult<()>>,
{
    run_with_args(AppArgs::parse(), job)
}

/// Run `job` with already parsed arguments. Any failure is logged and
/// turned into a non-zero exit code; nothing is retried.
pub fn run_with_args<J, Fut>(args: AppArgs, job: J) -> ExitCode
where
    J: FnOnce(Vec<String>, JobContext, Arc<dyn TableStorage>) -> Fut,
    Fut: Future<Output = JobResult<()>>,
{
    let config = match args.resolve_config(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(Level::INFO);
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_level.parse().unwrap_or(Level::INFO));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(config, args.job_args, job)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "job failed");
            ExitCode::FAILURE
        }
    }
}

/// Build the storage client and the context for `config`, then invoke `job`.
pub async fn execute<J, Fut>(config: JobConfig, job_args: Vec<String>, job: J) -> JobResult<()>
where
    J: FnOnce(Vec<String>, JobContext, Arc<dyn TableStorage>) -> Fut,
    Fut: Future<Output = JobResult<()>>,
{
    info!(
        app = %config.app_name,
        storage = ?config.storage,
        batch_size = config.batch_size,
        target_partitions = config.target_partitions,
        "starting job"
    );

    let storage = StorageBuilder::new()
        .backend(StorageBackend::from(&config.storage))
        .build()
        .await?;
    let ctx = JobContext::new(config, storage.clone());

    job(job_args, ctx, storage).await?;
    info!("job finished");
    Ok(())
}

/// Install the global fmt subscriber. Later calls are no-ops.
pub fn init_tracing(level: Level) {
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> AppArgs {
        AppArgs::try_parse_from(std::iter::once("ytspark").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn test_trailing_arguments_are_forwarded() {
        let args = parse(&["--batch-size", "16", "/src", "/dst", "--flag"]);
        assert_eq!(args.batch_size, Some(16));
        assert_eq!(args.job_args, vec!["/src", "/dst", "--flag"]);

        let args = parse(&["--", "--only-for-the-job"]);
        assert_eq!(args.job_args, vec!["--only-for-the-job"]);
    }

    #[test]
    fn test_config_layers() {
        let dir = TempDir::new().expect("temp dir");
        let file = dir.path().join("job.json");
        std::fs::write(&file, r#"{"app_name": "from-file", "batch_size": 100, "log_level": "warn"}"#)
            .expect("write config");

        let env: HashMap<&str, &str> = [("YTSPARK_BATCH_SIZE", "200"), ("YTSPARK_LOG", "debug")]
            .into_iter()
            .collect();

        let args = parse(&[
            "--config",
            file.to_str().expect("utf-8 path"),
            "--log-level",
            "error",
        ]);
        let config = args
            .resolve_config(|key| env.get(key).map(|v| v.to_string()))
            .expect("config resolves");

        // file
        assert_eq!(config.app_name, "from-file");
        // env beats file
        assert_eq!(config.batch_size, 200);
        // flag beats env
        assert_eq!(config.log_level, "error");
    }

    #[test]
    fn test_invalid_flag_value_is_rejected() {
        let args = parse(&["--target-partitions", "0"]);
        let err = args.resolve_config(|_| None).expect_err("zero partitions");
        assert!(matches!(err, JobError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_execute_injects_context_and_client() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().join("tables");
        let args = parse(&[
            "--storage-root",
            root.to_str().expect("utf-8 path"),
            "--app-name",
            "injected",
            "a",
            "b",
        ]);

        let config = args.resolve_config(|_| None).expect("config resolves");

        let seen = Arc::new(Mutex::new(None));
        let recorder = seen.clone();
        execute(
            config,
            args.job_args,
            move |job_args, ctx, client| async move {
                let stats = client.stats().await;
                *recorder.lock().unwrap() = Some((job_args, ctx.config().app_name.clone(), stats));
                Ok(())
            },
        )
        .await
        .expect("job succeeds");

        let (job_args, app_name, stats) = seen.lock().unwrap().take().expect("job ran");
        assert_eq!(job_args, vec!["a", "b"]);
        assert_eq!(app_name, "injected");
        assert_eq!(stats.write_count, 0);
        assert!(root.exists());
    }

    #[tokio::test]
    async fn test_execute_propagates_job_failure() {
        let err = execute(
            JobConfig::default(),
            vec![],
            |_, _, _| async { Err(JobError::PathNotFound("/sys/missing".to_string())) },
        )
        .await
        .expect_err("job fails");
        assert!(matches!(err, JobError::PathNotFound(_)));
    }
}
