use crate::connector::RetryPolicy;
use crate::defaults;
use crate::model::Distance;
use crate::pipeline::RunOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Load a 2-D `.npy` vector file into a Qdrant collection, replacing any
/// collection of the same name.
#[derive(Debug, Clone, Parser)]
#[command(name = "vector-loader", version, about)]
pub struct LoaderConfig {
    /// Path of the .npy file to load
    #[arg(long, env = "NPY_FILE_PATH", default_value = defaults::DEFAULT_FILE_PATH)]
    pub file: PathBuf,

    /// Target collection, dropped and recreated on every run
    #[arg(long, env = "COLLECTION_NAME", default_value = defaults::DEFAULT_COLLECTION, value_parser = non_empty)]
    pub collection: String,

    #[arg(long, env = "QDRANT_HOST", default_value = defaults::DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "QDRANT_PORT", default_value_t = defaults::DEFAULT_PORT)]
    pub port: u16,

    /// Points per upsert request
    #[arg(long, env = "BATCH_SIZE", default_value_t = defaults::DEFAULT_BATCH_SIZE, value_parser = positive)]
    pub batch_size: usize,

    /// Connection attempts before giving up
    #[arg(
        long,
        env = "CONNECT_MAX_RETRIES",
        default_value_t = defaults::DEFAULT_MAX_RETRIES,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_retries: u32,

    /// Fixed pause between connection attempts
    #[arg(long, env = "CONNECT_RETRY_DELAY_SECS", default_value_t = defaults::DEFAULT_RETRY_DELAY_SECS)]
    pub retry_delay_secs: u64,

    /// cosine | euclid | dot | manhattan
    #[arg(long, env = "DISTANCE_METRIC", default_value = "cosine")]
    pub distance: Distance,

    /// Per-request HTTP timeout
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = defaults::DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Write a JSON run report here on success
    #[arg(long, env = "RUN_REPORT_PATH")]
    pub report: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, env = "LOADER_VERBOSE")]
    pub verbose: bool,
}

fn non_empty(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl LoaderConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            collection: self.collection.clone(),
            distance: self.distance,
            batch_size: self.batch_size,
            retry: self.retry_policy(),
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("Parameters:");
        tracing::info!("  npy file:   {}", self.file.display());
        tracing::info!("  collection: {} ({})", self.collection, self.distance);
        tracing::info!("  qdrant:     {}:{}", self.host, self.port);
        tracing::info!(
            "  batch size: {}, connect retries: {} every {}s",
            self.batch_size,
            self.max_retries,
            self.retry_delay_secs
        );
    }
}
