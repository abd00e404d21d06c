//! Vector Loader
//!
//! One-shot batch loader: reads a 2-D `.npy` array, (re)creates a Qdrant
//! collection sized to it and upserts every row as a point whose id is the
//! row index.

pub mod config;
pub mod connector;
pub mod metrics;
pub mod model;
pub mod npy;
pub mod pipeline;
pub mod progress;
pub mod provision;
pub mod qdrant;
pub mod service;
pub mod upload;

pub use model::*;
pub use pipeline::{run, RunError, RunOptions, RunSummary, Stage};
pub use qdrant::QdrantClient;
pub use service::{ServiceError, VectorService};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    pub const DEFAULT_FILE_PATH: &str = "/data/vectors.npy";
    pub const DEFAULT_COLLECTION: &str = "vectors";
    pub const DEFAULT_HOST: &str = "qdrant";
    pub const DEFAULT_PORT: u16 = 6333;
    pub const DEFAULT_BATCH_SIZE: usize = 100;
    pub const DEFAULT_MAX_RETRIES: u32 = 30;
    pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}
