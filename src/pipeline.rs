//! Orchestrator: connect, load, provision, upload. Each stage gates the next
//! and the first failure ends the run.

use crate::connector::{self, ConnectFailure, RetryPolicy};
use crate::metrics::{RunMetrics, StageTimer};
use crate::model::{CollectionSpec, Distance};
use crate::npy::{self, ArrayError};
use crate::progress::ProgressObserver;
use crate::provision::{self, ProvisionFailure};
use crate::service::{ServiceError, VectorService};
use crate::upload::{self, UploadFailure};
use crate::defaults;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Connect,
    Load,
    Provision,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Connect => "connect",
            Stage::Load => "load",
            Stage::Provision => "provision",
            Stage::Upload => "upload",
        };
        f.write_str(s)
    }
}

/// Terminal failure of a run, tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("connect stage failed")]
    Connect(#[source] ConnectFailure),

    #[error("load stage failed")]
    Load(#[source] ArrayError),

    #[error("provision stage failed")]
    Provision(#[source] ProvisionFailure),

    #[error("upload stage failed")]
    Upload(#[source] UploadFailure),
}

impl RunError {
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Connect(_) => Stage::Connect,
            RunError::Load(_) => Stage::Load,
            RunError::Provision(_) => Stage::Provision,
            RunError::Upload(_) => Stage::Upload,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub collection: String,
    pub distance: Distance,
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            collection: defaults::DEFAULT_COLLECTION.to_string(),
            distance: Distance::default(),
            batch_size: defaults::DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub collection: String,
    pub dimensionality: usize,
    pub distance: Distance,
    pub total_uploaded: usize,
    pub batches: usize,
    pub metrics: RunMetrics,
}

impl RunSummary {
    /// Writes the summary as pretty JSON.
    pub fn export_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        tracing::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

/// Runs the whole load. `open` builds a fresh session for each connection
/// attempt; nothing is retried beyond what the connector does.
pub async fn run<S, F>(
    path: &Path,
    options: &RunOptions,
    open: F,
    observer: &dyn ProgressObserver,
) -> Result<RunSummary, RunError>
where
    S: VectorService,
    F: FnMut() -> Result<S, ServiceError>,
{
    let mut metrics = RunMetrics::start();

    let timer = StageTimer::new(Stage::Connect);
    let session = connector::connect(open, &options.retry, observer)
        .await
        .map_err(RunError::Connect)?;
    timer.stop(&mut metrics);

    let timer = StageTimer::new(Stage::Load);
    let vectors = npy::load(path).await.map_err(RunError::Load)?;
    timer.stop(&mut metrics);

    let spec = CollectionSpec::for_vectors(options.collection.clone(), &vectors, options.distance);
    let timer = StageTimer::new(Stage::Provision);
    provision::provision(&session, &spec, observer)
        .await
        .map_err(RunError::Provision)?;
    timer.stop(&mut metrics);

    let timer = StageTimer::new(Stage::Upload);
    let uploaded = upload::upload(&session, &spec.name, &vectors, options.batch_size, observer)
        .await
        .map_err(RunError::Upload)?;
    timer.stop(&mut metrics);

    metrics.finish(uploaded.total_uploaded);
    Ok(RunSummary {
        collection: spec.name,
        dimensionality: spec.dimensionality,
        distance: spec.distance,
        total_uploaded: uploaded.total_uploaded,
        batches: uploaded.batches,
        metrics,
    })
}
