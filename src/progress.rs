//! Progress events emitted by each stage.
//!
//! Observers are advisory: they get a shared reference to the event, return
//! nothing and cannot change what the pipeline does next.

use crate::model::{CollectionSpec, Distance};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    ConnectAttempt { attempt: u32, total: u32 },
    ConnectRetry { attempt: u32, total: u32, error: String, delay: Duration },
    Connected { attempt: u32 },
    ConnectExhausted { attempts: u32 },
    CollectionReplaced { name: String },
    CollectionCreated { name: String, dimensionality: usize, distance: Distance },
    UploadStarted { collection: String, total: usize },
    BatchUploaded { batch: usize, uploaded: usize, total: usize },
    UploadFinished { collection: String, total: usize },
}

impl Progress {
    pub(crate) fn created(spec: &CollectionSpec) -> Self {
        Progress::CollectionCreated {
            name: spec.name.clone(),
            dimensionality: spec.dimensionality,
            distance: spec.distance,
        }
    }
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, event: &Progress) {
        self(event)
    }
}

/// Drops every event.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _event: &Progress) {}
}

/// Reports events through `tracing`.
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, event: &Progress) {
        match event {
            Progress::ConnectAttempt { attempt, total } => {
                tracing::debug!("Connection attempt {}/{}", attempt, total);
            }
            Progress::ConnectRetry {
                attempt,
                total,
                error,
                delay,
            } => {
                tracing::warn!(
                    "Connection attempt {}/{} failed: {} (retrying in {:?})",
                    attempt,
                    total,
                    error,
                    delay
                );
            }
            Progress::Connected { attempt } => {
                tracing::info!("Connected to vector service on attempt {}", attempt);
            }
            Progress::ConnectExhausted { attempts } => {
                tracing::error!("Could not connect to vector service after {} attempts", attempts);
            }
            Progress::CollectionReplaced { name } => {
                tracing::info!("Collection '{}' already exists, deleted it for a clean reload", name);
            }
            Progress::CollectionCreated {
                name,
                dimensionality,
                distance,
            } => {
                tracing::info!(
                    "Created collection '{}' (dimensionality {}, distance {})",
                    name,
                    dimensionality,
                    distance
                );
            }
            Progress::UploadStarted { collection, total } => {
                tracing::info!("Uploading {} vectors into '{}'", total, collection);
            }
            Progress::BatchUploaded { uploaded, total, .. } => {
                tracing::info!("Uploaded {}/{} vectors", uploaded, total);
            }
            Progress::UploadFinished { collection, total } => {
                tracing::info!("All {} vectors uploaded into '{}'", total, collection);
            }
        }
    }
}
