use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::pipeline::Stage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: f64,
}

/// Wall-clock accounting for one loader run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageTiming>,
    /// Uploaded vectors per second of upload-stage time.
    pub throughput_vectors_per_sec: Option<f64>,
}

impl RunMetrics {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            throughput_vectors_per_sec: None,
        }
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        let duration_ms = elapsed.as_micros() as f64 / 1000.0;
        tracing::debug!("Stage {} took {:.1}ms", stage, duration_ms);
        self.stages.push(StageTiming { stage, duration_ms });
    }

    pub fn stage_ms(&self, stage: Stage) -> Option<f64> {
        self.stages
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.duration_ms)
    }

    pub fn total_ms(&self) -> f64 {
        self.stages.iter().map(|t| t.duration_ms).sum()
    }

    /// Stamps the finish time and derives upload throughput.
    pub fn finish(&mut self, uploaded: usize) {
        self.finished_at = Some(Utc::now());
        self.throughput_vectors_per_sec = self
            .stage_ms(Stage::Upload)
            .filter(|_| uploaded > 0)
            .map(|ms| uploaded as f64 / (ms / 1000.0).max(1e-9));
    }
}

/// Times one stage from construction until [`StageTimer::stop`].
pub struct StageTimer {
    stage: Stage,
    start: Instant,
}

impl StageTimer {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }

    pub fn stop(self, metrics: &mut RunMetrics) {
        metrics.record(self.stage, self.start.elapsed());
    }
}
