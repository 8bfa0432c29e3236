//! The posting loop and its pacing

pub mod artwork;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::services::twitter::Publisher;

pub use artwork::{ArtworkPostJob, CycleOutcome, CycleStage};

/// Performs the wait between cycles
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the Tokio timer
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run cycles back to back, pausing after each as its outcome dictates.
///
/// `max_cycles` of `None` runs until the task is dropped; `Some(0)` runs nothing.
pub async fn run<P: Publisher>(
    job: &ArtworkPostJob<P>,
    pacer: &dyn Pacer,
    max_cycles: Option<u64>,
) {
    let mut completed = 0u64;
    while max_cycles.is_none_or(|max| completed < max) {
        let outcome = job.run_cycle().await;
        completed += 1;

        if let CycleOutcome::Skipped { stage, reason, .. } = &outcome {
            warn!(stage = %stage, reason = %reason, "Cycle skipped");
        }

        if max_cycles.is_some_and(|max| completed >= max) {
            info!(cycles = completed, "Cycle limit reached");
            return;
        }

        let wait = outcome.wait(job.config());
        info!(
            cycle = completed,
            published = outcome.is_published(),
            wait_secs = wait.as_secs(),
            "Waiting before next cycle"
        );
        pacer.wait(wait).await;
    }
}
