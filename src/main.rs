//! Museum poster - posts a random museum artwork to X/Twitter on a fixed interval.
//!
//! Runs until interrupted. Configuration comes from the environment (and `.env`).

use std::sync::Arc;

use museum_poster::config::Config;
use museum_poster::jobs::{self, ArtworkPostJob, TokioPacer};
use museum_poster::services::{SourceRegistry, TwitterPublisher, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log file location is known
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    init_tracing(&config)?;

    tracing::info!("Starting museum poster");
    tracing::info!(
        sources = ?config.sources,
        post_interval_secs = config.post_interval.as_secs(),
        max_upload_bytes = config.max_upload_bytes,
        "Configuration loaded"
    );

    let sources = SourceRegistry::from_config(&config)?;
    let publisher = TwitterPublisher::from_config(&config)?;
    let job = ArtworkPostJob::new(config.clone(), sources, publisher)?;

    tokio::select! {
        _ = jobs::run(&job, &TokioPacer, None) => {}
        // A failed signal listener disables this branch; the loop keeps running
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    job.cleanup().await;
    tracing::info!("Museum poster stopped");
    Ok(())
}
