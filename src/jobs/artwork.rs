//! Artwork posting cycle
//!
//! One cycle: pick a source, fetch a record, stage its image, compose the
//! text, publish, and remove the scratch file. Every failure ends the cycle
//! early as a [CycleOutcome::Skipped]; the caller decides how long to wait
//! from the outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::services::artwork::{ImageAcquirer, remove_scratch_image};
use crate::services::sources::{SourceKind, SourceRegistry};
use crate::services::twitter::{PublishedPost, Publisher};

/// Where a skipped cycle stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetch,
    Acquire,
    Publish,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleStage::Fetch => "fetch",
            CycleStage::Acquire => "acquire",
            CycleStage::Publish => "publish",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Published {
        source: SourceKind,
        post: PublishedPost,
    },
    Skipped {
        source: Option<SourceKind>,
        stage: CycleStage,
        reason: String,
    },
}

impl CycleOutcome {
    /// Pause before the next cycle
    pub fn wait(&self, config: &Config) -> Duration {
        match self {
            CycleOutcome::Published { .. } => config.post_interval,
            CycleOutcome::Skipped {
                stage: CycleStage::Fetch | CycleStage::Acquire,
                ..
            } => config.fetch_retry_delay,
            CycleOutcome::Skipped {
                stage: CycleStage::Publish,
                ..
            } => config.publish_retry_delay,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }
}

/// Posts one random artwork per cycle
pub struct ArtworkPostJob<P> {
    config: Arc<Config>,
    sources: SourceRegistry,
    acquirer: ImageAcquirer,
    publisher: P,
}

impl<P: Publisher> ArtworkPostJob<P> {
    pub fn new(config: Arc<Config>, sources: SourceRegistry, publisher: P) -> Result<Self> {
        let acquirer = ImageAcquirer::new(
            config.image_path.clone(),
            config.max_upload_bytes,
            config.jpeg_quality,
            config.http_timeout,
        )?;
        Ok(Self {
            config,
            sources,
            acquirer,
            publisher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(source) = self.sources.choose() else {
            error!("No artwork sources configured");
            return CycleOutcome::Skipped {
                source: None,
                stage: CycleStage::Fetch,
                reason: "no artwork sources configured".to_string(),
            };
        };
        let kind = source.kind();
        info!(source = %kind, "Starting artwork cycle");

        let record = match source.fetch().await {
            Ok(record) => record,
            Err(e) => {
                error!(source = %kind, error = %e, "Error occurred while getting artwork data");
                return CycleOutcome::Skipped {
                    source: Some(kind),
                    stage: CycleStage::Fetch,
                    reason: e.to_string(),
                };
            }
        };

        let outcome = match self.acquirer.acquire(&record.image_url).await {
            Err(e) => {
                error!(
                    source = %kind,
                    url = %record.image_url,
                    error = %e,
                    "Error occurred while downloading image"
                );
                CycleOutcome::Skipped {
                    source: Some(kind),
                    stage: CycleStage::Acquire,
                    reason: e.to_string(),
                }
            }
            Ok(stored) => {
                let post = source.compose(&record);
                info!(source = %kind, truncated = post.truncated, "Composed post: {}", post.text);

                match self.publisher.publish(&post.text, &stored.path).await {
                    Ok(published) => {
                        info!(
                            source = %kind,
                            post_id = %published.id,
                            "Post successfully published"
                        );
                        CycleOutcome::Published {
                            source: kind,
                            post: published,
                        }
                    }
                    Err(e) => {
                        error!(source = %kind, error = %e, "Error occurred while publishing post");
                        CycleOutcome::Skipped {
                            source: Some(kind),
                            stage: CycleStage::Publish,
                            reason: e.to_string(),
                        }
                    }
                }
            }
        };

        self.cleanup().await;
        outcome
    }

    /// Best-effort removal of the scratch image
    pub async fn cleanup(&self) {
        let path = self.acquirer.path();
        match remove_scratch_image(path).await {
            Ok(true) => info!(path = %path.display(), "Image successfully deleted"),
            Ok(false) => debug!(path = %path.display(), "No scratch image to delete"),
            Err(e) => warn!(path = %path.display(), error = %e, "Error deleting image file"),
        }
    }
}
