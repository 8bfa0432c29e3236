//! Museum sources a cycle can draw from
//!
//! The set is closed: each variant owns its API client and knows the post
//! template that goes with it.

use std::fmt;

use rand::seq::SliceRandom;

use super::artwork::ArtworkRecord;
use super::composer::{ComposedPost, PostTemplate};
use super::met::MetClient;
use super::rijksmuseum::RijksmuseumClient;
use crate::config::Config;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Met,
    Rijksmuseum,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Met => "met",
            SourceKind::Rijksmuseum => "rijksmuseum",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "met" | "metmuseum" | "metropolitan" => Some(SourceKind::Met),
            "rijks" | "rijksmuseum" => Some(SourceKind::Rijksmuseum),
            _ => None,
        }
    }

    pub fn template(&self) -> PostTemplate {
        match self {
            SourceKind::Met => PostTemplate {
                source_name: "Metropolitan Museum of Art",
                include_details: true,
            },
            SourceKind::Rijksmuseum => PostTemplate {
                source_name: "Rijksmuseum",
                include_details: false,
            },
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured museum source
pub enum Source {
    Met(MetClient),
    Rijksmuseum(RijksmuseumClient),
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Met(_) => SourceKind::Met,
            Source::Rijksmuseum(_) => SourceKind::Rijksmuseum,
        }
    }

    pub async fn fetch(&self) -> Result<ArtworkRecord> {
        match self {
            Source::Met(client) => client.fetch_random_artwork().await,
            Source::Rijksmuseum(client) => client.fetch_random_artwork().await,
        }
    }

    pub fn compose(&self, record: &ArtworkRecord) -> ComposedPost {
        self.kind().template().compose(record)
    }
}

/// The enabled sources, one picked uniformly at random per cycle
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    /// Build a client for every source named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut sources = Vec::with_capacity(config.sources.len());
        for kind in &config.sources {
            match kind {
                SourceKind::Met => sources.push(Source::Met(MetClient::new(
                    config.met_api_url.clone(),
                    config.met_max_attempts,
                )?)),
                SourceKind::Rijksmuseum => {
                    // Config validation guarantees a key for an enabled Rijksmuseum source
                    if let Some(key) = &config.rijksmuseum_api_key {
                        sources.push(Source::Rijksmuseum(RijksmuseumClient::new(
                            config.rijksmuseum_api_url.clone(),
                            key.clone(),
                            config.rijksmuseum_max_page,
                        )?));
                    }
                }
            }
        }
        Ok(Self::new(sources))
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn choose(&self) -> Option<&Source> {
        self.sources.choose(&mut rand::thread_rng())
    }
}
