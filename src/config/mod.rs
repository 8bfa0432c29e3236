//! Application configuration management

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::services::sources::SourceKind;

pub const DEFAULT_MET_API_URL: &str = "https://collectionapi.metmuseum.org";
pub const DEFAULT_RIJKSMUSEUM_API_URL: &str = "https://www.rijksmuseum.nl";
pub const DEFAULT_TWITTER_API_URL: &str = "https://api.twitter.com";
pub const DEFAULT_TWITTER_UPLOAD_URL: &str = "https://upload.twitter.com";

/// OAuth 1.0a user-context credentials for the posting account
#[derive(Clone)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"...")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"...")
            .finish()
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Credentials for the social platform
    pub twitter: TwitterCredentials,

    /// Rijksmuseum API key; the source is unavailable without it
    pub rijksmuseum_api_key: Option<String>,

    /// Sources a cycle may pick from
    pub sources: Vec<SourceKind>,

    /// Wait after a successful post
    pub post_interval: Duration,

    /// Wait after a failed fetch or image download
    pub fetch_retry_delay: Duration,

    /// Wait after a failed publish
    pub publish_retry_delay: Duration,

    /// Per-request timeout for the image download and the platform calls
    pub http_timeout: Duration,

    /// Upload ceiling shared by the image acquirer and the publisher
    pub max_upload_bytes: u64,

    /// JPEG quality used when a downscaled image is re-encoded
    pub jpeg_quality: u8,

    /// Maximum detail requests while searching the Met for an object with an image
    pub met_max_attempts: u32,

    /// Highest page requested from the Rijksmuseum collection (one result per page)
    pub rijksmuseum_max_page: u32,

    /// Scratch file the downloaded image is staged in
    pub image_path: PathBuf,

    /// Append-only log file
    pub log_file: PathBuf,

    /// Console logs as JSON lines instead of human-readable text
    pub log_json: bool,

    pub met_api_url: String,
    pub rijksmuseum_api_url: String,
    pub twitter_api_url: String,
    pub twitter_upload_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (the process environment in production)
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} is required"))
        };

        let twitter = TwitterCredentials {
            consumer_key: required("CONSUMER_KEY")?,
            consumer_secret: required("CONSUMER_SECRET")?,
            access_token: required("ACCESS_TOKEN")?,
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,
        };

        let rijksmuseum_api_key = var("RIJKSMUSEUM_API_KEY").filter(|v| !v.trim().is_empty());

        let sources = match var("ARTWORK_SOURCES") {
            Some(list) => {
                let sources = parse_sources(&list)?;
                if sources.contains(&SourceKind::Rijksmuseum) && rijksmuseum_api_key.is_none() {
                    bail!("ARTWORK_SOURCES includes rijksmuseum but RIJKSMUSEUM_API_KEY is unset");
                }
                sources
            }
            None if rijksmuseum_api_key.is_some() => {
                vec![SourceKind::Met, SourceKind::Rijksmuseum]
            }
            None => vec![SourceKind::Met],
        };

        if sources.is_empty() {
            bail!("ARTWORK_SOURCES must name at least one source");
        }

        let jpeg_quality: u8 = parse_or(&var, "JPEG_QUALITY", 85)?;
        if !(1..=100).contains(&jpeg_quality) {
            bail!("JPEG_QUALITY must be between 1 and 100");
        }

        Ok(Self {
            twitter,
            rijksmuseum_api_key,
            sources,

            post_interval: Duration::from_secs(parse_or(&var, "POST_INTERVAL_SECS", 36_000)?),
            fetch_retry_delay: Duration::from_secs(parse_or(&var, "FETCH_RETRY_DELAY_SECS", 50)?),
            publish_retry_delay: Duration::from_secs(parse_or(
                &var,
                "PUBLISH_RETRY_DELAY_SECS",
                60,
            )?),
            http_timeout: Duration::from_secs(
                parse_or::<_, u64>(&var, "HTTP_TIMEOUT_SECS", 30)?.max(1),
            ),

            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            jpeg_quality,

            met_max_attempts: parse_or::<_, u32>(&var, "MET_MAX_ATTEMPTS", 20)?.max(1),
            rijksmuseum_max_page: parse_or::<_, u32>(&var, "RIJKSMUSEUM_MAX_PAGE", 10_000)?.max(1),

            image_path: var("IMAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("artwork.jpg")),
            log_file: var("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("artwork.log")),
            log_json: var("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),

            met_api_url: base_url(&var, "MET_API_URL", DEFAULT_MET_API_URL),
            rijksmuseum_api_url: base_url(&var, "RIJKSMUSEUM_API_URL", DEFAULT_RIJKSMUSEUM_API_URL),
            twitter_api_url: base_url(&var, "TWITTER_API_URL", DEFAULT_TWITTER_API_URL),
            twitter_upload_url: base_url(&var, "TWITTER_UPLOAD_URL", DEFAULT_TWITTER_UPLOAD_URL),
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn base_url<F>(var: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn parse_sources(list: &str) -> Result<Vec<SourceKind>> {
    let mut sources = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = SourceKind::from_name(name)
            .with_context(|| format!("Unknown artwork source {name:?}"))?;
        if !sources.contains(&kind) {
            sources.push(kind);
        }
    }
    Ok(sources)
}
