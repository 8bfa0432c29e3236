//! X/Twitter publisher
//!
//! Media goes through the v1.1 upload endpoint, the post itself through the v2
//! tweets endpoint. Both calls are OAuth 1.0a signed.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::oauth::OAuthSigner;
use crate::config::Config;
use crate::error::{ArtbotError, Result};

/// A post that went live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub media_id: String,
}

/// Something that can publish post text with an attached image
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `text` with the image at `image`. One attempt, no retries.
    async fn publish(&self, text: &str, image: &Path) -> Result<PublishedPost>;
}

/// Check the staged image against the upload ceiling before anything is sent
pub async fn check_upload_size(image: &Path, max_upload_bytes: u64) -> Result<u64> {
    let metadata = match tokio::fs::metadata(image).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(ArtbotError::MissingImage(image.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtbotError::MissingImage(image.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let size = metadata.len();
    if size > max_upload_bytes {
        error!(
            size,
            limit = max_upload_bytes,
            path = %image.display(),
            "Image exceeds upload limit, not publishing"
        );
        return Err(ArtbotError::ImageTooLarge {
            size,
            limit: max_upload_bytes,
        });
    }
    Ok(size)
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    media: TweetMedia<'a>,
}

#[derive(Debug, Serialize)]
struct TweetMedia<'a> {
    media_ids: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

/// Publishes to X/Twitter
pub struct TwitterPublisher {
    client: Client,
    signer: OAuthSigner,
    api_url: String,
    upload_url: String,
    max_upload_bytes: u64,
}

impl TwitterPublisher {
    pub fn new(
        signer: OAuthSigner,
        api_url: impl Into<String>,
        upload_url: impl Into<String>,
        max_upload_bytes: u64,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            signer,
            api_url: api_url.into(),
            upload_url: upload_url.into(),
            max_upload_bytes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            OAuthSigner::new(config.twitter.clone()),
            config.twitter_api_url.clone(),
            config.twitter_upload_url.clone(),
            config.max_upload_bytes,
            config.http_timeout,
        )
    }

    /// Upload the image and return its media id
    pub async fn upload_media(&self, image: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image).await?;
        let mime = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or("image/jpeg");
        let file_name = image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artwork.jpg".to_string());

        debug!(size = bytes.len(), mime = %mime, "Uploading media");

        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
        let form = Form::new().part("media", part);

        let url = format!("{}/1.1/media/upload.json", self.upload_url);
        let authorization = self.signer.authorization_header("POST", &url, &[])?;

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ArtbotError::from_response("media upload", response).await);
        }

        let uploaded: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| ArtbotError::malformed("media upload", e.to_string()))?;
        Ok(uploaded.media_id_string)
    }

    /// Create a post referencing already uploaded media
    pub async fn create_tweet(&self, text: &str, media_id: &str) -> Result<String> {
        let url = format!("{}/2/tweets", self.api_url);
        let authorization = self.signer.authorization_header("POST", &url, &[])?;
        let request = CreateTweetRequest {
            text,
            media: TweetMedia {
                media_ids: [media_id],
            },
        };

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ArtbotError::from_response("create tweet", response).await);
        }

        let created: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| ArtbotError::malformed("create tweet", e.to_string()))?;
        Ok(created.data.id)
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    async fn publish(&self, text: &str, image: &Path) -> Result<PublishedPost> {
        check_upload_size(image, self.max_upload_bytes).await?;

        let media_id = self.upload_media(image).await?;
        let id = self.create_tweet(text, &media_id).await?;

        info!(post_id = %id, media_id = %media_id, "Post published");
        Ok(PublishedPost { id, media_id })
    }
}
