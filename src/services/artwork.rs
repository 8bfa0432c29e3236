//! Artwork records and the scratch image they are posted with
//!
//! [ImageAcquirer] downloads the image for a record into a single scratch file
//! and keeps it under the upload ceiling by downscaling.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{ArtbotError, Result};

/// Artist value used when a source has no maker for an object
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Normalized artwork data produced by a museum fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkRecord {
    pub image_url: String,
    /// Public page for the object
    pub web_url: String,
    /// Classification, or the long title for sources without one
    pub classification: String,
    pub title: String,
    pub artist: String,
    /// Free-form date; some sources put an object identifier here
    pub date: String,
}

impl ArtworkRecord {
    /// Normalize an optional artist name, falling back to [UNKNOWN_ARTIST]
    pub fn artist_or_unknown(artist: Option<String>) -> String {
        artist
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string())
    }
}

/// Dimensions before and after a downscale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downscale {
    pub from: (u32, u32),
    pub to: (u32, u32),
}

/// Image staged on disk and ready for upload
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub path: PathBuf,
    pub size: u64,
    pub downscaled: Option<Downscale>,
}

/// Downloads artwork images into the scratch file
pub struct ImageAcquirer {
    http_client: Client,
    path: PathBuf,
    max_upload_bytes: u64,
    jpeg_quality: u8,
}

impl ImageAcquirer {
    pub fn new(
        path: PathBuf,
        max_upload_bytes: u64,
        jpeg_quality: u8,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http_client: Client::builder().timeout(timeout).build()?,
            path,
            max_upload_bytes,
            jpeg_quality,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download `image_url` into the scratch file, downscaling when it is above the ceiling
    pub async fn acquire(&self, image_url: &str) -> Result<StoredImage> {
        info!(url = %image_url, path = %self.path.display(), "Downloading artwork image");

        let response = self.http_client.get(image_url).send().await?;
        if !response.status().is_success() {
            return Err(ArtbotError::from_response("image host", response).await);
        }
        let bytes = response.bytes().await?;

        tokio::fs::write(&self.path, &bytes).await?;
        let size = bytes.len() as u64;
        debug!(size, "Image written to scratch file");

        if size <= self.max_upload_bytes {
            return Ok(StoredImage {
                path: self.path.clone(),
                size,
                downscaled: None,
            });
        }

        let limit = self.max_upload_bytes;
        let quality = self.jpeg_quality;
        let (encoded, downscale) = tokio::task::spawn_blocking(move || {
            downscale_image(&bytes, size, limit, quality)
        })
        .await
        .map_err(|e| ArtbotError::Io(std::io::Error::other(e.to_string())))??;

        tokio::fs::write(&self.path, &encoded).await?;
        let new_size = encoded.len() as u64;

        info!(
            original_size = size,
            new_size,
            from = ?downscale.from,
            to = ?downscale.to,
            "Downscaled artwork image"
        );

        if new_size > self.max_upload_bytes {
            warn!(
                size = new_size,
                limit = self.max_upload_bytes,
                "Image still too large after downscaling"
            );
            return Err(ArtbotError::ImageTooLarge {
                size: new_size,
                limit: self.max_upload_bytes,
            });
        }

        Ok(StoredImage {
            path: self.path.clone(),
            size: new_size,
            downscaled: Some(downscale),
        })
    }
}

/// Target dimensions for an image of `size` bytes, or `None` when it is within `limit`
///
/// Both sides are scaled by `sqrt(limit / size)` so the pixel count, and roughly
/// the encoded size, shrinks by `limit / size`.
pub fn downscale_dimensions(width: u32, height: u32, size: u64, limit: u64) -> Option<(u32, u32)> {
    if size <= limit {
        return None;
    }
    let scale = (limit as f64 / size as f64).sqrt();
    let scaled = |side: u32| ((side as f64 * scale) as u32).max(1);
    Some((scaled(width), scaled(height)))
}

fn downscale_image(
    bytes: &[u8],
    size: u64,
    limit: u64,
    quality: u8,
) -> Result<(Vec<u8>, Downscale)> {
    let img = image::load_from_memory(bytes)?;
    let from = (img.width(), img.height());
    let to = downscale_dimensions(from.0, from.1, size, limit).unwrap_or(from);

    let resized = img.resize_exact(to.0, to.1, FilterType::Lanczos3);

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    DynamicImage::ImageRgb8(resized.to_rgb8()).write_with_encoder(encoder)?;

    Ok((buf.into_inner(), Downscale { from, to }))
}

/// Remove the scratch image. Returns whether a file was deleted.
pub async fn remove_scratch_image(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gradient_bmp(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Bmp).unwrap();
        buf.into_inner()
    }

    fn new_acquirer(path: PathBuf, max_upload_bytes: u64) -> ImageAcquirer {
        ImageAcquirer::new(path, max_upload_bytes, 85, Duration::from_secs(30)).unwrap()
    }

    async fn serve(body: Vec<u8>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/image"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_no_downscale_within_limit() {
        assert_eq!(downscale_dimensions(4000, 3000, 1024, 1024), None);
        assert_eq!(downscale_dimensions(4000, 3000, 10, 1024), None);
    }

    #[test]
    fn test_downscale_factor() {
        // 4x the limit halves each side
        assert_eq!(downscale_dimensions(4000, 3000, 4096, 1024), Some((2000, 1500)));
        // 16x the limit quarters each side
        assert_eq!(downscale_dimensions(1000, 500, 16_000, 1_000), Some((250, 125)));
    }

    #[test]
    fn test_downscale_never_below_one_pixel() {
        assert_eq!(downscale_dimensions(10, 2, u64::MAX, 1), Some((1, 1)));
    }

    #[test]
    fn test_artist_or_unknown() {
        assert_eq!(ArtworkRecord::artist_or_unknown(None), UNKNOWN_ARTIST);
        assert_eq!(ArtworkRecord::artist_or_unknown(Some("  ".into())), UNKNOWN_ARTIST);
        assert_eq!(
            ArtworkRecord::artist_or_unknown(Some("Rembrandt van Rijn".into())),
            "Rembrandt van Rijn"
        );
    }

    #[tokio::test]
    async fn test_small_image_stored_untouched() {
        // Not a decodable image: anything under the limit must be written as-is
        let body = b"not really an image".to_vec();
        let server = serve(body.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let acquirer = new_acquirer(dir.path().join("artwork.jpg"), 1024);

        let stored = acquirer
            .acquire(&format!("{}/image", server.uri()))
            .await
            .unwrap();

        assert!(stored.downscaled.is_none());
        assert_eq!(stored.size, body.len() as u64);
        assert_eq!(std::fs::read(&stored.path).unwrap(), body);
    }

    #[tokio::test]
    async fn test_oversized_image_downscaled() {
        let body = gradient_bmp(600, 400);
        let original_size = body.len() as u64;
        let limit = original_size / 4;
        let server = serve(body).await;
        let dir = tempfile::tempdir().unwrap();
        let acquirer = new_acquirer(dir.path().join("artwork.jpg"), limit);

        let stored = acquirer
            .acquire(&format!("{}/image", server.uri()))
            .await
            .unwrap();

        let scale = (limit as f64 / original_size as f64).sqrt();
        assert!(scale < 1.0);
        let expected = ((600.0 * scale) as u32, (400.0 * scale) as u32);

        let downscale = stored.downscaled.expect("image should be downscaled");
        assert_eq!(downscale.from, (600, 400));
        assert_eq!(downscale.to, expected);
        assert!(stored.size <= limit);

        let written = std::fs::read(&stored.path).unwrap();
        assert_eq!(written.len() as u64, stored.size);
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::image_dimensions(&stored.path).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_still_too_large_after_downscale() {
        let server = serve(gradient_bmp(600, 400)).await;
        let dir = tempfile::tempdir().unwrap();
        // No JPEG fits in 100 bytes, headers alone are larger
        let acquirer = new_acquirer(dir.path().join("artwork.jpg"), 100);

        let err = acquirer
            .acquire(&format!("{}/image", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ArtbotError::ImageTooLarge { limit: 100, .. }));
    }

    #[tokio::test]
    async fn test_download_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let acquirer = new_acquirer(dir.path().join("artwork.jpg"), 1024);

        let err = acquirer
            .acquire(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ArtbotError::UnexpectedStatus { status: 404, .. }));
        assert!(!acquirer.path().exists());
    }

    #[tokio::test]
    async fn test_stalled_download_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/image"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let acquirer = ImageAcquirer::new(
            dir.path().join("artwork.jpg"),
            1024,
            85,
            Duration::from_millis(200),
        )
        .unwrap();

        let err = tokio::time::timeout(
            Duration::from_secs(10),
            acquirer.acquire(&format!("{}/image", server.uri())),
        )
        .await
        .expect("download should give up on its own")
        .unwrap_err();

        match err {
            ArtbotError::Http(e) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(!acquirer.path().exists());
    }

    #[tokio::test]
    async fn test_remove_scratch_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artwork.jpg");
        std::fs::write(&path, b"x").unwrap();

        assert!(remove_scratch_image(&path).await.unwrap());
        assert!(!path.exists());
        // Already gone is fine
        assert!(!remove_scratch_image(&path).await.unwrap());
    }
}
