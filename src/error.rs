//! Error types for a posting cycle
//!
//! Every failure inside a cycle is one of these variants. The cycle job logs
//! it and turns it into a skipped cycle; nothing here ends the process.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for cycle operations
pub type Result<T> = std::result::Result<T, ArtbotError>;

#[derive(Debug, Error)]
pub enum ArtbotError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status
    #[error("{service} returned status {status}: {body}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The response decoded but lacked the fields we need
    #[error("malformed response from {service}: {reason}")]
    MalformedResponse {
        service: &'static str,
        reason: String,
    },

    /// Sampled the Met collection without finding an object with an image
    #[error("no image-bearing object found after {attempts} attempts")]
    NoImageBearingObject { attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode failure
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The stored image is above the upload ceiling
    #[error("image is {size} bytes, above the {limit} byte upload limit")]
    ImageTooLarge { size: u64, limit: u64 },

    /// Publish was attempted without a stored image
    #[error("no image file at {}", .0.display())]
    MissingImage(PathBuf),

    /// OAuth request signing failed
    #[error("request signing failed: {0}")]
    Signing(String),
}

impl ArtbotError {
    pub(crate) fn malformed(service: &'static str, reason: impl Into<String>) -> Self {
        ArtbotError::MalformedResponse {
            service,
            reason: reason.into(),
        }
    }

    /// Build an [ArtbotError::UnexpectedStatus] from a failed response, consuming its body
    pub(crate) async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ArtbotError::UnexpectedStatus {
            service,
            status,
            body,
        }
    }
}
