//! Image download plugins
//!
//! A downloader turns a URL into a decoded [`GrabbedImage`]. The default
//! [`HttpDownloader`] does a single GET per call; anything else (local files,
//! authenticated fetches, RTSP snapshot tools) can be plugged in by
//! implementing [`ImageDownloader`].

mod decode;
mod http;

pub use decode::{DecodeError, GrabbedImage};
pub use http::{HttpConfig, HttpDownloader};

#[cfg(test)]
pub(crate) use decode::tests::sample_jpeg;

use async_trait::async_trait;
use thiserror::Error;

use crate::grabber::GrabberConfig;

/// Download failures, closed over the kinds the ignore policy can reason about.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {code}: {reason}")]
    HttpStatus { code: u16, reason: String },

    #[error("could not decode image: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("download failed: {0}")]
    Other(String),
}

impl DownloadError {
    /// Status code for `HttpStatus` failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DownloadError::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Short machine-friendly label, used in logs and result metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::Timeout(_) => "timeout",
            DownloadError::Network(_) => "network",
            DownloadError::HttpStatus { .. } => "http_status",
            DownloadError::Decode(_) => "decode",
            DownloadError::InvalidUrl(_) => "invalid_url",
            DownloadError::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

/// Fetches one image per call.
///
/// Implementations must not retry internally; the next tick is the retry.
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn download(&self, url: &str, config: &GrabberConfig) -> Result<GrabbedImage>;
}
