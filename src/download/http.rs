//! HTTP snapshot downloader

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::error::Error as StdError;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use super::{DownloadError, GrabbedImage, ImageDownloader, Result};
use crate::grabber::GrabberConfig;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("camgrab/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
        }
    }
}

/// Default downloader: one GET per tick, whole body buffered, then decoded.
///
/// The per-request timeout covers connecting and reading the full body. The
/// reqwest client is built on first use, so a client that cannot be built
/// surfaces as a `DownloadError` on the tick instead of at construction.
#[derive(Debug)]
pub struct HttpDownloader {
    config: HttpConfig,
    client: Mutex<Option<Client>>,
}

impl HttpDownloader {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    /// Wrap an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: Client) -> Self {
        Self {
            config: HttpConfig::default(),
            client: Mutex::new(Some(client)),
        }
    }

    /// The shared client, building it on first call.
    fn client(&self) -> Result<Client> {
        let mut slot = self
            .client
            .lock()
            .map_err(|_| DownloadError::Other("http client lock poisoned".to_string()))?;

        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .user_agent(&self.config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(self.config.max_redirects))
            .build()
            .map_err(|e| {
                let detail = error_chain(&e);
                warn!(error = %detail, "Failed to build HTTP client");
                DownloadError::Other(detail)
            })?;

        *slot = Some(client.clone());
        Ok(client)
    }

    /// Fetch the raw response body without decoding it.
    pub async fn fetch_bytes(&self, url: &str, timeout: Duration) -> Result<Bytes> {
        debug!(url, timeout_secs = timeout.as_secs_f64(), "Requesting image");

        let response = self
            .client()?
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        debug!(url, size = bytes.len(), "Image body received");

        Ok(bytes)
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

#[async_trait]
impl ImageDownloader for HttpDownloader {
    async fn download(&self, url: &str, config: &GrabberConfig) -> Result<GrabbedImage> {
        let bytes = self.fetch_bytes(url, config.timeout_duration()).await?;
        Ok(GrabbedImage::decode(bytes)?)
    }
}

/// Sort a reqwest failure into the kinds the ignore policy understands.
pub(crate) fn classify_transport_error(err: &reqwest::Error) -> DownloadError {
    let detail = error_chain(err);

    if err.is_timeout() {
        DownloadError::Timeout(detail)
    } else if err.is_builder() {
        DownloadError::InvalidUrl(detail)
    } else if let Some(status) = err.status() {
        DownloadError::HttpStatus {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    } else if err.is_connect() || has_io_source(err) {
        DownloadError::Network(detail)
    } else {
        DownloadError::Other(detail)
    }
}

fn has_io_source(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if inner.downcast_ref::<std::io::Error>().is_some() {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Render an error with its full source chain; reqwest's top-level message
/// alone hides the interesting part ("connection refused", "dns error").
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
