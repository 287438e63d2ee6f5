use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::download::{DownloadError, GrabbedImage};

/// What a tick asks the downloader for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabRequest {
    pub url: String,
    pub requested_at: DateTime<FixedOffset>,
}

/// Per-tick record threaded through the handler chain.
///
/// `image` is set iff the download succeeded (or a handler substituted one);
/// `error` is set iff an ignorable download failure happened. The save fields
/// are filled in by [`SaveImageHandler`](super::SaveImageHandler); anything
/// else a handler wants to pass along goes into `metadata`.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub url: String,
    pub requested_at: DateTime<FixedOffset>,
    pub image: Option<Arc<GrabbedImage>>,
    pub error: Option<DownloadError>,

    pub save_dir: Option<String>,
    pub save_path: Option<String>,
    pub save_path_full: Option<PathBuf>,
    pub is_saved: bool,

    pub metadata: BTreeMap<String, Value>,
}

impl ResultRecord {
    pub fn new(request: &GrabRequest) -> Self {
        Self {
            url: request.url.clone(),
            requested_at: request.requested_at,
            image: None,
            error: None,
            save_dir: None,
            save_path: None,
            save_path_full: None,
            is_saved: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn succeeded(request: &GrabRequest, image: GrabbedImage) -> Self {
        Self {
            image: Some(Arc::new(image)),
            ..Self::new(request)
        }
    }

    pub fn failed(request: &GrabRequest, error: DownloadError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(request)
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Attach handler-defined data; an existing key is overwritten.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}
