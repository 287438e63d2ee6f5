use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::{HandlerError, ResultHandler};
use super::types::ResultRecord;
use crate::grabber::GrabberConfig;
use crate::storage::{ImageStore, LocalStore};
use crate::template;

/// Default handler: work out where the image belongs and write it there.
///
/// The save fields (`save_dir`, `save_path`, `save_path_full`, `is_saved`)
/// are attached on every tick so later handlers can see where the image
/// would go. Bytes are only written when the record carries an image and
/// saving is enabled.
#[derive(Clone)]
pub struct SaveImageHandler {
    store: Arc<dyn ImageStore>,
}

impl SaveImageHandler {
    pub const NAME: &'static str = "save";

    pub fn new() -> Self {
        Self::with_store(Arc::new(LocalStore))
    }

    pub fn with_store(store: Arc<dyn ImageStore>) -> Self {
        Self { store }
    }
}

impl Default for SaveImageHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultHandler for SaveImageHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(
        &self,
        result: &ResultRecord,
        config: &GrabberConfig,
    ) -> Result<Option<ResultRecord>, HandlerError> {
        let raw_path = config.raw_save_path();
        let full_path = PathBuf::from(template::render(
            &raw_path,
            &result.requested_at,
            Some(&result.url),
        )?);

        let mut record = result.clone();
        record.save_dir = Some(config.save_dir.clone());
        record.save_path = Some(raw_path);
        record.save_path_full = Some(full_path.clone());
        record.is_saved = false;

        let image = match &record.image {
            Some(image) if config.should_save() => Arc::clone(image),
            Some(_) => {
                debug!(url = %record.url, "Saving disabled, image not written");
                return Ok(Some(record));
            }
            None => {
                debug!(url = %record.url, "No image on record, nothing to save");
                return Ok(Some(record));
            }
        };

        if let Some(dir) = parent_dir(&full_path) {
            self.store
                .create_dir_all(dir)
                .await
                .map_err(|e| HandlerError::storage(dir, &e))?;
        }

        self.store
            .write(&full_path, image.bytes())
            .await
            .map_err(|e| HandlerError::storage(&full_path, &e))?;

        info!(path = %full_path.display(), size = image.bytes().len(), "Image saved");

        record.is_saved = true;
        Ok(Some(record))
    }
}

/// Parent directory of a file path, `None` for bare file names.
fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}
