use async_trait::async_trait;
use tracing::{info, warn};

use super::traits::{HandlerError, ResultHandler};
use super::types::ResultRecord;
use crate::grabber::GrabberConfig;

/// Emits one structured log line per tick. Never modifies the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogResultHandler;

impl LogResultHandler {
    pub const NAME: &'static str = "log";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResultHandler for LogResultHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(
        &self,
        result: &ResultRecord,
        _config: &GrabberConfig,
    ) -> Result<Option<ResultRecord>, HandlerError> {
        let path = result
            .save_path_full
            .as_ref()
            .map(|p| p.display().to_string());

        match (&result.image, &result.error) {
            (Some(image), _) => {
                let (width, height) = image.dimensions();
                info!(
                    url = %result.url,
                    requested_at = %result.requested_at,
                    width,
                    height,
                    size = image.bytes().len(),
                    saved = result.is_saved,
                    path = path.as_deref().unwrap_or("-"),
                    "Grabbed image"
                );
            }
            (None, Some(error)) => {
                warn!(
                    url = %result.url,
                    requested_at = %result.requested_at,
                    kind = error.kind(),
                    error = %error,
                    "Grab failed, error ignored"
                );
            }
            (None, None) => {
                info!(url = %result.url, requested_at = %result.requested_at, "No image");
            }
        }

        Ok(None)
    }
}
