use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use super::types::ResultRecord;
use crate::grabber::GrabberConfig;
use crate::template::TemplateError;

/// Handler errors
///
/// None of these are subject to the ignore policy; any of them aborts the
/// rest of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("save path template: {0}")]
    Template(#[from] TemplateError),

    #[error("storage error at {path}: {message}")]
    Storage { path: PathBuf, message: String },

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn storage(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        HandlerError::Storage {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// One step of the per-tick result chain.
///
/// Returning `Ok(Some(record))` replaces the working record for the next
/// handler; `Ok(None)` passes the current record on unchanged.
#[async_trait]
pub trait ResultHandler: Send + Sync {
    /// Name used in logs, errors and the handler registry.
    fn name(&self) -> &str;

    async fn process(
        &self,
        result: &ResultRecord,
        config: &GrabberConfig,
    ) -> Result<Option<ResultRecord>, HandlerError>;
}
