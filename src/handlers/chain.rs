use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::traits::{HandlerError, ResultHandler};
use super::types::ResultRecord;
use crate::grabber::GrabberConfig;

/// A handler failed; the chain stopped there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("result handler '{handler}' failed: {source}")]
pub struct ChainError {
    pub handler: String,
    #[source]
    pub source: HandlerError,
}

/// Run `handlers` in order, threading the record through each.
///
/// A handler returning `None` leaves the working record as it was.
pub async fn run_chain(
    handlers: &[Arc<dyn ResultHandler>],
    mut record: ResultRecord,
    config: &GrabberConfig,
) -> Result<ResultRecord, ChainError> {
    for handler in handlers {
        debug!(handler = handler.name(), "Running result handler");

        match handler.process(&record, config).await {
            Ok(Some(next)) => record = next,
            Ok(None) => {}
            Err(source) => {
                return Err(ChainError {
                    handler: handler.name().to_string(),
                    source,
                });
            }
        }
    }

    Ok(record)
}
