use async_trait::async_trait;
use std::fmt;

use super::traits::{HandlerError, ResultHandler};
use super::types::ResultRecord;
use crate::grabber::GrabberConfig;

type Callback =
    dyn Fn(&ResultRecord, &GrabberConfig) -> Result<Option<ResultRecord>, HandlerError> + Send + Sync;

/// Adapts a plain closure into a [`ResultHandler`].
///
/// Handy for forwarding each grab somewhere else (a channel, a webhook
/// queue) or tagging the record without writing a handler type.
///
/// ```
/// use camgrab::handlers::CallbackHandler;
///
/// let tag = CallbackHandler::new("tag", |result, _config| {
///     let mut result = result.clone();
///     result.insert_metadata("camera", "front-door");
///     Ok(Some(result))
/// });
/// ```
pub struct CallbackHandler {
    name: String,
    callback: Box<Callback>,
}

impl CallbackHandler {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&ResultRecord, &GrabberConfig) -> Result<Option<ResultRecord>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ResultHandler for CallbackHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        result: &ResultRecord,
        config: &GrabberConfig,
    ) -> Result<Option<ResultRecord>, HandlerError> {
        (self.callback)(result, config)
    }
}
