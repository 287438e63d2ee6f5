use bon::Builder;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::ignore::IgnorePolicy;
use crate::download::{HttpDownloader, ImageDownloader};
use crate::handlers::{ResultHandler, SaveImageHandler};

pub const DEFAULT_EVERY_SECS: f64 = 2.0;
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_SAVE_DIR: &str = "grabbed_images";
pub const DEFAULT_SAVE_FILENAME: &str = "{Y}-{m}{d}/{H}/{y}{m}{d}-{H}{M}{S}-{f}.jpg";

/// Runtime configuration of one [`Grabber`](super::Grabber).
///
/// Owned by the grabber and read by every component during a tick. The caller
/// may change fields between ticks through
/// [`Grabber::config_mut`](super::Grabber::config_mut), e.g. to switch saving
/// off at night.
///
/// ```
/// use camgrab::grabber::GrabberConfig;
///
/// let config = GrabberConfig::builder()
///     .url("http://cam.example/out.jpg")
///     .every(5.0)
///     .save_dir("out")
///     .build();
/// assert!(config.should_save());
/// ```
#[derive(Clone, Builder)]
pub struct GrabberConfig {
    /// Camera snapshot URL
    #[builder(into)]
    pub url: String,

    /// Seconds to sleep after each tick
    #[builder(default = DEFAULT_EVERY_SECS)]
    pub every: f64,

    /// Directory images are saved under; empty disables saving
    #[builder(into, default = DEFAULT_SAVE_DIR.to_string())]
    pub save_dir: String,

    /// Path template relative to `save_dir`, see [`crate::template`]
    #[builder(into, default = DEFAULT_SAVE_FILENAME.to_string())]
    pub save_filename: String,

    /// Master switch for saving, independent of the paths
    #[builder(default = true)]
    pub save: bool,

    /// Network timeout in seconds, covering connect and body read
    #[builder(default = DEFAULT_TIMEOUT_SECS)]
    pub timeout: f64,

    #[builder(default)]
    pub ignore: IgnorePolicy,

    #[builder(default = default_downloader())]
    pub downloader: Arc<dyn ImageDownloader>,

    /// Explicit handler list; replaces `default ++ extra` when set
    pub result_handlers: Option<Vec<Arc<dyn ResultHandler>>>,

    #[builder(default = default_result_handlers())]
    pub default_result_handlers: Vec<Arc<dyn ResultHandler>>,

    #[builder(default)]
    pub extra_result_handlers: Vec<Arc<dyn ResultHandler>>,
}

fn default_downloader() -> Arc<dyn ImageDownloader> {
    Arc::new(HttpDownloader::default())
}

/// The handlers run when nothing else is configured: save to disk.
pub fn default_result_handlers() -> Vec<Arc<dyn ResultHandler>> {
    vec![Arc::new(SaveImageHandler::new())]
}

impl GrabberConfig {
    /// Defaults for everything but the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self::builder().url(url).build()
    }

    /// Sleep between ticks. Negative or non-finite values sleep for zero.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.every).unwrap_or(Duration::ZERO)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Saving needs the switch on and both path parts present.
    pub fn should_save(&self) -> bool {
        self.save && !self.save_filename.is_empty() && !self.save_dir.is_empty()
    }

    /// `save_dir/save_filename` before token substitution.
    pub fn raw_save_path(&self) -> String {
        if self.save_dir.is_empty() {
            self.save_filename.clone()
        } else if self.save_filename.is_empty() {
            self.save_dir.clone()
        } else {
            format!(
                "{}/{}",
                self.save_dir.trim_end_matches('/'),
                self.save_filename
            )
        }
    }

    /// Handlers in the order they run for a tick.
    pub fn handler_chain(&self) -> Vec<Arc<dyn ResultHandler>> {
        match &self.result_handlers {
            Some(handlers) => handlers.clone(),
            None => self
                .default_result_handlers
                .iter()
                .chain(self.extra_result_handlers.iter())
                .cloned()
                .collect(),
        }
    }
}

impl fmt::Debug for GrabberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |handlers: &[Arc<dyn ResultHandler>]| -> Vec<String> {
            handlers.iter().map(|h| h.name().to_string()).collect()
        };

        f.debug_struct("GrabberConfig")
            .field("url", &self.url)
            .field("every", &self.every)
            .field("save_dir", &self.save_dir)
            .field("save_filename", &self.save_filename)
            .field("save", &self.save)
            .field("timeout", &self.timeout)
            .field("ignore", &self.ignore)
            .field("result_handlers", &self.result_handlers.as_deref().map(names))
            .field("default_result_handlers", &names(&self.default_result_handlers))
            .field("extra_result_handlers", &names(&self.extra_result_handlers))
            .finish()
    }
}
