use serde::{Deserialize, Serialize};

use crate::grabber::{
    DEFAULT_EVERY_SECS, DEFAULT_SAVE_DIR, DEFAULT_SAVE_FILENAME, DEFAULT_TIMEOUT_SECS,
    IgnorePolicy,
};
use crate::handlers::SaveImageHandler;

/// Settings for one camera, as read from `camgrab.toml` and the environment.
///
/// Handlers are referred to by registry name; see
/// [`GrabberSettings::into_grabber_config`](super::GrabberSettings::into_grabber_config).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GrabberSettings {
    /// Camera snapshot URL
    #[serde(default)]
    pub url: String,

    /// Seconds between ticks
    #[serde(default = "default_every")]
    pub every: f64,

    /// Directory images are saved under; empty disables saving
    #[serde(default = "default_save_dir", alias = "save_to")]
    pub save_dir: String,

    /// Path template below `save_dir`
    #[serde(default = "default_save_filename")]
    pub save_filename: String,

    #[serde(default = "default_save")]
    pub save: bool,

    /// Network timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Explicit handler names; replaces `default ++ extra` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_handlers: Option<Vec<String>>,

    #[serde(default = "default_handler_names")]
    pub default_result_handlers: Vec<String>,

    #[serde(default)]
    pub extra_result_handlers: Vec<String>,

    #[serde(default)]
    pub ignore: IgnorePolicy,
}

impl Default for GrabberSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            every: default_every(),
            save_dir: default_save_dir(),
            save_filename: default_save_filename(),
            save: default_save(),
            timeout: default_timeout(),
            result_handlers: None,
            default_result_handlers: default_handler_names(),
            extra_result_handlers: Vec::new(),
            ignore: IgnorePolicy::default(),
        }
    }
}

impl GrabberSettings {
    /// Names of the handlers that will run, in order.
    pub fn handler_names(&self) -> Vec<&str> {
        match &self.result_handlers {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => self
                .default_result_handlers
                .iter()
                .chain(&self.extra_result_handlers)
                .map(String::as_str)
                .collect(),
        }
    }

    /// Render the effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn default_every() -> f64 {
    DEFAULT_EVERY_SECS
}

fn default_save_dir() -> String {
    DEFAULT_SAVE_DIR.to_string()
}

fn default_save_filename() -> String {
    DEFAULT_SAVE_FILENAME.to_string()
}

fn default_save() -> bool {
    true
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_handler_names() -> Vec<String> {
    vec![SaveImageHandler::NAME.to_string()]
}
