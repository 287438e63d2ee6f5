//! Settings management for camgrab
//!
//! This module provides a layered settings system that loads values from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use camgrab::config::GrabberSettings;
//! use camgrab::handlers::HandlerRegistry;
//!
//! let settings = GrabberSettings::load().expect("Failed to load configuration");
//! let config = settings
//!     .into_grabber_config(&HandlerRegistry::with_defaults())
//!     .expect("Unknown result handler");
//! println!("Grabbing {} every {}s", config.url, config.every);
//! ```
//!
//! # Environment Variables
//!
//! Settings can be overridden using environment variables with the pattern
//! `CAMGRAB__<key>`, nested tables joined with `__`.
//!
//! Examples:
//! - `CAMGRAB__URL=http://192.168.1.20/snapshot.jpg`
//! - `CAMGRAB__EVERY=10`
//! - `CAMGRAB__IGNORE__NETWORK=false`
//!
//! # Configuration File
//!
//! By default, settings are loaded from `config/camgrab.toml`.
//! This can be overridden using the `CAMGRAB_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::GrabberSettings;
pub use sources::config_path;
pub use validation::ValidationError;

use thiserror::Error;

use crate::grabber::GrabberConfig;
use crate::handlers::{HandlerRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Result handler lookup failed: {0}")]
    Registry(#[from] RegistryError),
}

impl GrabberSettings {
    /// Load settings from all sources (file + environment)
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`CAMGRAB__*`)
    /// 2. TOML file (default: `config/camgrab.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The settings file is malformed
    /// - Validation fails (missing URL, negative interval, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = sources::load()?;
        validation::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let settings = sources::load_from_sources(path)?;
        validation::validate(&settings)?;
        Ok(settings)
    }

    /// Load without validating, so callers can apply overrides first.
    ///
    /// `path` replaces the `CAMGRAB_CONFIG` / default lookup when given.
    pub fn load_unvalidated(path: Option<std::path::PathBuf>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => sources::load_from_sources(path)?,
            None => sources::load()?,
        };
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Build the runtime configuration, looking handler names up in `registry`.
    pub fn into_grabber_config(
        self,
        registry: &HandlerRegistry,
    ) -> Result<GrabberConfig, ConfigError> {
        let result_handlers = self
            .result_handlers
            .as_deref()
            .map(|names| registry.resolve(names))
            .transpose()?;
        let default_result_handlers = registry.resolve(&self.default_result_handlers)?;
        let extra_result_handlers = registry.resolve(&self.extra_result_handlers)?;

        Ok(GrabberConfig::builder()
            .url(self.url)
            .every(self.every)
            .save_dir(self.save_dir)
            .save_filename(self.save_filename)
            .save(self.save)
            .timeout(self.timeout)
            .ignore(self.ignore)
            .maybe_result_handlers(result_handlers)
            .default_result_handlers(default_result_handlers)
            .extra_result_handlers(extra_result_handlers)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::CallbackHandler;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("camgrab.toml");

        fs::write(&config_path, "url = \"http://cam.example/out.jpg\"\n").unwrap();

        let settings = GrabberSettings::load_from_path(config_path).unwrap();
        assert_eq!(settings.url, "http://cam.example/out.jpg");
        assert_eq!(settings.default_result_handlers, vec!["save"]);
    }

    #[test]
    fn test_validation_catches_bad_interval() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("camgrab.toml");

        let toml_content = r#"
url = "http://cam.example/out.jpg"
every = -2
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = GrabberSettings::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Validation(ValidationError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("camgrab.toml");

        fs::write(&config_path, "url = [unterminated").unwrap();

        let result = GrabberSettings::load_from_path(config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::Load(_)));
    }

    #[test]
    fn test_into_grabber_config() {
        let settings = GrabberSettings {
            url: "http://cam.example/out.jpg".to_string(),
            every: 5.0,
            save_dir: "out".to_string(),
            extra_result_handlers: vec!["log".to_string()],
            ..GrabberSettings::default()
        };

        let config = settings
            .into_grabber_config(&HandlerRegistry::with_defaults())
            .unwrap();

        assert_eq!(config.url, "http://cam.example/out.jpg");
        assert_eq!(config.every, 5.0);
        assert_eq!(config.save_dir, "out");
        let names: Vec<_> = config.handler_chain().iter().map(|h| h.name().to_string()).collect();
        assert_eq!(names, vec!["save", "log"]);
    }

    #[test]
    fn test_explicit_handler_list() {
        let mut registry = HandlerRegistry::with_defaults();
        registry.register("notify", Arc::new(CallbackHandler::new("notify", |_, _| Ok(None))));

        let settings = GrabberSettings {
            url: "http://cam.example/out.jpg".to_string(),
            result_handlers: Some(vec!["notify".to_string(), "save".to_string()]),
            ..GrabberSettings::default()
        };

        let config = settings.into_grabber_config(&registry).unwrap();
        let names: Vec<_> = config.handler_chain().iter().map(|h| h.name().to_string()).collect();
        assert_eq!(names, vec!["notify", "save"]);
    }

    #[test]
    fn test_unknown_handler_name() {
        let settings = GrabberSettings {
            url: "http://cam.example/out.jpg".to_string(),
            extra_result_handlers: vec!["motion".to_string()],
            ..GrabberSettings::default()
        };

        let err = settings
            .into_grabber_config(&HandlerRegistry::with_defaults())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registry(RegistryError::NotFound(name)) if name == "motion"
        ));
    }
}
