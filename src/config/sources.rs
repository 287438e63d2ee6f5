use super::models::GrabberSettings;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "CAMGRAB_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/camgrab.toml";
const ENV_PREFIX: &str = "CAMGRAB";
const ENV_SEPARATOR: &str = "__";

/// Where the settings file is looked for: `$CAMGRAB_CONFIG` or the default.
pub fn config_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load settings with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<GrabberSettings, ConfigError> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    load_from_sources(config_path())
}

/// Load settings from a specific path plus the environment
pub fn load_from_sources(config_path: PathBuf) -> Result<GrabberSettings, ConfigError> {
    load_with_environment(config_path, environment())
}

/// `CAMGRAB__EVERY` -> `every`, `CAMGRAB__IGNORE__TIMEOUT` -> `ignore.timeout`
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

fn load_with_environment(
    config_path: PathBuf,
    environment: Environment,
) -> Result<GrabberSettings, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    let config = builder.add_source(environment).build()?;
    config.try_deserialize()
}
