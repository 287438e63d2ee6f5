use super::models::GrabberSettings;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No camera URL configured")]
    EmptyUrl,

    #[error("Invalid camera URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Interval must be a finite number of seconds >= 0, got {0}")]
    InvalidInterval(f64),

    #[error("Timeout must be a finite number of seconds > 0, got {0}")]
    InvalidTimeout(f64),

    #[error("Ignored status code {0} is outside 100..=599")]
    InvalidStatusCode(u16),
}

/// Validate the entire settings tree
pub fn validate(settings: &GrabberSettings) -> Result<(), ValidationError> {
    validate_url(&settings.url)?;
    validate_timing(settings)?;
    validate_ignore(settings)?;
    Ok(())
}

fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    reqwest::Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

fn validate_timing(settings: &GrabberSettings) -> Result<(), ValidationError> {
    if !settings.every.is_finite() || settings.every < 0.0 {
        return Err(ValidationError::InvalidInterval(settings.every));
    }

    if !settings.timeout.is_finite() || settings.timeout <= 0.0 {
        return Err(ValidationError::InvalidTimeout(settings.timeout));
    }

    Ok(())
}

fn validate_ignore(settings: &GrabberSettings) -> Result<(), ValidationError> {
    match settings
        .ignore
        .status_codes
        .iter()
        .find(|code| !(100..=599).contains(*code))
    {
        Some(code) => Err(ValidationError::InvalidStatusCode(*code)),
        None => Ok(()),
    }
}
