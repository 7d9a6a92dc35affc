use crate::domain::models::{AppError, TrackerSettings};
use std::path::Path;
use thiserror::Error;

pub const ENDPOINT_ENV: &str = "RIDERTRACK_ENDPOINT";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write settings: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl From<SettingsError> for AppError {
    fn from(error: SettingsError) -> Self {
        let (code, suggestion) = match error {
            SettingsError::Read(_) => ("SETTINGS_READ_FAIL", None),
            SettingsError::Write(_) => ("SETTINGS_WRITE_FAIL", None),
            SettingsError::Parse(_) => (
                "SETTINGS_PARSE_FAIL",
                Some("delete settings.json to restore defaults".to_string()),
            ),
            SettingsError::Invalid(_) => ("SETTINGS_INVALID", None),
        };
        AppError::new(code, error.to_string(), suggestion)
    }
}

pub fn load_or_default_settings(path: &Path) -> Result<TrackerSettings, SettingsError> {
    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(SettingsError::Read)?;
        serde_json::from_str::<TrackerSettings>(&content).map_err(SettingsError::Parse)?
    } else {
        let settings = TrackerSettings::default();
        write_settings(path, &settings)?;
        settings
    };
    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        if !endpoint.trim().is_empty() {
            settings.transport.endpoint = endpoint.trim().to_string();
        }
    }
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn write_settings(path: &Path, settings: &TrackerSettings) -> Result<(), SettingsError> {
    validate_settings(settings)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(SettingsError::Write)?;
    }
    let raw = serde_json::to_string_pretty(settings).map_err(SettingsError::Parse)?;
    std::fs::write(path, raw).map_err(SettingsError::Write)
}

pub fn validate_settings(settings: &TrackerSettings) -> Result<(), SettingsError> {
    let motion = &settings.motion;
    if motion.frame_interval_ms == 0 {
        return Err(SettingsError::Invalid(
            "frameIntervalMs must be positive".to_string(),
        ));
    }
    if motion.min_duration_ms > motion.max_duration_ms {
        return Err(SettingsError::Invalid(format!(
            "minDurationMs {} exceeds maxDurationMs {}",
            motion.min_duration_ms, motion.max_duration_ms
        )));
    }
    if !(motion.meters_per_ms.is_finite() && motion.meters_per_ms > 0.0) {
        return Err(SettingsError::Invalid(
            "metersPerMs must be a positive number".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&settings.follow.delay_ratio) {
        return Err(SettingsError::Invalid(
            "follow delayRatio must be within [0, 1]".to_string(),
        ));
    }
    if settings.view.zoom_step <= 0.0 {
        return Err(SettingsError::Invalid("zoomStep must be positive".to_string()));
    }
    if settings.transport.endpoint.trim().is_empty() {
        return Err(SettingsError::Invalid(
            "transport endpoint is empty".to_string(),
        ));
    }
    Ok(())
}
