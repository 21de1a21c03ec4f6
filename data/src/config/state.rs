use super::Theme;
use crate::InternalError;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SETTINGS_FILE: &str = "settings.json";
pub const BACKEND_URL_ENV: &str = "TRENDSKETCH_BACKEND_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub theme: Theme,
    /// Fixed x/y aspect ratio for the detail chart.
    pub aspect_ratio: Option<f32>,
    pub toast_timeout_secs: u64,
    pub log_level: Option<LogLevel>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: service::connect::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: service::connect::DEFAULT_TIMEOUT.as_secs(),
            theme: Theme::default(),
            aspect_ratio: None,
            toast_timeout_secs: 8,
            log_level: None,
        }
    }
}

impl Settings {
    /// Reads `settings.json` from the data directory, falling back to defaults,
    /// then applies the environment override.
    pub fn load() -> Self {
        let path = crate::data_path(Some(SETTINGS_FILE));

        let mut settings = match Self::read(&path) {
            Ok(settings) => settings,
            Err(InternalError::Io(e)) => {
                log::info!("No settings at {} ({e}), using defaults", path.display());
                Settings::default()
            }
            Err(e) => {
                log::warn!("Ignoring settings at {}: {e}", path.display());
                Settings::default()
            }
        };

        settings.apply_env(std::env::var(BACKEND_URL_ENV).ok());
        settings
    }

    pub fn read(path: &Path) -> Result<Self, InternalError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| InternalError::Io(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| InternalError::Config(e.to_string()))
    }

    pub fn apply_env(&mut self, backend_url: Option<String>) {
        if let Some(url) = backend_url.filter(|url| !url.trim().is_empty()) {
            log::info!("Backend URL overridden by {BACKEND_URL_ENV}: {url}");
            self.backend_url = url;
        }
    }

    pub fn backend(&self) -> service::Backend {
        service::Backend::new(&self.backend_url)
            .with_timeout(std::time::Duration::from_secs(self.request_timeout_secs.max(1)))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.log_level {
            Some(level) => level.into(),
            None if cfg!(debug_assertions) => log::LevelFilter::Debug,
            None => log::LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"backend_url": "http://10.0.0.2:8000", "aspect_ratio": 2.5}"#)
                .unwrap();

        assert_eq!(settings.backend_url, "http://10.0.0.2:8000");
        assert_eq!(settings.aspect_ratio, Some(2.5));
        assert_eq!(settings.toast_timeout_secs, 8);
        assert_eq!(settings.request_timeout_secs, 2_000);
    }

    #[test]
    fn env_override_wins_unless_blank() {
        let mut settings = Settings::default();
        settings.apply_env(Some("  ".to_string()));
        assert_eq!(settings.backend_url, service::connect::DEFAULT_BASE_URL);

        settings.apply_env(Some("http://backend:5000".to_string()));
        assert_eq!(settings.backend().base_url(), "http://backend:5000");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("trendsketch-settings-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();

        let result = Settings::read(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(InternalError::Config(_))));
    }

    #[test]
    fn explicit_log_level() {
        let settings: Settings = serde_json::from_str(r#"{"log_level": "warn"}"#).unwrap();
        assert_eq!(settings.log_level(), log::LevelFilter::Warn);
    }
}
