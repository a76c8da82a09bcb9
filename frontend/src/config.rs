//! # Admin configuration
//!
//! Settings are read from a single YAML file, by default
//! `<config dir>/tuition-admin/config.yaml`. Every field is optional:
//!
//! ```yaml
//! api_base_url: "https://tuition.example.com"
//! request_timeout_secs: 30
//! export_dir: "/home/office/Documents/attendance"
//! log_filter: "info"
//! fee_calendar:
//!   anchor_month: 6
//!   anchor_year: 2025
//!   months: 13
//! ```
//!
//! `TUITION_API_URL` in the environment overrides `api_base_url`.

use chrono::Month;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::domain::calendar::FeeCalendar;
use crate::services::api::DEFAULT_BASE_URL;
use crate::services::logging::DEFAULT_LOG_FILTER;

pub const API_URL_ENV: &str = "TUITION_API_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("fee_calendar.anchor_month must be between 1 and 12, got {0}")]
    InvalidAnchorMonth(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeCalendarConfig {
    /// Calendar month number, 1 = January
    pub anchor_month: u32,
    pub anchor_year: i32,
    pub months: usize,
}

impl Default for FeeCalendarConfig {
    fn default() -> Self {
        Self {
            anchor_month: FeeCalendar::DEFAULT_ANCHOR_MONTH.number_from_month(),
            anchor_year: FeeCalendar::DEFAULT_ANCHOR_YEAR,
            months: FeeCalendar::DEFAULT_MONTHS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Where `attendance.csv` is written when no path is given
    pub export_dir: Option<PathBuf>,
    pub fee_calendar: FeeCalendarConfig,
    pub log_filter: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            export_dir: None,
            fee_calendar: FeeCalendarConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AdminConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tuition-admin").join("config.yaml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::read_file(path)?,
            None => match Self::default_path() {
                Some(default_path) if default_path.exists() => Self::read_file(&default_path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml_content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, serde_yaml::Error> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml_content)
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            debug!("Using API URL from {}", API_URL_ENV);
            self.api_base_url = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fee_calendar(&self) -> Result<FeeCalendar, ConfigError> {
        let settings = &self.fee_calendar;
        let month = u8::try_from(settings.anchor_month)
            .ok()
            .and_then(|number| Month::try_from(number).ok())
            .ok_or(ConfigError::InvalidAnchorMonth(settings.anchor_month))?;
        Ok(FeeCalendar::new(month, settings.anchor_year, settings.months))
    }
}
