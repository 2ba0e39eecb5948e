//! Configuration for the `dispo` binary.
//!
//! Loaded from TOML; every section has defaults so an empty file (or no
//! file at all) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use dispo_engine::{AvailabilityConfig, DstPolicy, FailurePolicy, Locale, ResponseFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the configured timezone.
pub const TIMEZONE_ENV: &str = "TIMEZONE";

const DEFAULT_CONFIG_FILE: &str = "dispo.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone every request is evaluated in.
    pub timezone: String,
    pub engine: EngineConfig,
    pub inbox: InboxConfig,
    pub retry: RetryConfig,
    pub response: ResponseConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dst_policy: DstPolicy,
    pub failure_policy: FailurePolicy,
}

/// Where the `watch` loop finds requests and drops replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    pub requests_dir: PathBuf,
    pub responses_dir: PathBuf,
    /// Holds `calendrier_<id>.json` files, one per request.
    pub calendars_dir: PathBuf,
    /// Used when a request has no calendar file of its own.
    pub default_calendar: Option<PathBuf>,
    pub poll_interval_secs: u64,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            requests_dir: PathBuf::from("Partage/Demandes"),
            responses_dir: PathBuf::from("Partage/Réponses"),
            calendars_dir: PathBuf::from("Partage/Calendriers"),
            default_calendar: None,
            poll_interval_secs: 2,
        }
    }
}

impl InboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Backoff for transient event source failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further one.
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub locale: Locale,
    pub separator: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        let format = ResponseFormat::default();
        Self {
            locale: format.locale,
            separator: format.separator,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `dispo.toml` from the working directory,
    /// else defaults. `TIMEZONE` in the environment overrides the zone.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                tracing::info!("Loading config from: {}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        };

        if let Ok(zone) = std::env::var(TIMEZONE_ENV) {
            if !zone.trim().is_empty() {
                config.timezone = zone.trim().to_string();
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured zone, `Europe/Paris` when unset.
    pub fn tz(&self) -> Result<Tz> {
        let name = if self.timezone.trim().is_empty() {
            "Europe/Paris"
        } else {
            self.timezone.trim()
        };
        name.parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone: {}", name)))
    }

    pub fn availability(&self) -> Result<AvailabilityConfig> {
        Ok(AvailabilityConfig {
            timezone: self.tz()?,
            dst_policy: self.engine.dst_policy,
            failure_policy: self.engine.failure_policy,
        })
    }

    pub fn response_format(&self) -> ResponseFormat {
        ResponseFormat {
            locale: self.response.locale,
            separator: self.response.separator.clone(),
        }
    }
}
