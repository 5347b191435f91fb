//! Configuration management for skybanner
//!
//! This module handles loading and validating configuration from environment
//! variables (with `.env` support), TOML files, and command-line overrides.
//!
//! # Environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SKYBANNER_BANNER_DIR` | `./Banners` |
//! | `SKYBANNER_DATA_FILE` | `./bannerData.json` |
//! | `SKYBANNER_SCHEDULE` | `BRUCESKY_SCHEDULE`, then `hourly` |
//! | `SKYBANNER_SEED` | unset (random) |
//! | `BLUESKY_SERVICE` | `https://bsky.social` |
//! | `BLUESKY_IDENTIFIER` | - |
//! | `BLUESKY_APP_PASSWORD` | - |
//! | `SKYBANNER_HTTP_TIMEOUT` | `30` |
//! | `SKYBANNER_LOG_LEVEL` | `info` |
//! | `SKYBANNER_LOG_FORMAT` | `text` |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::publisher::bluesky::{BlueskyConfig, DEFAULT_SERVICE, DEFAULT_TIMEOUT_SECS};
use crate::scheduler::ScheduleMode;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rotation configuration
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Bluesky account configuration
    #[serde(default)]
    pub bluesky: BlueskyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rotation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Directory holding candidate banner images
    pub banner_dir: PathBuf,

    /// Persisted catalog file
    pub data_file: PathBuf,

    /// Schedule mode id (hourly, daily, weekly, biweekly, monthly)
    pub schedule: String,

    /// Fixed lottery seed
    pub seed: Option<u64>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            banner_dir: PathBuf::from("./Banners"),
            data_file: PathBuf::from("./bannerData.json"),
            schedule: ScheduleMode::default().id().to_string(),
            seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional numeric variable; unset or blank yields `None`
fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} is not a valid number: {v}")),
        _ => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first; variables
    /// already set in the environment win.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let seed = env_parsed::<u64>("SKYBANNER_SEED")?;
        let timeout_secs =
            env_parsed::<u64>("SKYBANNER_HTTP_TIMEOUT")?.unwrap_or(DEFAULT_TIMEOUT_SECS);

        // Older deployments configure the schedule under this key
        let schedule = std::env::var("SKYBANNER_SCHEDULE")
            .or_else(|_| std::env::var("BRUCESKY_SCHEDULE"))
            .unwrap_or_else(|_| ScheduleMode::default().id().to_string());

        Ok(Self {
            rotation: RotationConfig {
                banner_dir: env_or("SKYBANNER_BANNER_DIR", "./Banners").into(),
                data_file: env_or("SKYBANNER_DATA_FILE", "./bannerData.json").into(),
                schedule,
                seed,
            },
            bluesky: BlueskyConfig {
                service: env_or("BLUESKY_SERVICE", DEFAULT_SERVICE),
                identifier: env_or("BLUESKY_IDENTIFIER", ""),
                app_password: env_or("BLUESKY_APP_PASSWORD", ""),
                timeout_secs,
            },
            logging: LoggingConfig {
                level: env_or("SKYBANNER_LOG_LEVEL", "info"),
                format: env_or("SKYBANNER_LOG_FORMAT", "text"),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Credentials are not required here; see [`Config::validate_for_publishing`].
    pub fn validate(&self) -> Result<()> {
        self.schedule_mode()?;

        self.bluesky
            .validate()
            .map_err(|e| anyhow::anyhow!(e))?;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "Unknown log format '{}'. Valid options: text, json",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Validate everything needed to publish, including credentials
    pub fn validate_for_publishing(&self) -> Result<()> {
        self.validate()?;
        self.bluesky
            .validate_credentials()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }

    /// Parsed schedule mode
    pub fn schedule_mode(&self) -> Result<ScheduleMode> {
        Ok(ScheduleMode::from_id(&self.rotation.schedule)?)
    }
}
