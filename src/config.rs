//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config <FILE>`, or `config.toml` in the platform
//!    config directory)
//! 3. environment variables prefixed `PHOTOSWEEP_`
//!
//! CLI flags are applied on top by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PHOTOSWEEP_";

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has a bad value.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of hashing worker threads (minimum 1).
    pub hash_workers: usize,
    /// How often the main thread polls hashing progress, in milliseconds.
    pub progress_interval_ms: u64,
    /// Show progress bars on stderr.
    pub show_progress: bool,
    /// Color console reports.
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_workers: 4,
            progress_interval_ms: 250,
            show_progress: true,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from the default file location and the environment.
    ///
    /// A missing default file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a layer fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::default_path() {
            log::debug!("Looking for config at {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load configuration from an explicit file plus the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file does not exist, or
    /// [`ConfigError::Invalid`] if a layer fails to parse.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract().map_err(Box::new)?;
        config.hash_workers = config.hash_workers.max(1);
        Ok(config)
    }

    /// Platform-specific default config file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "photosweep", "photosweep")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Progress polling interval.
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
