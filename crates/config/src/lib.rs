//! Tally Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tally_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[collect]\nproject_id = \"p-1\"").unwrap();
//! assert_eq!(config.collect.environment, "production");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [collect]
//! project_id = "p-1"
//! environment = "development"
//!
//! [cache]
//! path = "/var/lib/tally/eventcache"
//!
//! [buffer]
//! max_event_size = 1048576
//!
//! [upload]
//! timeout = "30s"
//! ```

mod buffer;
mod cache;
mod collect;
mod error;
mod logging;
mod upload;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use buffer::{BufferConfig, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_EVENT_SIZE};
pub use cache::{CacheConfig, DEFAULT_MAX_FILE_SIZE};
pub use collect::{CollectConfig, CollectTarget};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};
pub use upload::UploadConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Where events are posted
    pub collect: CollectConfig,

    /// On-disk persistence of unsent events
    pub cache: CacheConfig,

    /// Event and batch size limits
    pub buffer: BufferConfig,

    /// HTTP upload settings
    pub upload: UploadConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
