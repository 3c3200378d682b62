//! Upload configuration

use serde::Deserialize;
use std::time::Duration;

/// Upload configuration
///
/// # Example
///
/// ```toml
/// [upload]
/// timeout = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// HTTP request timeout
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}
