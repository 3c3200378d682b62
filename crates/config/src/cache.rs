//! Disk cache configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Default cache file size cap (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Disk cache configuration
///
/// # Example
///
/// ```toml
/// [cache]
/// path = "/var/lib/tally/eventcache"
/// max_file_size = 1048576
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persist unsent events across restarts
    /// Default: true
    pub enabled: bool,

    /// Cache file location
    /// Default: platform data directory
    pub path: Option<PathBuf>,

    /// Events past this offset are not written to disk
    /// Default: 5 MiB
    pub max_file_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}
