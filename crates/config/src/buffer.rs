//! Event buffer size limits

use serde::Deserialize;

/// Default single event cap (4 MiB)
pub const DEFAULT_MAX_EVENT_SIZE: usize = 4 * 1024 * 1024;

/// Default upload batch cap (4 MiB)
pub const DEFAULT_MAX_BATCH_SIZE: usize = 4 * 1024 * 1024;

/// Event buffer configuration
///
/// # Example
///
/// ```toml
/// [buffer]
/// max_event_size = 65536
/// max_batch_size = 1048576
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Events larger than this are dropped
    /// Default: 4 MiB
    pub max_event_size: usize,

    /// Upper bound on a single upload
    /// Default: 4 MiB
    pub max_batch_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_event_size: DEFAULT_MAX_EVENT_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty() {
        let config: BufferConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_event_size, DEFAULT_MAX_EVENT_SIZE);
        assert_eq!(config.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BufferConfig = toml::from_str("max_event_size = 1024").unwrap();
        assert_eq!(config.max_event_size, 1024);
        assert_eq!(config.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
    }
}
