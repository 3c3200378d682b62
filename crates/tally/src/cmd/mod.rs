//! Command implementations for the tally CLI

pub mod clear;
pub mod flush;
pub mod inspect;
pub mod record;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_client::{BufferLimits, DiskCache, EventBuffer};
use tally_config::{CollectTarget, Config};
use tally_telemetry::endpoint;

/// Config files tried when `--config` is not given
const DEFAULT_CONFIG_PATHS: &[&str] = &["tally.toml", "configs/tally.toml"];

/// Load the config file, falling back to defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::from_file(p).context("failed to load config"),
        None => {
            for p in DEFAULT_CONFIG_PATHS {
                let p = Path::new(p);
                if p.exists() {
                    return Config::from_file(p).context("failed to load config");
                }
            }
            Ok(Config::default())
        }
    }
}

/// Cache file location, or `None` when the cache is disabled
pub fn cache_path(config: &Config) -> Option<PathBuf> {
    config.cache.enabled.then(|| {
        config
            .cache
            .path
            .clone()
            .unwrap_or_else(tally_telemetry::default_cache_path)
    })
}

/// Disk cache described by the config
pub fn disk_cache(config: &Config) -> Option<DiskCache> {
    cache_path(config)
        .map(|path| DiskCache::new(path).with_max_file_size(config.cache.max_file_size))
}

/// Empty event buffer with the configured limits and cache
pub fn open_buffer(config: &Config) -> EventBuffer {
    let buffer = EventBuffer::new().with_limits(BufferLimits {
        max_event_size: config.buffer.max_event_size,
        max_batch_size: config.buffer.max_batch_size,
    });
    match disk_cache(config) {
        Some(cache) => buffer.with_disk_cache(cache),
        None => buffer,
    }
}

/// Collect URL described by the config
pub fn collect_url(config: &Config) -> Result<String> {
    let target = config
        .collect
        .target()
        .context("no collect endpoint configured")?;
    Ok(match target {
        CollectTarget::Url(url) => url.to_string(),
        CollectTarget::Project {
            project_id,
            environment,
        } => endpoint::collect_url(project_id, environment),
    })
}
