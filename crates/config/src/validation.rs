//! Configuration validation
//!
//! Checks values that parse but cannot work:
//! - Size limits must be positive
//! - The upload timeout must be positive
//! - A collect URL override must be http(s)

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_collect(config)?;
    validate_sizes(config)?;
    validate_upload(config)?;
    Ok(())
}

fn validate_collect(config: &Config) -> Result<()> {
    if let Some(url) = &config.collect.url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        return Err(ConfigError::invalid_value(
            "collect",
            "url",
            format!("'{url}' is not an http(s) URL"),
        ));
    }

    if config.collect.environment.trim().is_empty() {
        return Err(ConfigError::invalid_value(
            "collect",
            "environment",
            "must not be empty",
        ));
    }

    Ok(())
}

fn validate_sizes(config: &Config) -> Result<()> {
    for (section, field, value) in [
        ("buffer", "max_event_size", config.buffer.max_event_size),
        ("buffer", "max_batch_size", config.buffer.max_batch_size),
        ("cache", "max_file_size", config.cache.max_file_size),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid_value(section, field, "must be positive"));
        }
    }
    Ok(())
}

fn validate_upload(config: &Config) -> Result<()> {
    if config.upload.timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "upload",
            "timeout",
            "must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = Config::from_str("[collect]\nurl = \"ftp://example.com\"");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "url", .. })
        ));
    }

    #[test]
    fn test_rejects_empty_environment() {
        let result = Config::from_str("[collect]\nenvironment = \"  \"");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "environment",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        for toml in [
            "[buffer]\nmax_event_size = 0",
            "[buffer]\nmax_batch_size = 0",
            "[cache]\nmax_file_size = 0",
        ] {
            assert!(Config::from_str(toml).is_err(), "accepted {toml}");
        }
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = Config::from_str("[upload]\ntimeout = \"0s\"");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                section: "upload",
                ..
            })
        ));
    }
}
