//! Collect endpoint configuration
//!
//! Either name the project and environment, in which case the standard
//! collect URL is derived from them, or give a full `url` to post to.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Where uploads go, as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectTarget<'a> {
    /// Explicit URL override
    Url(&'a str),
    /// Standard collect URL for a project and environment
    Project {
        project_id: &'a str,
        environment: &'a str,
    },
}

/// Collect endpoint configuration
///
/// # Example
///
/// ```toml
/// [collect]
/// project_id = "2c1b1f64-0000-0000-0000-9a4e0e5d7f10"
/// environment = "production"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Cloud project ID
    pub project_id: Option<String>,

    /// Environment name, lower-cased in the URL
    /// Default: production
    pub environment: String,

    /// Full collect URL, overriding the one derived from project and environment
    pub url: Option<String>,

    /// Version reported in forget requests
    /// Default: the tally version
    pub client_version: Option<String>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            environment: "production".to_string(),
            url: None,
            client_version: None,
        }
    }
}

impl CollectConfig {
    /// Resolve the upload target
    ///
    /// # Errors
    ///
    /// Returns `MissingField` when neither `url` nor `project_id` is set.
    pub fn target(&self) -> Result<CollectTarget<'_>> {
        match (&self.url, &self.project_id) {
            (Some(url), _) => Ok(CollectTarget::Url(url)),
            (None, Some(project_id)) => Ok(CollectTarget::Project {
                project_id,
                environment: &self.environment,
            }),
            (None, None) => Err(ConfigError::missing_field("collect", "project_id")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CollectConfig::default();
        assert!(config.project_id.is_none());
        assert_eq!(config.environment, "production");
        assert!(config.url.is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
project_id = "p-1"
environment = "Staging"
url = "http://localhost:8080/collect"
client_version = "2.0.0"
"#;
        let config: CollectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project_id.as_deref(), Some("p-1"));
        assert_eq!(config.environment, "Staging");
        assert_eq!(config.url.as_deref(), Some("http://localhost:8080/collect"));
        assert_eq!(config.client_version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_target_requires_project_or_url() {
        let config = CollectConfig::default();
        assert!(matches!(
            config.target(),
            Err(ConfigError::MissingField {
                field: "project_id",
                ..
            })
        ));
    }

    #[test]
    fn test_target_prefers_url_override() {
        let config = CollectConfig {
            project_id: Some("p".into()),
            url: Some("http://localhost/collect".into()),
            ..Default::default()
        };
        assert_eq!(
            config.target().unwrap(),
            CollectTarget::Url("http://localhost/collect")
        );
    }

    #[test]
    fn test_target_from_project() {
        let config = CollectConfig {
            project_id: Some("p".into()),
            ..Default::default()
        };
        assert_eq!(
            config.target().unwrap(),
            CollectTarget::Project {
                project_id: "p",
                environment: "production",
            }
        );
    }
}
