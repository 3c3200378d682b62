//! Collect endpoint configuration.
//!
//! Events are posted to a per-project, per-environment collect URL.

/// Collect URL pattern; `{project}` and `{environment}` are substituted
pub const COLLECT_URL_PATTERN: &str =
    "https://collect.analytics.unity3d.com/api/analytics/collect/v1/projects/{project}/environments/{environment}";

/// Content type of every upload
pub const CONTENT_TYPE: &str = "application/json";

/// Build the collect URL for a project and environment.
///
/// The environment name is lower-cased.
#[inline]
pub fn collect_url(project_id: &str, environment: &str) -> String {
    COLLECT_URL_PATTERN
        .replace("{project}", project_id)
        .replace("{environment}", &environment.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_url() {
        assert_eq!(
            collect_url("abc-123", "production"),
            "https://collect.analytics.unity3d.com/api/analytics/collect/v1/projects/abc-123/environments/production"
        );
    }

    #[test]
    fn test_collect_url_lowercases_environment() {
        assert!(collect_url("p", "Staging-EU").ends_with("/environments/staging-eu"));
    }

    #[test]
    fn test_collect_url_keeps_project_case() {
        assert!(collect_url("MyProject", "dev").contains("/projects/MyProject/"));
    }
}
