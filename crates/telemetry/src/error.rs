//! Telemetry error types.

use thiserror::Error;

/// Errors surfaced to callers of the telemetry crate.
///
/// Upload failures are not errors here: the dispatcher absorbs them and
/// keeps events for the next flush.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Consent was provided before the geo-IP lookup decided which consent
    /// flow applies
    #[error("consent flow not known: check required consents before providing consent")]
    ConsentFlowNotKnown,

    /// HTTP client could not be constructed
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}
