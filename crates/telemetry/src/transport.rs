//! Upload transport
//!
//! The dispatcher and forgetter hand a fully built [`UploadRequest`] to a
//! [`Transport`] and only look at the resulting status and network error.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::endpoint::CONTENT_TYPE;
use crate::error::TelemetryError;

/// Default request timeout
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// A single POST of a JSON payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub url: String,
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl UploadRequest {
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            body,
            headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// What came back from an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// HTTP status, 0 when no response was received
    pub status: u16,
    /// Set when the request failed below HTTP
    pub network_error: Option<String>,
}

impl UploadOutcome {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            network_error: None,
        }
    }

    pub fn network_error(error: impl Into<String>) -> Self {
        Self {
            status: 0,
            network_error: Some(error.into()),
        }
    }

    /// Collect accepted the events
    #[inline]
    pub fn is_accepted(&self) -> bool {
        self.network_error.is_none() && self.status == 204
    }

    /// Collect rejected the payload as malformed
    #[inline]
    pub fn is_rejected(&self) -> bool {
        self.network_error.is_none() && self.status == 400
    }
}

/// Sends upload requests
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: UploadRequest) -> UploadOutcome;
}

/// `reqwest` backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: UploadRequest) -> UploadOutcome {
        trace!(url = %request.url, bytes = request.body.len(), "posting events");

        let mut builder = self
            .client
            .post(&request.url)
            .header("Content-Type", CONTENT_TYPE)
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        match builder.send().await {
            Ok(response) => UploadOutcome::status(response.status().as_u16()),
            Err(e) => UploadOutcome {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                network_error: Some(e.to_string()),
            },
        }
    }
}
