//! Tally telemetry - consent-gated, single-flight event upload.
//!
//! This crate moves events recorded by `tally-client` to the collect
//! endpoint. Key principles:
//!
//! - **Consent first**: nothing is sent until the geo-IP consent flow is known
//!   and satisfied
//! - **Non-blocking**: uploads run on the tokio runtime, callers never wait
//! - **At most one upload**: further flushes are ignored while one is outstanding
//! - **No loss on transient failure**: unsent events are persisted to disk
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Analytics  │────▶│  BufferSlot  │◀────│  Dispatcher  │
//! │  (facade)   │     │ (rec/revoked)│     │ (async POST) │
//! └─────────────┘     └──────────────┘     └──────────────┘
//!       │                                         │
//!       │ consent transitions                     │ Sends to:
//!       ▼                                         ▼
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ConsentState │     │  Forgetter   │────▶│  Transport   │
//! │   (gate)    │     │ (forget-me)  │     │  (reqwest)   │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tally_client::{DiskCache, EventBuffer, EventParams};
//! use tally_telemetry::{Analytics, ConsentFlow, endpoint};
//!
//! # async fn run() -> Result<(), tally_telemetry::TelemetryError> {
//! let buffer = EventBuffer::new()
//!     .with_disk_cache(DiskCache::new(tally_telemetry::default_cache_path()));
//! let analytics = Analytics::builder(endpoint::collect_url("my-project", "production"), buffer)
//!     .build()?;
//! analytics.initialize();
//!
//! // Result of the host's geo-IP lookup
//! analytics.consent().set_geo_ip_result(ConsentFlow::NotRequired);
//!
//! analytics.record_event("levelCompleted", Some(1), false, &EventParams::new().with("level", 3));
//! analytics.flush();
//! analytics.wait_idle().await;
//! # Ok(())
//! # }
//! ```

pub mod consent;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod forgetter;
pub mod install;
pub mod service;
pub mod slot;
pub mod transport;

#[cfg(test)]
mod testing;

pub use consent::{ConsentFlow, ConsentGate, ConsentState};
pub use dispatcher::{Dispatcher, FlushStatus, UploadResult};
pub use error::TelemetryError;
pub use forgetter::{ForgetStatus, Forgetter};
pub use install::{install_id_path, load_or_create_install_id};
pub use service::{Analytics, AnalyticsBuilder};
pub use slot::{ActiveBuffer, BufferSlot};
pub use transport::{HttpTransport, Transport, UploadOutcome, UploadRequest};

/// Default path for the event cache file.
pub fn default_cache_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("tally")
        .join(tally_client::cache::CACHE_FILE_NAME)
}
