//! Tally Client Library
//!
//! In-memory event buffering for the tally analytics pipeline. Events are
//! written incrementally, straight into the JSON upload format, so an
//! upload-ready snapshot is a byte copy rather than a re-serialization.
//!
//! # Architecture
//!
//! - [`buffer`] - the [`Buffer`] contract, the recording [`EventBuffer`] and
//!   the inert [`RevokedBuffer`]
//! - [`cache`] - versioned binary snapshot of the buffer on disk
//! - [`param`] - dynamic parameter values for data-driven events
//!
//! # Quick Start
//!
//! ```
//! use tally_client::{Buffer, EventBuffer, EventParams, Identity};
//! use chrono::Local;
//!
//! let mut buffer = EventBuffer::new();
//! buffer.set_identity(Identity {
//!     user_id: "user-1".into(),
//!     session_id: "session-1".into(),
//!     ..Default::default()
//! });
//!
//! let now = Local::now().fixed_offset();
//! buffer.push_start_event("levelCompleted", &now, Some(1), false);
//! buffer.push_int(3, Some("level"));
//! buffer.push_string("forest", Some("zone"));
//! buffer.push_end_event();
//!
//! // Or from a parameter tree
//! let params = EventParams::new().with("score", 1200i64);
//! buffer.record_event("scorePosted", &now, None, false, &params);
//!
//! let payload = buffer.serialize().unwrap();
//! assert!(payload.starts_with(br#"{"eventList":[{"eventName":"levelCompleted""#));
//! assert!(payload.ends_with(b"}}]}"));
//! ```
//!
//! # Wire Format
//!
//! ```text
//! {"eventList":[{"eventName":..,"userID":..,"sessionID":..,"eventUUID":..,
//!                "eventTimestamp":..,["eventVersion":..,]
//!                ["unityInstallationID":..,["unityPlayerID":..,]]
//!                "eventParams":{..}}, ...]}
//! ```

mod error;

pub mod buffer;
pub mod cache;
pub mod param;
mod rate_limit;
pub mod system;
pub mod timestamp;

// Re-export main types at crate root for convenience
pub use buffer::{
    BUFFER_HEADER, Buffer, BufferLimits, EventBuffer, Identity, MAX_BATCH_SIZE, MAX_EVENT_SIZE,
    RevokedBuffer,
};
pub use cache::{DiskCache, FileSystem, LocalFileSystem, MAX_CACHE_FILE_SIZE};
pub use error::{CacheError, Result};
pub use param::{EventParams, ParamValue};
pub use system::{DefaultSystemCalls, SystemCalls};
