//! Event buffers
//!
//! The [`Buffer`] trait is the capability interface that event producers,
//! the dispatcher and the consent swap all talk to. Two implementations:
//!
//! - [`EventBuffer`] - incremental JSON writer with event boundary tracking
//! - [`RevokedBuffer`] - inert stand-in used while consent is denied
//!
//! Callers never branch on consent state; the owner swaps one buffer for the
//! other at consent transitions.

mod events;
mod revoked;


use chrono::{DateTime, FixedOffset};

use crate::param::EventParams;

pub use events::{BUFFER_HEADER, BufferLimits, EventBuffer, MAX_BATCH_SIZE, MAX_EVENT_SIZE};
pub use revoked::RevokedBuffer;

/// Identity fields written into every event header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Analytics user ID (custom ID or installation ID)
    pub user_id: String,
    /// Current session ID
    pub session_id: String,
    /// Installation ID, written when an event carries identity fields
    pub install_id: String,
    /// Player ID, omitted from events when absent or empty
    pub player_id: Option<String>,
}

/// Capability interface shared by the recording and revoked buffers
///
/// Push calls must be well-bracketed: every `push_start_event` is matched by
/// a `push_end_event`, and containers opened inside an event are closed
/// before it ends. Misuse is logged and the affected event dropped.
#[allow(clippy::len_without_is_empty)]
pub trait Buffer: Send {
    /// Replace the identity used for subsequent events
    fn set_identity(&mut self, identity: Identity);

    /// Current stream length in bytes (header included)
    fn len(&self) -> usize;

    /// Number of fully recorded events
    fn events_recorded(&self) -> usize;

    /// Open a new event and write its leading fields
    fn push_start_event(
        &mut self,
        name: &str,
        timestamp: &DateTime<FixedOffset>,
        version: Option<i64>,
        include_identity: bool,
    );

    /// Close the current event, enforcing the single-event size cap
    fn push_end_event(&mut self);

    /// Open an object; `name` is required inside objects, ignored in arrays
    fn push_object_start(&mut self, name: Option<&str>);

    /// Close the innermost object
    fn push_object_end(&mut self);

    /// Open a named array
    fn push_array_start(&mut self, name: &str);

    /// Close the innermost array
    fn push_array_end(&mut self);

    fn push_string(&mut self, value: &str, name: Option<&str>);

    fn push_int(&mut self, value: i32, name: Option<&str>);

    fn push_int64(&mut self, value: i64, name: Option<&str>);

    fn push_float(&mut self, value: f32, name: Option<&str>);

    fn push_double(&mut self, value: f64, name: Option<&str>);

    fn push_bool(&mut self, value: bool, name: Option<&str>);

    fn push_timestamp(&mut self, value: &DateTime<FixedOffset>, name: Option<&str>);

    /// Snapshot the upload-ready prefix of complete events
    ///
    /// Returns `None` when no event has been completed. Never mutates state.
    fn serialize(&self) -> Option<Vec<u8>>;

    /// Reset to the header-only state
    fn clear(&mut self);

    /// Drop everything up to `offset`, keeping the bytes after it
    fn clear_up_to(&mut self, offset: usize);

    /// Persist complete events to the disk cache
    fn flush_to_disk(&self);

    /// Delete the disk cache file
    fn clear_disk_cache(&self);

    /// Replace buffer contents with the disk cache, if a valid one exists
    fn load_from_disk(&mut self);

    /// Write a whole event with its parameters
    fn record_event(
        &mut self,
        name: &str,
        timestamp: &DateTime<FixedOffset>,
        version: Option<i64>,
        include_identity: bool,
        params: &EventParams,
    ) {
        self.push_start_event(name, timestamp, version, include_identity);
        for (key, value) in params.iter() {
            value.push_into(self, Some(key));
        }
        self.push_end_event();
    }
}
