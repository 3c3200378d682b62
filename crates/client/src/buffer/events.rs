//! Recording event buffer
//!
//! Writes events straight into the upload wire format:
//!
//! ```text
//! {"eventList":[{...event 1...},{...event 2...},
//!               ^               ^               ^
//!            header end      boundary 1      boundary 2
//! ```
//!
//! Each boundary points just past an event and its trailing list separator.
//! A snapshot is the stream up to a boundary with that final `,` replaced
//! by `]}`.
//!
//! Inside an event, separators are driven by a stack of open container
//! frames. A value writes `,` before itself only when its frame already holds
//! a value, so closing a container never has to strip anything.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, trace, warn};

use super::{Buffer, Identity};
use crate::cache::DiskCache;
use crate::rate_limit::RateLimitedWarn;
use crate::system::{DefaultSystemCalls, SystemCalls};
use crate::timestamp::format_timestamp;

/// Fixed stream prefix
pub const BUFFER_HEADER: &[u8] = br#"{"eventList":["#;

/// Single event size cap (4 MiB)
pub const MAX_EVENT_SIZE: usize = 4 * 1024 * 1024;

/// Upload batch size cap (4 MiB)
///
/// The collect endpoint accepts somewhat more; the gap is headroom.
pub const MAX_BATCH_SIZE: usize = 4 * 1024 * 1024;

/// Closing characters replacing the final separator of a snapshot
const SNAPSHOT_SUFFIX: &[u8] = b"]}";

/// Size caps applied by an [`EventBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    /// Events larger than this are discarded when closed
    pub max_event_size: usize,
    /// Snapshots end at the last boundary below this offset
    pub max_batch_size: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            max_event_size: MAX_EVENT_SIZE,
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// The event object together with its `eventParams` object
    Event,
    Object,
    Array,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    needs_separator: bool,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            needs_separator: false,
        }
    }
}

/// In-memory event stream with boundary tracking
pub struct EventBuffer {
    bytes: Vec<u8>,
    event_ends: Vec<usize>,
    frames: Vec<Frame>,
    /// Where the open event began (always the previous boundary or the header end)
    event_start: usize,
    /// Set when the open event was written out of order; it is dropped on close
    poisoned: bool,
    identity: Identity,
    limits: BufferLimits,
    system: Arc<dyn SystemCalls>,
    cache: Option<DiskCache>,
    /// Throttles warnings about misused push sequences
    misuse: RateLimitedWarn,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBuffer")
            .field("len", &self.bytes.len())
            .field("events", &self.event_ends.len())
            .field("open_frames", &self.frames.len())
            .field("limits", &self.limits)
            .field("cache", &self.cache)
            .finish()
    }
}

impl EventBuffer {
    /// Create an empty buffer with default limits and no disk cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: BUFFER_HEADER.to_vec(),
            event_ends: Vec::new(),
            frames: Vec::new(),
            event_start: BUFFER_HEADER.len(),
            poisoned: false,
            identity: Identity::default(),
            limits: BufferLimits::default(),
            system: Arc::new(DefaultSystemCalls),
            cache: None,
            misuse: RateLimitedWarn::default(),
        }
    }

    /// Set the size caps
    #[must_use]
    pub fn with_limits(mut self, limits: BufferLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Attach a disk cache for `flush_to_disk` / `load_from_disk`
    #[must_use]
    pub fn with_disk_cache(mut self, cache: DiskCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the UUID/clock source
    #[must_use]
    pub fn with_system_calls(mut self, system: Arc<dyn SystemCalls>) -> Self {
        self.system = system;
        self
    }

    /// Minimum interval between warnings about misused push sequences
    #[must_use]
    pub fn with_warn_interval(mut self, interval: std::time::Duration) -> Self {
        self.misuse = RateLimitedWarn::new(interval);
        self
    }

    /// Byte offsets of each recorded event's end
    #[inline]
    pub fn event_end_offsets(&self) -> &[usize] {
        &self.event_ends
    }

    /// Raw stream contents, header included
    #[inline]
    pub fn raw_contents(&self) -> &[u8] {
        &self.bytes
    }

    #[cfg(test)]
    pub(crate) fn suppressed_warnings(&self) -> u64 {
        self.misuse.suppressed()
    }

    #[inline]
    pub fn limits(&self) -> BufferLimits {
        self.limits
    }

    #[inline]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Whether an event is currently open
    #[inline]
    pub fn in_event(&self) -> bool {
        !self.frames.is_empty()
    }

    fn write_raw(&mut self, raw: &[u8]) {
        self.bytes.extend_from_slice(raw);
    }

    fn write_string_member(&mut self, key: &str, value: &str) {
        write_json_string(&mut self.bytes, key);
        self.bytes.push(b':');
        write_json_string(&mut self.bytes, value);
        self.bytes.push(b',');
    }

    /// Write the separator and key for a value in the innermost frame.
    ///
    /// Returns false when no event is open; nothing is written then.
    fn begin_value(&mut self, name: Option<&str>) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            if let Some(suppressed) = self.misuse.admit() {
                warn!(name, suppressed, "value pushed outside of an event, ignoring");
            }
            return false;
        };

        let key = match (frame.kind, name) {
            (FrameKind::Array, _) => None,
            (_, Some(name)) => Some(name),
            (_, None) => {
                if let Some(suppressed) = self.misuse.admit() {
                    warn!(
                        suppressed,
                        "unnamed value pushed into an object, event will be discarded"
                    );
                }
                self.poisoned = true;
                None
            }
        };

        if std::mem::replace(&mut frame.needs_separator, true) {
            self.bytes.push(b',');
        }
        if let Some(key) = key {
            write_json_string(&mut self.bytes, key);
            self.bytes.push(b':');
        }
        true
    }

    fn open_frame(&mut self, kind: FrameKind, name: Option<&str>) {
        if !self.begin_value(name) {
            return;
        }
        self.write_raw(match kind {
            FrameKind::Array => b"[",
            _ => b"{",
        });
        self.frames.push(Frame::new(kind));
    }

    fn close_frame(&mut self, kind: FrameKind) {
        match self.frames.last() {
            None => {
                if let Some(suppressed) = self.misuse.admit() {
                    warn!(?kind, suppressed, "container closed outside of an event, ignoring");
                }
            }
            Some(frame) if frame.kind != kind => {
                if let Some(suppressed) = self.misuse.admit() {
                    warn!(
                        expected = ?frame.kind,
                        got = ?kind,
                        suppressed,
                        "mismatched container close, event will be discarded"
                    );
                }
                self.poisoned = true;
            }
            Some(_) => {
                self.frames.pop();
                self.write_raw(match kind {
                    FrameKind::Array => b"]",
                    _ => b"}",
                });
            }
        }
    }

    /// Drop the open event and everything written for it
    fn discard_open_event(&mut self) {
        self.bytes.truncate(self.event_start);
        self.frames.clear();
        self.poisoned = false;
    }

    fn last_boundary(&self) -> usize {
        self.event_ends
            .last()
            .copied()
            .unwrap_or(BUFFER_HEADER.len())
    }

    fn reset(&mut self) {
        self.bytes.clear();
        self.bytes.extend_from_slice(BUFFER_HEADER);
        self.event_ends.clear();
        self.frames.clear();
        self.poisoned = false;
        self.event_start = BUFFER_HEADER.len();
    }
}

impl Buffer for EventBuffer {
    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn events_recorded(&self) -> usize {
        self.event_ends.len()
    }

    fn push_start_event(
        &mut self,
        name: &str,
        timestamp: &DateTime<FixedOffset>,
        version: Option<i64>,
        include_identity: bool,
    ) {
        if self.in_event() {
            if let Some(suppressed) = self.misuse.admit() {
                warn!(
                    event = name,
                    suppressed,
                    "event started before the previous one ended, discarding the unfinished event"
                );
            }
            self.discard_open_event();
        }
        self.event_start = self.bytes.len();

        trace!(event = name, timestamp = %format_timestamp(timestamp), "recording event");

        let uuid = self.system.generate_uuid();
        let identity = std::mem::take(&mut self.identity);

        self.write_raw(b"{");
        self.write_string_member("eventName", name);
        self.write_string_member("userID", &identity.user_id);
        self.write_string_member("sessionID", &identity.session_id);
        self.write_string_member("eventUUID", &uuid);
        self.write_string_member("eventTimestamp", &format_timestamp(timestamp));

        if let Some(version) = version {
            self.write_raw(b"\"eventVersion\":");
            self.write_raw(version.to_string().as_bytes());
            self.write_raw(b",");
        }

        if include_identity {
            self.write_string_member("unityInstallationID", &identity.install_id);
            if let Some(player_id) = identity.player_id.as_deref()
                && !player_id.is_empty()
            {
                self.write_string_member("unityPlayerID", player_id);
            }
        }

        self.identity = identity;
        self.write_raw(b"\"eventParams\":{");
        self.frames.push(Frame::new(FrameKind::Event));
    }

    fn push_end_event(&mut self) {
        let well_formed = match self.frames.as_slice() {
            [] => {
                if let Some(suppressed) = self.misuse.admit() {
                    warn!(suppressed, "event ended without being started, ignoring");
                }
                return;
            }
            [frame] => frame.kind == FrameKind::Event && !self.poisoned,
            _ => false,
        };
        if !well_formed {
            if let Some(suppressed) = self.misuse.admit() {
                warn!(
                    open_containers = self.frames.len().saturating_sub(1),
                    suppressed,
                    "malformed event, discarding it"
                );
            }
            self.discard_open_event();
            return;
        }

        self.frames.clear();
        self.write_raw(b"}},");

        let end = self.bytes.len();
        let size = end - self.event_start;

        if size > self.limits.max_event_size {
            warn!(
                size,
                max_kb = self.limits.max_event_size / 1024,
                "event too big to upload, discarding it to prevent blockage"
            );
            self.bytes.truncate(self.event_start);
            return;
        }

        self.event_ends.push(end);
        self.event_start = end;
        trace!(event = self.event_ends.len(), end, "event recorded");
    }

    fn push_object_start(&mut self, name: Option<&str>) {
        self.open_frame(FrameKind::Object, name);
    }

    fn push_object_end(&mut self) {
        self.close_frame(FrameKind::Object);
    }

    fn push_array_start(&mut self, name: &str) {
        self.open_frame(FrameKind::Array, Some(name));
    }

    fn push_array_end(&mut self) {
        self.close_frame(FrameKind::Array);
    }

    fn push_string(&mut self, value: &str, name: Option<&str>) {
        if self.begin_value(name) {
            write_json_string(&mut self.bytes, value);
        }
    }

    fn push_int(&mut self, value: i32, name: Option<&str>) {
        self.push_int64(i64::from(value), name);
    }

    fn push_int64(&mut self, value: i64, name: Option<&str>) {
        if self.begin_value(name) {
            self.write_raw(value.to_string().as_bytes());
        }
    }

    fn push_float(&mut self, value: f32, name: Option<&str>) {
        if self.begin_value(name) {
            if value.is_finite() {
                write_json_number(&mut self.bytes, value);
            } else {
                if let Some(suppressed) = self.misuse.admit() {
                    warn!(name, %value, suppressed, "non-finite float written as null");
                }
                self.write_raw(b"null");
            }
        }
    }

    fn push_double(&mut self, value: f64, name: Option<&str>) {
        if self.begin_value(name) {
            if value.is_finite() {
                write_json_number(&mut self.bytes, value);
            } else {
                if let Some(suppressed) = self.misuse.admit() {
                    warn!(name, %value, suppressed, "non-finite double written as null");
                }
                self.write_raw(b"null");
            }
        }
    }

    fn push_bool(&mut self, value: bool, name: Option<&str>) {
        if self.begin_value(name) {
            self.write_raw(if value { &b"true"[..] } else { &b"false"[..] });
        }
    }

    fn push_timestamp(&mut self, value: &DateTime<FixedOffset>, name: Option<&str>) {
        if self.begin_value(name) {
            write_json_string(&mut self.bytes, &format_timestamp(value));
        }
    }

    fn serialize(&self) -> Option<Vec<u8>> {
        let first = *self.event_ends.first()?;

        // The first event always goes out, even if it alone reaches the cap.
        let end = self
            .event_ends
            .iter()
            .copied()
            .take_while(|&end| end < self.limits.max_batch_size)
            .last()
            .unwrap_or(first);

        let mut payload = Vec::with_capacity(end + 1);
        payload.extend_from_slice(&self.bytes[..end - 1]);
        payload.extend_from_slice(SNAPSHOT_SUFFIX);
        Some(payload)
    }

    fn clear(&mut self) {
        self.reset();
    }

    fn clear_up_to(&mut self, offset: usize) {
        let header = BUFFER_HEADER.len();
        let upto = offset.clamp(header, self.bytes.len());
        if upto == header {
            return;
        }

        let retained = self.bytes.split_off(upto);
        self.bytes.clear();
        self.bytes.extend_from_slice(BUFFER_HEADER);
        self.bytes.extend_from_slice(&retained);

        // Boundaries at or before the cut belong to consumed events.
        self.event_ends = self
            .event_ends
            .iter()
            .filter(|&&end| end > upto)
            .map(|&end| end - upto + header)
            .collect();

        if !self.in_event() {
            self.event_start = self.bytes.len();
        } else if self.event_start >= upto {
            self.event_start = self.event_start - upto + header;
        } else {
            warn!("clear cut into an unfinished event, discarding it");
            self.event_start = self.last_boundary();
            self.discard_open_event();
        }

        debug!(
            cleared = upto - header,
            retained = retained.len(),
            events = self.event_ends.len(),
            "buffer cleared"
        );
    }

    fn flush_to_disk(&self) {
        if let Some(cache) = &self.cache {
            cache.write(&self.event_ends, &self.bytes);
        }
    }

    fn clear_disk_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    fn load_from_disk(&mut self) {
        let Some(cache) = &self.cache else {
            return;
        };

        let mut event_ends = Vec::new();
        let mut payload = Vec::new();
        if !cache.read(&mut event_ends, &mut payload) {
            // Nothing usable on disk; start from an empty stream.
            self.reset();
            return;
        }

        if !payload.starts_with(BUFFER_HEADER) {
            warn!("cached events do not start with the stream header, discarding them");
            cache.clear();
            self.reset();
            return;
        }

        self.bytes = payload;
        self.event_ends = event_ends;
        self.frames.clear();
        self.poisoned = false;
        self.event_start = self.bytes.len();

        debug!(
            events = self.event_ends.len(),
            bytes = self.bytes.len(),
            "restored cached events"
        );
    }
}

/// Write a finite float in shortest round-trip form, exponent included
fn write_json_number<T: serde::Serialize>(out: &mut Vec<u8>, value: T) {
    // Finite floats into a Vec cannot fail.
    let _ = serde_json::to_writer(out, &value);
}

/// Write `value` as a JSON string literal
fn write_json_string(out: &mut Vec<u8>, value: &str) {
    // Serializing a str into a Vec cannot fail.
    let _ = serde_json::to_writer(out, value);
}
