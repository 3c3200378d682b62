//! Revoked buffer - accepts every call and retains nothing
//!
//! Installed in place of the recording buffer while consent is denied, so
//! producers keep calling the same API and nothing survives.

use chrono::{DateTime, FixedOffset};

use super::{Buffer, Identity};

/// Inert [`Buffer`] used while data collection is not allowed
#[derive(Debug, Clone, Copy, Default)]
pub struct RevokedBuffer;

impl RevokedBuffer {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Buffer for RevokedBuffer {
    fn set_identity(&mut self, _identity: Identity) {}

    fn len(&self) -> usize {
        0
    }

    fn events_recorded(&self) -> usize {
        0
    }

    fn push_start_event(
        &mut self,
        _name: &str,
        _timestamp: &DateTime<FixedOffset>,
        _version: Option<i64>,
        _include_identity: bool,
    ) {
    }

    fn push_end_event(&mut self) {}

    fn push_object_start(&mut self, _name: Option<&str>) {}

    fn push_object_end(&mut self) {}

    fn push_array_start(&mut self, _name: &str) {}

    fn push_array_end(&mut self) {}

    fn push_string(&mut self, _value: &str, _name: Option<&str>) {}

    fn push_int(&mut self, _value: i32, _name: Option<&str>) {}

    fn push_int64(&mut self, _value: i64, _name: Option<&str>) {}

    fn push_float(&mut self, _value: f32, _name: Option<&str>) {}

    fn push_double(&mut self, _value: f64, _name: Option<&str>) {}

    fn push_bool(&mut self, _value: bool, _name: Option<&str>) {}

    fn push_timestamp(&mut self, _value: &DateTime<FixedOffset>, _name: Option<&str>) {}

    fn serialize(&self) -> Option<Vec<u8>> {
        None
    }

    fn clear(&mut self) {}

    fn clear_up_to(&mut self, _offset: usize) {}

    fn flush_to_disk(&self) {}

    fn clear_disk_cache(&self) {}

    fn load_from_disk(&mut self) {}
}
