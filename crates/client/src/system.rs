//! Clock and identifier sources
//!
//! Abstracted so tests can produce byte-exact event output.

use chrono::{DateTime, FixedOffset, Local};

/// Source of event UUIDs and the current time
pub trait SystemCalls: Send + Sync {
    /// Generate a fresh hyphenated event UUID
    fn generate_uuid(&self) -> String;

    /// Current local time with its UTC offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Random v4 UUIDs and the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSystemCalls;

impl SystemCalls for DefaultSystemCalls {
    fn generate_uuid(&self) -> String {
        uuid::Uuid::new_v4().hyphenated().to_string()
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_is_hyphenated_v4() {
        let id = DefaultSystemCalls.generate_uuid();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_uuids_are_unique() {
        assert_ne!(
            DefaultSystemCalls.generate_uuid(),
            DefaultSystemCalls.generate_uuid()
        );
    }
}
