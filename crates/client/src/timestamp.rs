//! Wire timestamp format
//!
//! Events carry local wall-clock time with its UTC offset and millisecond
//! precision, e.g. `2024-01-02 03:04:05.678 +01:00`.

use chrono::{DateTime, FixedOffset};

/// `strftime` pattern for wire timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %:z";

/// Format a timestamp for the wire
#[inline]
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
