//! Error types for the disk cache
//!
//! These never reach callers of the buffer: the cache logs them and
//! behaves as if no cache file existed.

use std::io;

use thiserror::Error;

/// Result type for cache file operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while reading or writing the event cache file
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying storage failure (including truncated files)
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with the expected header tag
    #[error("header tag mismatch")]
    TagMismatch,

    /// The file was written with a format version this reader does not know
    #[error("unknown file format version {0}")]
    UnknownVersion(i32),

    /// Event count is zero or negative
    #[error("invalid event count {0}")]
    InvalidEventCount(i32),

    /// Event end offsets must be positive and strictly increasing
    #[error("event end offset {offset} at index {index} is not increasing")]
    NonIncreasingOffset {
        /// Position in the offset list
        index: usize,
        /// Offending offset value
        offset: i32,
    },

    /// Payload does not end exactly at the last event boundary
    #[error("payload length {actual} does not match last event end offset {expected}")]
    PayloadLengthMismatch {
        /// Last event end offset
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// An offset is too large for the 32-bit on-disk representation
    #[error("event end offset {0} does not fit the file format")]
    OffsetOverflow(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_version() {
        let err = CacheError::UnknownVersion(7);
        assert_eq!(err.to_string(), "unknown file format version 7");
    }

    #[test]
    fn test_error_display_non_increasing_offset() {
        let err = CacheError::NonIncreasingOffset {
            index: 2,
            offset: 10,
        };
        assert_eq!(
            err.to_string(),
            "event end offset 10 at index 2 is not increasing"
        );
    }

    #[test]
    fn test_error_display_payload_length_mismatch() {
        let err = CacheError::PayloadLengthMismatch {
            expected: 100,
            actual: 80,
        };
        assert_eq!(
            err.to_string(),
            "payload length 80 does not match last event end offset 100"
        );
    }

    #[test]
    fn test_error_from_io() {
        let err: CacheError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().starts_with("io error"));
    }
}
