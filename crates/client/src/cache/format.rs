//! Binary layout of the event cache file
//!
//! ```text
//! [string  header_tag]        7-bit varint length + UTF-8
//! [i32     format_version]
//! [i32     event_count N]
//! [N × i32 event_end_offset]
//! [bytes   payload[0 .. last offset)]
//! ```
//!
//! All integers are little-endian.

use std::io::{self, Read, Write};

use crate::error::{CacheError, Result};

/// Marks a file as an event cache
pub const CACHE_FILE_TAG: &str = "TallyEventCache";

/// Longest tag we are willing to read before calling the file corrupt
const MAX_TAG_LENGTH: usize = 256;

/// Known cache file versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CacheVersion {
    V1 = 1,
}

impl CacheVersion {
    /// Version written by this build
    pub const CURRENT: Self = Self::V1;

    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Accept only versions this reader understands
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

/// Write a length-prefixed UTF-8 string
pub fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let mut len = value.len();
    loop {
        let byte = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            writer.write_all(&[byte])?;
            break;
        }
        writer.write_all(&[byte | 0x80])?;
    }
    writer.write_all(value.as_bytes())
}

/// Read a length-prefixed UTF-8 string
pub fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        len |= usize::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 28 {
            return Err(CacheError::TagMismatch);
        }
    }

    if len > MAX_TAG_LENGTH {
        return Err(CacheError::TagMismatch);
    }

    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| CacheError::TagMismatch)
}

#[inline]
pub fn write_i32<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[inline]
pub fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_values() {
        assert_eq!(CacheVersion::V1.as_i32(), 1);
        assert_eq!(CacheVersion::CURRENT, CacheVersion::V1);
        assert_eq!(CacheVersion::from_i32(1), Some(CacheVersion::V1));
        assert_eq!(CacheVersion::from_i32(0), None);
        assert_eq!(CacheVersion::from_i32(2), None);
    }

    #[test]
    fn test_short_string_has_single_byte_prefix() {
        let mut out = Vec::new();
        write_string(&mut out, CACHE_FILE_TAG).unwrap();
        assert_eq!(out[0] as usize, CACHE_FILE_TAG.len());
        assert_eq!(&out[1..], CACHE_FILE_TAG.as_bytes());
    }

    #[test]
    fn test_long_string_prefix_is_varint() {
        let value = "x".repeat(200);
        let mut out = Vec::new();
        write_string(&mut out, &value).unwrap();
        assert_eq!(&out[..2], &[0xc8, 0x01]);
        assert_eq!(read_string(&mut out.as_slice()).unwrap(), value);
    }

    #[test]
    fn test_read_string_rejects_oversized_length() {
        let mut out = Vec::new();
        write_string(&mut out, &"x".repeat(MAX_TAG_LENGTH + 1)).unwrap();
        assert!(matches!(
            read_string(&mut out.as_slice()),
            Err(CacheError::TagMismatch)
        ));
    }

    #[test]
    fn test_read_string_truncated() {
        let bytes = [5u8, b'a', b'b'];
        assert!(matches!(
            read_string(&mut bytes.as_slice()),
            Err(CacheError::Io(_))
        ));
    }

    #[test]
    fn test_i32_little_endian() {
        let mut out = Vec::new();
        write_i32(&mut out, 0x0102_0304).unwrap();
        assert_eq!(out, vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!(read_i32(&mut out.as_slice()).unwrap(), 0x0102_0304);
    }
}
