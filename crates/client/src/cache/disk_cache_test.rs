//! Tests for the disk cache

use std::sync::Arc;

use tempfile::TempDir;

use super::format::{self, CACHE_FILE_TAG, CacheVersion};
use super::{DiskCache, LocalFileSystem};

fn cache_in(dir: &TempDir) -> DiskCache {
    DiskCache::new(dir.path().join("eventcache"))
}

/// Three fake events of 10 bytes each behind a 14-byte header
fn sample() -> (Vec<usize>, Vec<u8>) {
    let mut payload = br#"{"eventList":["#.to_vec();
    let mut ends = Vec::new();
    for i in 0..3u8 {
        payload.extend_from_slice(&[b'a' + i; 9]);
        payload.push(b',');
        ends.push(payload.len());
    }
    (ends, payload)
}

fn write_raw_file(cache: &DiskCache, tag: &str, version: i32, ends: &[i32], payload: &[u8]) {
    let mut bytes = Vec::new();
    format::write_string(&mut bytes, tag).unwrap();
    format::write_i32(&mut bytes, version).unwrap();
    format::write_i32(&mut bytes, ends.len() as i32).unwrap();
    for &end in ends {
        format::write_i32(&mut bytes, end).unwrap();
    }
    bytes.extend_from_slice(payload);
    std::fs::write(cache.path(), bytes).unwrap();
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_write_then_read_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let (ends, payload) = sample();

    cache.write(&ends, &payload);

    let mut read_ends = Vec::new();
    let mut read_payload = Vec::new();
    assert!(cache.read(&mut read_ends, &mut read_payload));
    assert_eq!(read_ends, ends);
    assert_eq!(read_payload, payload);
}

#[test]
fn test_read_replaces_container_contents() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let (ends, payload) = sample();
    cache.write(&ends, &payload);

    let mut read_ends = vec![999];
    let mut read_payload = b"stale".to_vec();
    assert!(cache.read(&mut read_ends, &mut read_payload));
    assert_eq!(read_ends, ends);
    assert_eq!(read_payload, payload);
}

#[test]
fn test_file_layout() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let (ends, payload) = sample();
    cache.write(&ends, &payload);

    let bytes = std::fs::read(cache.path()).unwrap();
    let tag_len = bytes[0] as usize;
    assert_eq!(&bytes[1..1 + tag_len], CACHE_FILE_TAG.as_bytes());

    let mut rest = &bytes[1 + tag_len..];
    assert_eq!(format::read_i32(&mut rest).unwrap(), CacheVersion::V1.as_i32());
    assert_eq!(format::read_i32(&mut rest).unwrap(), 3);
    for &end in &ends {
        assert_eq!(format::read_i32(&mut rest).unwrap(), end as i32);
    }
    assert_eq!(rest, payload.as_slice());
}

#[test]
fn test_write_overwrites_previous_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let (ends, payload) = sample();

    cache.write(&ends, &payload);
    cache.write(&ends[..1], &payload);

    let mut read_ends = Vec::new();
    let mut read_payload = Vec::new();
    assert!(cache.read(&mut read_ends, &mut read_payload));
    assert_eq!(read_ends, vec![ends[0]]);
    assert_eq!(read_payload, &payload[..ends[0]]);
}

// =============================================================================
// Size cap
// =============================================================================

#[test]
fn test_write_keeps_prefix_under_cap() {
    let dir = TempDir::new().unwrap();
    let (ends, payload) = sample();
    // ends are 24, 34, 44: only the first two are strictly below 40
    let cache = cache_in(&dir).with_max_file_size(40);

    cache.write(&ends, &payload);

    let mut read_ends = Vec::new();
    let mut read_payload = Vec::new();
    assert!(cache.read(&mut read_ends, &mut read_payload));
    assert_eq!(read_ends, vec![24, 34]);
    assert_eq!(read_payload, &payload[..34]);
}

#[test]
fn test_write_with_boundary_equal_to_cap_excludes_it() {
    let dir = TempDir::new().unwrap();
    let (ends, payload) = sample();
    let cache = cache_in(&dir).with_max_file_size(34);

    cache.write(&ends, &payload);

    let mut read_ends = Vec::new();
    let mut read_payload = Vec::new();
    assert!(cache.read(&mut read_ends, &mut read_payload));
    assert_eq!(read_ends, vec![24]);
}

#[test]
fn test_write_nothing_fits_removes_stale_file() {
    let dir = TempDir::new().unwrap();
    let (ends, payload) = sample();
    cache_in(&dir).write(&ends, &payload);

    let tiny = cache_in(&dir).with_max_file_size(10);
    tiny.write(&ends, &payload);

    assert!(!tiny.path().exists());
}

#[test]
fn test_write_without_events_is_noop() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);

    cache.write(&[], br#"{"eventList":["#);

    assert!(!cache.path().exists());
}

#[test]
fn test_write_boundary_past_payload_is_skipped() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);

    cache.write(&[100], b"short");

    assert!(!cache.path().exists());
}

// =============================================================================
// Clear
// =============================================================================

#[test]
fn test_clear_deletes_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let (ends, payload) = sample();
    cache.write(&ends, &payload);
    assert!(cache.path().exists());

    cache.clear();

    assert!(!cache.path().exists());
}

#[test]
fn test_clear_missing_file_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);

    cache.clear();
    cache.clear();

    assert!(!cache.path().exists());
}

#[test]
fn test_read_missing_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);

    let mut ends = Vec::new();
    let mut payload = Vec::new();
    assert!(!cache.read(&mut ends, &mut payload));
    assert!(ends.is_empty());
    assert!(payload.is_empty());
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_read_corrupt_tag_deletes_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    write_raw_file(&cache, "NotAnEventCache", 1, &[20], &[b'x'; 20]);

    let mut ends = vec![7];
    let mut payload = b"keep".to_vec();
    assert!(!cache.read(&mut ends, &mut payload));

    assert!(!cache.path().exists());
    assert_eq!(ends, vec![7]);
    assert_eq!(payload, b"keep");
}

#[test]
fn test_read_unknown_version_deletes_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    write_raw_file(&cache, CACHE_FILE_TAG, 2, &[20], &[b'x'; 20]);

    let mut ends = Vec::new();
    let mut payload = Vec::new();
    assert!(!cache.read(&mut ends, &mut payload));
    assert!(!cache.path().exists());
}

#[test]
fn test_read_truncated_offsets_deletes_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let mut bytes = Vec::new();
    format::write_string(&mut bytes, CACHE_FILE_TAG).unwrap();
    format::write_i32(&mut bytes, 1).unwrap();
    format::write_i32(&mut bytes, 5).unwrap();
    format::write_i32(&mut bytes, 10).unwrap();
    std::fs::write(cache.path(), bytes).unwrap();

    let mut ends = Vec::new();
    let mut payload = Vec::new();
    assert!(!cache.read(&mut ends, &mut payload));
    assert!(!cache.path().exists());
}

#[test]
fn test_read_payload_shorter_than_last_offset() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    write_raw_file(&cache, CACHE_FILE_TAG, 1, &[10, 20], &[b'x'; 15]);

    let mut ends = Vec::new();
    let mut payload = Vec::new();
    assert!(!cache.read(&mut ends, &mut payload));
    assert!(!cache.path().exists());
}

#[test]
fn test_read_non_increasing_offsets() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    write_raw_file(&cache, CACHE_FILE_TAG, 1, &[20, 10], &[b'x'; 10]);

    let mut ends = Vec::new();
    let mut payload = Vec::new();
    assert!(!cache.read(&mut ends, &mut payload));
    assert!(!cache.path().exists());
}

#[test]
fn test_read_zero_events() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    write_raw_file(&cache, CACHE_FILE_TAG, 1, &[], &[]);

    let mut ends = Vec::new();
    let mut payload = Vec::new();
    assert!(!cache.read(&mut ends, &mut payload));
    assert!(!cache.path().exists());
}

#[test]
fn test_read_garbage_file() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    std::fs::write(cache.path(), [0xffu8; 3]).unwrap();

    let mut ends = Vec::new();
    let mut payload = Vec::new();
    assert!(!cache.read(&mut ends, &mut payload));
    assert!(!cache.path().exists());
}

// =============================================================================
// Storage access
// =============================================================================

#[test]
fn test_inaccessible_storage_is_silent() {
    let dir = TempDir::new().unwrap();
    let (ends, payload) = sample();
    let cache = cache_in(&dir).with_file_system(Arc::new(LocalFileSystem::disabled()));

    cache.write(&ends, &payload);
    assert!(!cache.path().exists());

    let mut read_ends = Vec::new();
    let mut read_payload = Vec::new();
    assert!(!cache.read(&mut read_ends, &mut read_payload));

    cache.clear();
}

#[test]
fn test_inaccessible_storage_does_not_touch_existing_file() {
    let dir = TempDir::new().unwrap();
    let (ends, payload) = sample();
    cache_in(&dir).write(&ends, &payload);

    let cache = cache_in(&dir).with_file_system(Arc::new(LocalFileSystem::disabled()));
    cache.clear();

    assert!(cache.path().exists());
}
