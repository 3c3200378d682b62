//! Disk cache - persists unsent events across restarts
//!
//! The cache stores the buffer's event boundaries and the raw stream bytes
//! in a small versioned binary file (layout in `format.rs`). Persistence is best
//! effort: write failures are logged, and any file that cannot be read is
//! deleted and treated as absent.

mod format;
mod fs;

#[cfg(test)]
mod disk_cache_test;

use std::fmt;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{CacheError, Result};

pub use format::{CACHE_FILE_TAG, CacheVersion};
pub use fs::{FileSystem, LocalFileSystem};

/// Default cache file size cap (5 MiB)
pub const MAX_CACHE_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Default cache file name
pub const CACHE_FILE_NAME: &str = "eventcache";

/// Versioned on-disk snapshot of an event buffer
#[derive(Clone)]
pub struct DiskCache {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    max_file_size: usize,
}

impl fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskCache")
            .field("path", &self.path)
            .field("max_file_size", &self.max_file_size)
            .finish()
    }
}

impl DiskCache {
    /// Cache at `path` on the local file system with the default size cap
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fs: Arc::new(LocalFileSystem::new()),
            max_file_size: MAX_CACHE_FILE_SIZE,
        }
    }

    #[must_use]
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    #[must_use]
    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Persist the largest prefix of events that fits under the size cap
    ///
    /// No-op without storage access or without events.
    pub fn write(&self, event_ends: &[usize], payload: &[u8]) {
        if event_ends.is_empty() || !self.fs.can_access_file_system() {
            return;
        }

        let retained = event_ends
            .iter()
            .take_while(|&&end| end < self.max_file_size)
            .count();

        if retained == 0 {
            warn!(
                first_event_end = event_ends[0],
                max = self.max_file_size,
                "no events fit in the cache file, dropping stale cache"
            );
            self.clear();
            return;
        }

        let event_ends = &event_ends[..retained];
        let end = event_ends[retained - 1];
        let Some(payload) = payload.get(..end) else {
            warn!(
                end,
                len = payload.len(),
                "event boundary past end of payload, not caching"
            );
            return;
        };

        match self.write_file(event_ends, payload) {
            Ok(()) => debug!(
                path = %self.path.display(),
                events = retained,
                bytes = end,
                "event cache written"
            ),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to write event cache"
            ),
        }
    }

    /// Load cached events into `event_ends` and `payload`
    ///
    /// Returns false, leaving the containers untouched, when there is no
    /// usable cache. Unreadable files are deleted.
    pub fn read(&self, event_ends: &mut Vec<usize>, payload: &mut Vec<u8>) -> bool {
        if !self.fs.can_access_file_system() || !self.fs.exists(&self.path) {
            return false;
        }

        debug!(path = %self.path.display(), "reading cached events");

        match self.read_file() {
            Ok((ends, data)) => {
                *event_ends = ends;
                *payload = data;
                true
            }
            Err(CacheError::UnknownVersion(version)) => {
                warn!(
                    version,
                    "unable to read event cache file: unknown file format version"
                );
                self.clear();
                false
            }
            Err(e) => {
                warn!(error = %e, "unable to read event cache file: corrupt");
                self.clear();
                false
            }
        }
    }

    /// Delete the cache file if there is one
    pub fn clear(&self) {
        if !self.fs.can_access_file_system() || !self.fs.exists(&self.path) {
            return;
        }
        if let Err(e) = self.fs.delete(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to delete event cache");
        }
    }

    fn write_file(&self, event_ends: &[usize], payload: &[u8]) -> Result<()> {
        let count = i32::try_from(event_ends.len())
            .map_err(|_| CacheError::OffsetOverflow(event_ends.len()))?;

        let mut writer = BufWriter::new(self.fs.open_for_write(&self.path)?);
        format::write_string(&mut writer, CACHE_FILE_TAG)?;
        format::write_i32(&mut writer, CacheVersion::CURRENT.as_i32())?;
        format::write_i32(&mut writer, count)?;
        for &end in event_ends {
            let end = i32::try_from(end).map_err(|_| CacheError::OffsetOverflow(end))?;
            format::write_i32(&mut writer, end)?;
        }
        writer.write_all(payload)?;
        writer.flush()?;
        Ok(())
    }

    fn read_file(&self) -> Result<(Vec<usize>, Vec<u8>)> {
        let mut reader = BufReader::new(self.fs.open_for_read(&self.path)?);

        if format::read_string(&mut reader)? != CACHE_FILE_TAG {
            return Err(CacheError::TagMismatch);
        }

        let version = format::read_i32(&mut reader)?;
        match CacheVersion::from_i32(version) {
            Some(CacheVersion::V1) => read_v1(&mut reader),
            None => Err(CacheError::UnknownVersion(version)),
        }
    }
}

fn read_v1<R: Read>(reader: &mut R) -> Result<(Vec<usize>, Vec<u8>)> {
    let count = format::read_i32(reader)?;
    if count <= 0 {
        return Err(CacheError::InvalidEventCount(count));
    }

    // Count comes from disk; don't trust it for the allocation size.
    let mut event_ends = Vec::with_capacity((count as usize).min(1024));
    let mut previous = 0usize;
    for index in 0..count as usize {
        let offset = format::read_i32(reader)?;
        let end = usize::try_from(offset)
            .ok()
            .filter(|&end| end > previous)
            .ok_or(CacheError::NonIncreasingOffset { index, offset })?;
        event_ends.push(end);
        previous = end;
    }

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    if payload.len() != previous {
        return Err(CacheError::PayloadLengthMismatch {
            expected: previous,
            actual: payload.len(),
        });
    }

    Ok((event_ends, payload))
}
