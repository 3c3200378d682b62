//! Storage access for the disk cache

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

/// File operations the disk cache needs
///
/// Platforms without writable local storage report
/// `can_access_file_system() == false` and the cache goes quiet.
pub trait FileSystem: Send + Sync {
    fn can_access_file_system(&self) -> bool;

    fn exists(&self, path: &Path) -> bool;

    fn delete(&self, path: &Path) -> io::Result<()>;

    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Create or truncate the file
    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// `std::fs` backed storage
#[derive(Debug, Clone, Copy)]
pub struct LocalFileSystem {
    enabled: bool,
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl LocalFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that reports itself as inaccessible
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl FileSystem for LocalFileSystem {
    fn can_access_file_system(&self) -> bool {
        self.enabled
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn open_for_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(File::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("eventcache");
        let fs = LocalFileSystem::new();

        let mut file = fs.open_for_write(&path).unwrap();
        file.write_all(b"abc").unwrap();
        drop(file);

        assert!(fs.exists(&path));
        let mut contents = Vec::new();
        fs.open_for_read(&path)
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"abc");
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eventcache");
        std::fs::write(&path, b"x").unwrap();

        let fs = LocalFileSystem::new();
        fs.delete(&path).unwrap();
        assert!(!fs.exists(&path));
    }

    #[test]
    fn test_disabled_reports_no_access() {
        assert!(LocalFileSystem::new().can_access_file_system());
        assert!(!LocalFileSystem::disabled().can_access_file_system());
    }

    #[test]
    fn test_exists_is_false_for_directories() {
        let dir = TempDir::new().unwrap();
        assert!(!LocalFileSystem::new().exists(dir.path()));
    }
}
