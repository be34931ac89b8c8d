//! File system seam
//!
//! Targets are abstracted as writable file locations: the distributor and the
//! index never touch `std::fs` directly, so a target can be mapped onto
//! anything that supports read-bytes, write-bytes, create-directories and
//! existence checks. `LocalFileSystem` is the production implementation;
//! `MockFileSystem` backs the unit tests.

use crate::error::VerbenaResult;
use std::path::Path;

/// Abstract file system interface
pub trait FileSystem {
    /// Read the full content of a file
    fn read(&self, path: &Path) -> VerbenaResult<Vec<u8>>;

    /// Write file content atomically (write to a sibling temp file, then rename)
    fn write_atomic(&self, path: &Path, data: &[u8]) -> VerbenaResult<()>;

    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> VerbenaResult<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> VerbenaResult<()>;
}

/// Production file system backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read(&self, path: &Path) -> VerbenaResult<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> VerbenaResult<()> {
        use std::io::Write;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> VerbenaResult<()> {
        Ok(std::fs::create_dir_all(path)?)
    }

    fn remove_file(&self, path: &Path) -> VerbenaResult<()> {
        Ok(std::fs::remove_file(path)?)
    }
}

/// In-memory file system for testing
///
/// Uses `Arc<Mutex<>>` internally so it can be cloned and shared.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    pub files: std::sync::Arc<
        std::sync::Mutex<std::collections::HashMap<std::path::PathBuf, Vec<u8>>>,
    >,
}

#[cfg(test)]
impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<std::path::PathBuf>, data: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(path.into(), data.into());
    }
}

#[cfg(test)]
impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> VerbenaResult<Vec<u8>> {
        let files = self.files.lock().unwrap();
        files.get(path).cloned().ok_or_else(|| {
            crate::error::VerbenaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            ))
        })
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> VerbenaResult<()> {
        let mut files = self.files.lock().unwrap();
        files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> VerbenaResult<()> {
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> VerbenaResult<()> {
        let mut files = self.files.lock().unwrap();
        files.remove(path);
        Ok(())
    }
}
