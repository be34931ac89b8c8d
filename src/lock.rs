//! Publish run lock
//!
//! One advisory lock file guards a whole target cluster: publish runs and
//! retractions rewrite every target's manifests and must not interleave.
//! The lock is held for the lifetime of the guard and released on drop,
//! including the panic path.

use crate::error::{VerbenaError, VerbenaResult};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Guard holding the cluster's exclusive run lock
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock, failing fast with `LockBusy` if another run holds
    /// it. Waiting is left to the caller or its scheduler; silently queueing
    /// publish runs would hide operational problems.
    pub fn acquire(path: &Path) -> VerbenaResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "run lock acquired");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(VerbenaError::LockBusy {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!(path = %self.path.display(), "run lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_creates_lock_file_and_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locks/.run.lock");

        let lock = RunLock::acquire(&path).unwrap();
        assert_eq!(lock.path(), path);
        assert!(path.exists());
    }

    #[test]
    fn second_acquire_is_busy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".run.lock");

        let _held = RunLock::acquire(&path).unwrap();
        let err = RunLock::acquire(&path).unwrap_err();
        assert!(matches!(err, VerbenaError::LockBusy { .. }));
    }

    #[test]
    fn dropping_the_guard_releases_the_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".run.lock");

        drop(RunLock::acquire(&path).unwrap());
        assert!(RunLock::acquire(&path).is_ok());
    }
}
