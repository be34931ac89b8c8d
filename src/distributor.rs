//! Multi-target incremental distributor
//!
//! Receives labeled resources and writes them to every configured target,
//! consulting the previous run's index to skip unchanged content and
//! accumulating the next index as it goes. A distributor is a two-state
//! machine: it accepts writes while open, and `close` (which consumes it)
//! persists the next index to every target.
//!
//! The distributor exclusively owns `prev` and `next` for the duration of a
//! run; no other component sees `next` until `close` returns it.

use crate::error::{VerbenaError, VerbenaResult};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::index::{Index, Label};
use std::path::PathBuf;
use tracing::debug;

/// One host/origin to publish to: an index file location plus a document
/// root. Resolved once at open time and held for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub index: PathBuf,
    pub docroot: PathBuf,
}

impl Target {
    pub fn new(index: impl Into<PathBuf>, docroot: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            docroot: docroot.into(),
        }
    }
}

/// Distributor in the open state, accepting writes
#[derive(Debug)]
pub struct Distributor<FS: FileSystem = LocalFileSystem> {
    targets: Vec<Target>,
    prev: Index,
    next: Index,
    fs: FS,
}

impl Distributor<LocalFileSystem> {
    /// Open a distributor over the local file system
    pub fn open(targets: Vec<Target>) -> VerbenaResult<Self> {
        Self::open_with_fs(targets, LocalFileSystem)
    }
}

impl<FS: FileSystem> Distributor<FS> {
    /// Load every target's prior index (missing file means empty) and check
    /// that all targets agree on it. Divergent prior indexes abort the run
    /// before any write: the distributor cannot reconcile divergent
    /// histories and must not silently pick one.
    pub fn open_with_fs(targets: Vec<Target>, fs: FS) -> VerbenaResult<Self> {
        let mut prev: Option<(Index, PathBuf)> = None;
        for target in &targets {
            let loaded = Index::load(&fs, &target.index)?;
            match &prev {
                None => prev = Some((loaded, target.index.clone())),
                Some((first, first_path)) => {
                    if !first.same_entries(&loaded) {
                        return Err(VerbenaError::IndexMismatch {
                            first: first_path.clone(),
                            target: target.index.clone(),
                        });
                    }
                }
            }
        }
        Ok(Self {
            targets,
            prev: prev.map(|(index, _)| index).unwrap_or_default(),
            next: Index::new(),
            fs,
        })
    }

    /// Write one labeled resource to every target.
    ///
    /// Returns true if content was written (add or update), false if the
    /// previous run already published identical content under this original
    /// path. The label always enters the next index. An updated resource's
    /// old content-addressed file is left in place for GC: pages still
    /// referencing the old URL during a rollout window must keep working.
    ///
    /// If a target write fails partway through the fan-out, the whole
    /// operation fails and the run must be treated as failed; already
    /// written targets are healed by re-running (content-addressed writes
    /// are idempotent).
    pub fn write(&mut self, label: Label, data: &[u8]) -> VerbenaResult<bool> {
        let changed = match self.prev.lookup(label.original_path()) {
            None => {
                debug!(original = label.original_path(), "add");
                self.fan_out(&label, data)?;
                true
            }
            Some(previous) if previous.fingerprint() != label.fingerprint() => {
                debug!(original = label.original_path(), "update");
                self.fan_out(&label, data)?;
                true
            }
            Some(_) => false,
        };
        self.next.add(label);
        Ok(changed)
    }

    fn fan_out(&self, label: &Label, data: &[u8]) -> VerbenaResult<()> {
        for target in &self.targets {
            let dest = target.docroot.join(label.lavendelized_path());
            if let Some(parent) = dest.parent() {
                self.fs.create_dir_all(parent)?;
            }
            self.fs.write_atomic(&dest, data)?;
        }
        Ok(())
    }

    /// Number of writes accepted so far
    pub fn pending(&self) -> usize {
        self.next.len()
    }

    /// Persist the next index to every target and return it.
    ///
    /// An empty run is a deliberate no-op that leaves every target manifest
    /// untouched: a source that yielded nothing must not truncate the
    /// published history. A failure partway through leaves targets with
    /// divergent manifests; the next run's open-time mismatch check is the
    /// designed detection mechanism.
    pub fn close(self) -> VerbenaResult<Index> {
        if self.next.is_empty() {
            return Ok(self.next);
        }
        for target in &self.targets {
            self.next.save(&self.fs, &target.index)?;
        }
        Ok(self.next)
    }
}
