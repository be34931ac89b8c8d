//! Resource sources
//!
//! A source produces a finite, restartable sequence of resources to publish.
//! The closed set of variants the surrounding system knows about — archive,
//! plain filesystem, version-controlled checkout, REST-queried repository —
//! all sit behind this one trait; only the filesystem variant lives in this
//! crate, the rest are external collaborators.

use crate::error::VerbenaResult;
use std::path::{Path, PathBuf};

/// One extracted resource: raw bytes plus where they logically came from.
/// Ephemeral; only the derived label and the bytes are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    original_path: String,
    data: Vec<u8>,
    group: String,
}

impl Resource {
    pub fn new(
        original_path: impl Into<String>,
        data: impl Into<Vec<u8>>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            original_path: original_path.into(),
            data: data.into(),
            group: group.into(),
        }
    }

    /// Logical source-relative path, `/`-separated
    pub fn original_path(&self) -> &str {
        &self.original_path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Logical container the resource came from (module, archive, repo)
    pub fn group(&self) -> &str {
        &self.group
    }
}

/// Produces the resources of one logical container.
///
/// `resources` may be called more than once and must yield the same finite
/// sequence each time (restartable).
pub trait Source {
    /// Name of the logical container
    fn group(&self) -> &str;

    /// Enumerate all resources
    fn resources(&self) -> VerbenaResult<Vec<Resource>>;
}

/// Filesystem source: every regular file under a root directory, with
/// original paths relative to that root. Entries are sorted so repeated
/// enumerations and publish runs are deterministic.
pub struct DirectorySource {
    root: PathBuf,
    group: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, group: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            group: group.into(),
        }
    }

    fn collect(&self, dir: &Path, out: &mut Vec<Resource>) -> VerbenaResult<()> {
        let mut entries: Vec<_> =
            std::fs::read_dir(dir)?.collect::<Result<_, std::io::Error>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.collect(&path, out)?;
            } else {
                let relative = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let data = std::fs::read(&path)?;
                out.push(Resource::new(relative, data, self.group.clone()));
            }
        }
        Ok(())
    }
}

impl Source for DirectorySource {
    fn group(&self) -> &str {
        &self.group
    }

    fn resources(&self) -> VerbenaResult<Vec<Resource>> {
        let mut out = Vec::new();
        self.collect(&self.root, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn enumerates_files_relative_to_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img/a.gif"), b"gif").unwrap();
        fs::write(dir.path().join("main.css"), b"body {}").unwrap();

        let source = DirectorySource::new(dir.path(), "web");
        let resources = source.resources().unwrap();

        let paths: Vec<&str> = resources.iter().map(|r| r.original_path()).collect();
        assert_eq!(paths, vec!["img/a.gif", "main.css"]);
        assert!(resources.iter().all(|r| r.group() == "web"));
    }

    #[test]
    fn enumeration_is_restartable() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let source = DirectorySource::new(dir.path(), "web");
        assert_eq!(source.resources().unwrap(), source.resources().unwrap());
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let source = DirectorySource::new("/no/such/dir", "web");
        assert!(source.resources().is_err());
    }
}
