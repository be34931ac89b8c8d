//! Manifest retraction and bookkeeping
//!
//! Besides the per-run index, every target carries an `all.idx` sibling that
//! accumulates every content-addressed file ever published to that docroot.
//! The reaper uses it to decide which files are garbage; the operations here
//! keep it in step with the per-run indexes.

use crate::distributor::Target;
use crate::error::{VerbenaError, VerbenaResult};
use crate::fs::FileSystem;
use crate::index::Index;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the all-resources index next to each target index
pub const ALL_INDEX_NAME: &str = "all.idx";

fn all_index_path(index: &Path) -> PathBuf {
    index.with_file_name(ALL_INDEX_NAME)
}

/// Merge a completed run's labels into every target's all-resources index.
///
/// An updated original replaces its all-index entry; the superseded
/// content-addressed file is no longer listed and becomes reapable.
pub fn update_all_indexes<FS: FileSystem>(
    fs: &FS,
    targets: &[Target],
    next: &Index,
) -> VerbenaResult<()> {
    if next.is_empty() {
        return Ok(());
    }
    for target in targets {
        let path = all_index_path(&target.index);
        let mut all = Index::load(fs, &path)?;
        for label in next.iter() {
            all.add(label.clone());
        }
        all.save(fs, &path)?;
    }
    Ok(())
}

/// Retract entries from every target's per-run index and all-index.
///
/// The content-addressed files themselves are left in place; dropping the
/// all-index record is what marks them for the reaper. A path absent from a
/// target's index is skipped with a warning, but a path present in the index
/// and absent from the all-index means the manifests have diverged and the
/// retraction aborts.
///
/// Returns the number of entries removed from the first target.
pub fn remove_entries<FS: FileSystem>(
    fs: &FS,
    targets: &[Target],
    original_paths: &[String],
) -> VerbenaResult<usize> {
    let mut removed_first = 0;
    for (position, target) in targets.iter().enumerate() {
        let mut index = Index::load(fs, &target.index)?;
        let all_path = all_index_path(&target.index);
        let mut all = Index::load(fs, &all_path)?;
        let mut modified = false;

        for original in original_paths {
            let lavendelized = match index.lookup(original) {
                Some(label) => label.lavendelized_path().to_string(),
                None => {
                    warn!(original, index = %target.index.display(), "not published, skipping");
                    continue;
                }
            };
            if !all.remove_reference(&lavendelized) {
                return Err(VerbenaError::InvariantViolation {
                    message: format!(
                        "{} lists {original} but {} has no reference {lavendelized}",
                        target.index.display(),
                        all_path.display()
                    ),
                });
            }
            index.remove_entry(original);
            modified = true;
            info!(original, lavendelized, target = %target.index.display(), "retracted");
            if position == 0 {
                removed_first += 1;
            }
        }

        if modified {
            index.save(fs, &target.index)?;
            all.save(fs, &all_path)?;
        }
    }
    Ok(removed_first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::index::Label;

    fn target(n: usize) -> Target {
        Target::new(
            format!("/host{n}/indexes/web.idx"),
            format!("/host{n}/docroot"),
        )
    }

    fn publish(fs: &MockFileSystem, targets: &[Target], labels: &[Label]) -> Index {
        let mut next = Index::new();
        for label in labels {
            next.add(label.clone());
        }
        for t in targets {
            next.save(fs, &t.index).unwrap();
        }
        update_all_indexes(fs, targets, &next).unwrap();
        next
    }

    #[test]
    fn update_merges_runs_into_all_index() {
        let fs = MockFileSystem::new();
        let targets = vec![target(0)];
        publish(&fs, &targets, &[Label::create("img/a.gif", b"a")]);
        publish(&fs, &targets, &[Label::create("img/b.gif", b"b")]);

        let all = Index::load(&fs, Path::new("/host0/indexes/all.idx")).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn update_replaces_superseded_generation() {
        let fs = MockFileSystem::new();
        let targets = vec![target(0)];
        publish(&fs, &targets, &[Label::create("img/a.gif", b"one")]);
        publish(&fs, &targets, &[Label::create("img/a.gif", b"two")]);

        let all = Index::load(&fs, Path::new("/host0/indexes/all.idx")).unwrap();
        assert_eq!(all.len(), 1);
        let expected = Label::create("img/a.gif", b"two");
        assert_eq!(all.lookup("img/a.gif"), Some(&expected));
    }

    #[test]
    fn update_with_empty_run_creates_nothing() {
        let fs = MockFileSystem::new();
        update_all_indexes(&fs, &[target(0)], &Index::new()).unwrap();
        assert!(!fs.exists(Path::new("/host0/indexes/all.idx")));
    }

    #[test]
    fn remove_entry_retracts_from_both_manifests() {
        let fs = MockFileSystem::new();
        let targets = vec![target(0), target(1)];
        publish(
            &fs,
            &targets,
            &[
                Label::create("img/a.gif", b"a"),
                Label::create("img/b.gif", b"b"),
            ],
        );

        let removed =
            remove_entries(&fs, &targets, &["img/a.gif".to_string()]).unwrap();

        assert_eq!(removed, 1);
        for n in 0..2 {
            let index =
                Index::load(&fs, Path::new(&format!("/host{n}/indexes/web.idx"))).unwrap();
            assert!(index.lookup("img/a.gif").is_none());
            assert!(index.lookup("img/b.gif").is_some());
            let all =
                Index::load(&fs, Path::new(&format!("/host{n}/indexes/all.idx"))).unwrap();
            assert_eq!(all.len(), 1);
        }
    }

    #[test]
    fn remove_unknown_entry_is_skipped() {
        let fs = MockFileSystem::new();
        let targets = vec![target(0)];
        publish(&fs, &targets, &[Label::create("img/a.gif", b"a")]);

        let removed = remove_entries(&fs, &targets, &["img/nope.gif".to_string()]).unwrap();

        assert_eq!(removed, 0);
        let index = Index::load(&fs, Path::new("/host0/indexes/web.idx")).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn missing_all_index_reference_is_an_invariant_violation() {
        let fs = MockFileSystem::new();
        let targets = vec![target(0)];
        // per-run index without a matching all-index
        let mut index = Index::new();
        index.add(Label::create("img/a.gif", b"a"));
        index.save(&fs, &targets[0].index).unwrap();

        let err = remove_entries(&fs, &targets, &["img/a.gif".to_string()]).unwrap_err();

        assert!(matches!(err, VerbenaError::InvariantViolation { .. }));
        // nothing was saved
        let reloaded = Index::load(&fs, &targets[0].index).unwrap();
        assert_eq!(reloaded.len(), 1);
    }
}
