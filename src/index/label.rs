//! Label value object and hash labeler
//!
//! A label binds a resource's original logical path to its content-addressed
//! ("lavendelized") storage path and its content fingerprint. Labels are
//! created once per (path, content) pair and never mutated.

use md5::{Digest, Md5};
use std::fmt;

/// Width of the content fingerprint in bytes (MD5)
pub const FINGERPRINT_LEN: usize = 16;

/// Content fingerprint, fixed width
pub type Fingerprint = [u8; FINGERPRINT_LEN];

/// Immutable record binding an original resource path to its
/// content-addressed path and content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    original_path: String,
    lavendelized_path: String,
    fingerprint: Fingerprint,
}

impl Label {
    /// Create a label from already-known parts (e.g. a parsed index line)
    pub fn new(
        original_path: impl Into<String>,
        lavendelized_path: impl Into<String>,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            original_path: original_path.into(),
            lavendelized_path: lavendelized_path.into(),
            fingerprint,
        }
    }

    /// Label a byte blob: compute its fingerprint and derive the
    /// content-addressed path from the fingerprint and the base file name.
    ///
    /// Deterministic, pure function of `data` and the base name portion of
    /// `original_path`. The path is sharded by hash prefix so no target
    /// directory accumulates an unbounded number of files.
    pub fn create(original_path: impl Into<String>, data: &[u8]) -> Self {
        let original_path = original_path.into();
        let fingerprint = fingerprint(data);
        let lavendelized_path = lavendelize(&original_path, &fingerprint);
        Self {
            original_path,
            lavendelized_path,
            fingerprint,
        }
    }

    /// Original logical source-relative path, e.g. `modules/x/img/close.gif`
    pub fn original_path(&self) -> &str {
        &self.original_path
    }

    /// Content-addressed storage path
    pub fn lavendelized_path(&self) -> &str {
        &self.lavendelized_path
    }

    /// Content fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [{}]",
            self.original_path,
            self.lavendelized_path,
            hex::encode(self.fingerprint)
        )
    }
}

/// Compute the MD5 fingerprint of a byte blob
pub fn fingerprint(data: &[u8]) -> Fingerprint {
    Md5::digest(data).into()
}

/// Derive the sharded content-addressed path: the first three hex digits of
/// the fingerprint become the shard directory, the remainder the second
/// level, and the file itself keeps the original base name prefixed with the
/// full hash.
///
/// Identical (base name, fingerprint) pairs always map to the identical
/// stored path; a digest collision under the same base name therefore maps
/// distinct content to one path. That is accepted as cryptographically
/// negligible, matching the "unchanged" detection in the distributor.
fn lavendelize(original_path: &str, fingerprint: &Fingerprint) -> String {
    let hash = hex::encode(fingerprint);
    let name = original_path.rsplit('/').next().unwrap_or(original_path);
    format!("{}/{}/{}-{}", &hash[..3], &hash[3..], hash, name)
}
