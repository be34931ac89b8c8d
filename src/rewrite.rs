//! Reference rewriting
//!
//! The rewrite engine answers one question for the scanning processor: given
//! a reference found inside a text asset, the original path of the asset
//! containing it, and the configured path prefix, what content-addressed URL
//! should replace it? `None` means "not tracked, leave the reference
//! untouched".

use crate::index::Index;

/// Resolver consulted for every embedded reference found while scanning.
///
/// Pure with respect to the index state at call time.
pub trait RewriteEngine {
    /// Resolve `reference` as found in the asset at `base` (its original
    /// path) under the configured path `prefix`. Returns the substitute URL,
    /// or `None` to leave the reference as-is.
    fn rewrite(&self, reference: &str, base: &str, prefix: &str) -> Option<String>;
}

/// Rewrite engine backed by the indexes built during the current publish
/// run, so a reference to a resource published earlier in the same run
/// resolves.
pub struct IndexRewriteEngine<'a> {
    indexes: Vec<&'a Index>,
    base_url: &'a str,
}

impl<'a> IndexRewriteEngine<'a> {
    pub fn new(indexes: Vec<&'a Index>, base_url: &'a str) -> Self {
        Self { indexes, base_url }
    }
}

impl RewriteEngine for IndexRewriteEngine<'_> {
    fn rewrite(&self, reference: &str, base: &str, prefix: &str) -> Option<String> {
        let reference = trim_quotes(reference.trim());
        if reference.is_empty() || is_external(reference) {
            return None;
        }
        let original = resolve_reference(reference, base, prefix)?;
        for index in &self.indexes {
            if let Some(label) = index.lookup(&original) {
                return Some(format!(
                    "{}/{}",
                    self.base_url.trim_end_matches('/'),
                    label.lavendelized_path()
                ));
            }
        }
        None
    }
}

/// Strip one pair of matching single or double quotes
fn trim_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// References that already point outside the resource set are never rewritten
fn is_external(reference: &str) -> bool {
    reference.contains("://") || reference.starts_with("data:") || reference.starts_with('#')
}

/// Map a reference to the original logical path used as index key.
///
/// Absolute references are resolved against the configured prefix; relative
/// references against the directory of the referencing asset. References
/// escaping the resource root resolve to `None`.
fn resolve_reference(reference: &str, base: &str, prefix: &str) -> Option<String> {
    let joined = match reference.strip_prefix('/') {
        Some(absolute) => {
            let prefix = prefix.trim_matches('/');
            if prefix.is_empty() {
                absolute.to_string()
            } else {
                absolute.strip_prefix(prefix)?.trim_start_matches('/').to_string()
            }
        }
        None => {
            let dir = match base.rsplit_once('/') {
                Some((dir, _)) => dir,
                None => "",
            };
            if dir.is_empty() {
                reference.to_string()
            } else {
                format!("{dir}/{reference}")
            }
        }
    };
    normalize(&joined)
}

/// Collapse `.` and `..` segments; popping past the root yields `None`
fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    Some(segments.join("/"))
}
