//! Content-addressed index manifest
//!
//! An `Index` maps original logical paths to [`Label`]s and is the durable
//! record of one target's publish history. Iteration order is insertion
//! order and is preserved across save/load so manifest files diff cleanly.
//!
//! Persisted form: UTF-8 text, one entry per line as
//! `originalPath=lavendelizedPath\:hexFingerprint`, where `\`, `=`, `:`,
//! `#` and `!` are backslash-escaped in both halves. An optional leading
//! `#` comment line is tolerated on load and re-emitted on save, so a
//! freshly loaded, unmodified index re-saves byte-identically.

mod label;

pub use label::{fingerprint, Fingerprint, Label, FINGERPRINT_LEN};

use crate::error::{VerbenaError, VerbenaResult};
use crate::fs::FileSystem;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Ordered, append-oriented manifest of published resources
#[derive(Debug, Clone, Default)]
pub struct Index {
    comment: Option<String>,
    entries: Vec<Label>,
    by_original: HashMap<String, usize>,
}

impl Index {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an index from a file. A missing file is an empty index, not an
    /// error; a malformed line is a `Format` error.
    pub fn load<FS: FileSystem>(fs: &FS, path: &Path) -> VerbenaResult<Self> {
        if !fs.exists(path) {
            return Ok(Self::new());
        }
        let bytes = fs.read(path)?;
        Self::parse(&bytes, path)
    }

    /// Parse the persisted text form
    pub fn parse(bytes: &[u8], file: &Path) -> VerbenaResult<Self> {
        let content = std::str::from_utf8(bytes).map_err(|_| VerbenaError::Format {
            file: file.to_path_buf(),
            line: 1,
            message: "index is not valid UTF-8".to_string(),
        })?;

        let mut index = Self::new();
        for (number, line) in content.lines().enumerate() {
            let number = number + 1;
            if number == 1 && line.starts_with('#') {
                index.comment = Some(line.to_string());
                continue;
            }
            if line.is_empty() {
                // tolerating blank lines would break the byte-identical
                // re-save of a freshly loaded index
                return Err(VerbenaError::Format {
                    file: file.to_path_buf(),
                    line: number,
                    message: "blank line".to_string(),
                });
            }
            let label = parse_line(line).map_err(|message| VerbenaError::Format {
                file: file.to_path_buf(),
                line: number,
                message,
            })?;
            index.add(label);
        }
        Ok(index)
    }

    /// Save the index in insertion order, creating parent directories as
    /// needed. `load(save(x))` is structurally equal to `x`; if `x` was
    /// itself freshly loaded and unmodified, the bytes are identical.
    pub fn save<FS: FileSystem>(&self, fs: &FS, path: &Path) -> VerbenaResult<()> {
        if let Some(parent) = path.parent() {
            fs.create_dir_all(parent)?;
        }
        fs.write_atomic(path, self.render().as_bytes())
    }

    /// Render the persisted text form
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(comment) = &self.comment {
            out.push_str(comment);
            out.push('\n');
        }
        for label in &self.entries {
            escape_into(label.original_path(), &mut out);
            out.push('=');
            escape_into(label.lavendelized_path(), &mut out);
            out.push_str("\\:");
            out.push_str(&hex::encode(label.fingerprint()));
            out.push('\n');
        }
        out
    }

    /// Look up a label by its original path
    pub fn lookup(&self, original_path: &str) -> Option<&Label> {
        self.by_original
            .get(original_path)
            .map(|&i| &self.entries[i])
    }

    /// Insert or overwrite by original path. A duplicate add with an
    /// identical label is a no-op; a different label replaces the previous
    /// one in place (last write wins within one run).
    pub fn add(&mut self, label: Label) {
        match self.by_original.get(label.original_path()) {
            Some(&i) => self.entries[i] = label,
            None => {
                self.by_original
                    .insert(label.original_path().to_string(), self.entries.len());
                self.entries.push(label);
            }
        }
    }

    /// Remove an entry by original path. Returns true if an entry existed.
    pub fn remove_entry(&mut self, original_path: &str) -> bool {
        match self.by_original.get(original_path).copied() {
            Some(i) => {
                self.remove_at(i);
                true
            }
            None => false,
        }
    }

    /// Remove an entry by content-addressed path, used by the GC/removal
    /// collaborator to retract the record independently of the
    /// original-path key. Returns true if an entry existed.
    pub fn remove_reference(&mut self, lavendelized_path: &str) -> bool {
        match self
            .entries
            .iter()
            .position(|l| l.lavendelized_path() == lavendelized_path)
        {
            Some(i) => {
                self.remove_at(i);
                true
            }
            None => false,
        }
    }

    fn remove_at(&mut self, i: usize) {
        let removed = self.entries.remove(i);
        self.by_original.remove(removed.original_path());
        for slot in self.by_original.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate labels in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.entries.iter()
    }

    /// Structural equality: both indexes contain the same set of
    /// (original, lavendelized, fingerprint) triples, irrespective of
    /// order. This is the cross-host consistency check, deliberately
    /// weaker than byte equality of the persisted form.
    pub fn same_entries(&self, other: &Index) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        let theirs: HashSet<&Label> = other.entries.iter().collect();
        self.entries.iter().all(|l| theirs.contains(l))
    }
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        if matches!(c, '\\' | '=' | ':' | '#' | '!') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn unescape(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    if escaped {
        return Err("trailing escape character".to_string());
    }
    Ok(out)
}

fn parse_line(line: &str) -> Result<Label, String> {
    // key ends at the first unescaped '='
    let mut split = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' {
            split = Some(i);
            break;
        }
    }
    let split = split.ok_or_else(|| "missing '=' separator".to_string())?;
    let original = unescape(&line[..split])?;
    let value = unescape(&line[split + 1..])?;

    // the unescaped value is lavendelizedPath:hexFingerprint
    let (lavendelized, hash) = value
        .rsplit_once(':')
        .ok_or_else(|| "missing ':' fingerprint separator".to_string())?;
    let bytes = hex::decode(hash).map_err(|_| format!("invalid fingerprint hex '{hash}'"))?;
    let fingerprint: Fingerprint = bytes
        .try_into()
        .map_err(|_| format!("fingerprint must be {FINGERPRINT_LEN} bytes"))?;

    Ok(Label::new(original, lavendelized.to_string(), fingerprint))
}
