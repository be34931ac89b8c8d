//! Error types for Verbena
//!
//! Uses `thiserror` for library errors; the binary wraps these with `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Verbena operations
pub type VerbenaResult<T> = Result<T, VerbenaError>;

/// Main error type for Verbena operations
#[derive(Error, Debug)]
pub enum VerbenaError {
    /// Malformed persisted index or unparseable source descriptor.
    /// Always surfaced, never recovered.
    #[error("malformed index entry in {file}:{line}: {message}")]
    Format {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// IO error reading a source or writing a target. No retry happens
    /// inside the core; retry policy belongs to the transport collaborator.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Targets disagree on prior manifest state at open time. Fatal before
    /// any write occurs: picking one target as authoritative would silently
    /// corrupt history.
    #[error("index mismatch: {target} disagrees with {first}")]
    IndexMismatch { first: PathBuf, target: PathBuf },

    /// A prior run or removal left the distributed manifests inconsistent,
    /// e.g. retracting a reference the all-resources index does not contain.
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Another publish run holds the target set's lock.
    #[error("publish lock {path} is held by another run")]
    LockBusy { path: PathBuf },

    /// Invalid cluster configuration file
    #[error("invalid cluster config {file}: {message}")]
    Config { file: PathBuf, message: String },
}
