//! Streaming text processors
//!
//! A processor is fed character data in arbitrary chunks and emits rewritten
//! output to its sink incrementally. Feeding may stop at any point; `flush`
//! emits whatever is still buffered, so partial matches at end-of-input are
//! never dropped or corrupted.

mod css;

pub use css::CssProcessor;

use crate::error::VerbenaResult;

/// Single-pass streaming scanner over character data
pub trait Processor {
    /// Feed the next chunk. Chunk boundaries may fall anywhere, including
    /// inside a match pattern.
    fn process(&mut self, chunk: &str) -> VerbenaResult<()>;

    /// Signal end-of-input and emit any trailing buffered content verbatim.
    fn flush(&mut self) -> VerbenaResult<()>;
}
