//! Publishing engine
//!
//! Thin driver that pulls resources from a source, rewrites textual assets
//! through the scanning processor, and feeds everything to the distributor.
//!
//! Binary resources are labeled in a first pass so a CSS reference to an
//! image published in the same run resolves; textual resources are then
//! rewritten and labeled from the rewritten bytes, because rewriting changes
//! the content the fingerprint must describe.

use crate::distributor::Distributor;
use crate::error::VerbenaResult;
use crate::fs::FileSystem;
use crate::index::{Index, Label};
use crate::processor::{CssProcessor, Processor};
use crate::rewrite::IndexRewriteEngine;
use crate::source::{Resource, Source};
use std::borrow::Cow;
use tracing::{info, warn};

/// Options for one publish run
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Base URL the content-addressed paths are served under
    pub base_url: String,
    /// Path prefix stripped from absolute references in text assets
    pub prefix: String,
}

/// Outcome of one publish run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishStats {
    /// Resources written (added or updated)
    pub changed: usize,
    /// Resources skipped because the previous run published identical content
    pub unchanged: usize,
    /// Bytes transferred per target
    pub bytes_written: u64,
}

/// Drives one open → write* → close cycle of a distributor
pub struct PublishEngine<FS: FileSystem> {
    distributor: Distributor<FS>,
    options: PublishOptions,
}

impl<FS: FileSystem> PublishEngine<FS> {
    pub fn new(distributor: Distributor<FS>, options: PublishOptions) -> Self {
        Self {
            distributor,
            options,
        }
    }

    /// Publish every resource of `source`, returning the persisted next
    /// index and the run statistics.
    pub fn run(mut self, source: &dyn Source) -> VerbenaResult<(Index, PublishStats)> {
        let resources = source.resources()?;
        info!(group = source.group(), count = resources.len(), "publishing");

        // pass 1: label binary resources so same-run references resolve
        let mut run_index = Index::new();
        for resource in &resources {
            if !is_textual(resource.original_path()) {
                run_index.add(Label::create(resource.original_path(), resource.data()));
            }
        }

        // pass 2: rewrite text, then distribute everything
        let mut stats = PublishStats::default();
        for resource in &resources {
            let data: Cow<[u8]> = if is_textual(resource.original_path()) {
                Cow::Owned(self.rewrite(resource, &run_index)?)
            } else {
                Cow::Borrowed(resource.data())
            };
            let label = Label::create(resource.original_path(), &data);
            let changed = self.distributor.write(label, &data)?;
            if changed {
                stats.changed += 1;
                stats.bytes_written += data.len() as u64;
            } else {
                stats.unchanged += 1;
            }
        }

        let next = self.distributor.close()?;
        info!(
            changed = stats.changed,
            unchanged = stats.unchanged,
            bytes = stats.bytes_written,
            "publish run complete"
        );
        Ok((next, stats))
    }

    fn rewrite(&self, resource: &Resource, run_index: &Index) -> VerbenaResult<Vec<u8>> {
        let text = match std::str::from_utf8(resource.data()) {
            Ok(text) => text,
            Err(_) => {
                warn!(
                    original = resource.original_path(),
                    "text asset is not valid UTF-8, publishing unrewritten"
                );
                return Ok(resource.data().to_vec());
            }
        };
        let engine = IndexRewriteEngine::new(vec![run_index], &self.options.base_url);
        let mut processor = CssProcessor::new(
            &engine,
            resource.original_path(),
            &self.options.prefix,
            Vec::new(),
        );
        processor.process(text)?;
        processor.flush()?;
        Ok(processor.into_inner())
    }
}

/// Textual assets get their references rewritten; everything else is
/// published byte-for-byte.
fn is_textual(original_path: &str) -> bool {
    original_path.ends_with(".css")
}
