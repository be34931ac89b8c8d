//! Verbena - content-addressed static asset publisher
//!
//! Verbena takes the static assets of a web application, renames each one to
//! a content-addressed path derived from its MD5 fingerprint, rewrites the
//! references inside CSS to the renamed locations, and distributes the
//! result to a cluster of CDN origin docroots. Because the published name
//! changes exactly when the content changes, the published files can be
//! served with unbounded cache lifetimes, and repeat publish runs transfer
//! only what actually changed.
//!
//! The pipeline, end to end:
//!
//! 1. a [`source::Source`] enumerates raw resources,
//! 2. [`index::Label`] fingerprints each one and derives its published path,
//! 3. the [`processor::CssProcessor`] rewrites `url(...)` references through
//!    a [`rewrite::RewriteEngine`],
//! 4. the [`distributor::Distributor`] writes changed content to every
//!    target and persists the run's [`index::Index`] manifest,
//! 5. [`gc`] keeps each target's all-resources index current so an external
//!    reaper can collect superseded files.

pub mod config;
pub mod distributor;
pub mod engine;
pub mod error;
pub mod fs;
pub mod gc;
pub mod index;
pub mod lock;
pub mod processor;
pub mod rewrite;
pub mod source;

pub use config::ClusterConfig;
pub use distributor::{Distributor, Target};
pub use engine::{PublishEngine, PublishOptions, PublishStats};
pub use error::{VerbenaError, VerbenaResult};
pub use index::{Index, Label};
pub use lock::RunLock;
pub use source::{DirectorySource, Source};
