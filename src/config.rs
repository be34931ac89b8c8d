//! Cluster configuration
//!
//! A cluster file describes the target set one publish run fans out to,
//! plus the URL space the published files are served under. TOML, one file
//! per cluster:
//!
//! ```toml
//! base-url = "http://cdn.example.net"
//! prefix = "/"
//!
//! [[targets]]
//! index = "/var/verbena/indexes/web.idx"
//! docroot = "/var/verbena/docroot"
//! ```

use crate::distributor::Target;
use crate::error::{VerbenaError, VerbenaResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default lock file name, placed next to the first target's index
const LOCK_FILE_NAME: &str = ".verbena.lock";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ClusterConfig {
    /// Base URL rewritten references point at
    pub base_url: String,

    /// Path prefix stripped from absolute references
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Run lock location; defaults to a sibling of the first target's index
    pub lock_file: Option<PathBuf>,

    /// Targets the run fans out to; all must share one manifest history
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TargetConfig {
    pub index: PathBuf,
    pub docroot: PathBuf,
}

fn default_prefix() -> String {
    "/".to_string()
}

impl ClusterConfig {
    pub fn load(path: &Path) -> VerbenaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text).map_err(|err| VerbenaError::Config {
            file: path.to_path_buf(),
            message: err.message().to_string(),
        })?;
        if config.targets.is_empty() {
            return Err(VerbenaError::Config {
                file: path.to_path_buf(),
                message: "at least one target is required".to_string(),
            });
        }
        Ok(config)
    }

    pub fn targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|t| Target::new(&t.index, &t.docroot))
            .collect()
    }

    /// Lock file guarding this cluster's manifests
    pub fn lock_path(&self) -> PathBuf {
        match (&self.lock_file, self.targets.first()) {
            (Some(path), _) => path.clone(),
            (None, Some(first)) => first.index.with_file_name(LOCK_FILE_NAME),
            (None, None) => PathBuf::from(LOCK_FILE_NAME),
        }
    }
}
