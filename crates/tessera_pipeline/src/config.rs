//! Pipeline configuration.
//!
//! ```toml
//! worker_threads = 8
//! determinism_log = true
//! hash_log_path = "hashes.tsv"
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Runtime settings for one pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pool size; `None` or zero means hardware parallelism.
    pub worker_threads: Option<usize>,
    /// Record a content hash for every completed node.
    pub determinism_log: bool,
    /// Write the determinism log here when `join` returns.
    pub hash_log_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Toml`] for malformed input or unknown keys.
    pub fn from_toml_str(source: &str) -> PipelineResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] when the file cannot be read and
    /// [`PipelineError::Toml`] when it does not parse.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Same settings with a fixed pool size.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_threads = Some(workers);
        self
    }

    /// Same settings with hashing switched on.
    #[must_use]
    pub fn with_determinism_log(mut self) -> Self {
        self.determinism_log = true;
        self
    }

    /// Effective pool size.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        match self.worker_threads {
            Some(n) if n > 0 => n,
            _ => num_cpus::get().max(1),
        }
    }

    /// Whether completed nodes are hashed.
    #[must_use]
    pub fn hashing_enabled(&self) -> bool {
        self.determinism_log || self.hash_log_path.is_some()
    }
}
