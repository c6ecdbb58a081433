//! Run configuration, read from a JSON run file.
//!
//! ```json
//! {
//!   "samples": "processed.parquet",
//!   "vectors": "vectors.json",
//!   "mode": "full"
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::integrity::CheckMode;

/// Vectors examined between checkpoint log lines.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10_000;
/// Processed vectors classified per experiment.
pub const DEFAULT_MAX_VECTORS: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Sample-vector file for the scale check (`.parquet`, `.json`, `.csv`).
    pub samples: Option<PathBuf>,
    /// Encoded-vector file for the integrity check (`.json`).
    pub vectors: Option<PathBuf>,
    /// Where repaired vectors are saved; defaults to `vectors`.
    pub vectors_out: Option<PathBuf>,
    pub scale_report: PathBuf,
    pub mode: CheckMode,
    pub checkpoint_interval: usize,
    pub max_vectors_per_experiment: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            samples: None,
            vectors: None,
            vectors_out: None,
            scale_report: PathBuf::from("scale.info.txt"),
            mode: CheckMode::StringOnly,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            max_vectors_per_experiment: DEFAULT_MAX_VECTORS,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading run file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing run file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(text)?;
        Ok(config)
    }

    /// Destination for repaired vectors, if an integrity check is configured.
    pub fn vectors_destination(&self) -> Option<&Path> {
        self.vectors_out.as_deref().or(self.vectors.as_deref())
    }
}
