use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::BoundingBox;
use crate::data::loader::LoaderConfig;
use crate::layout::LayoutParams;
use crate::network::{ExecutionStrategy, SelfLoopPolicy};

/// Everything one run of the pipeline needs.
///
/// Every field has a default, so a JSON config file only lists what it
/// changes:
///
/// ```json
/// { "input": "fish.csv", "bbox": { "min_longitude": 131, "max_longitude": 194,
///   "min_latitude": 17, "max_latitude": 48 }, "strategy": "sequential" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub loader: LoaderConfig,
    /// Restrict comparison to sites inside this window.
    pub bbox: Option<BoundingBox>,
    pub strategy: ExecutionStrategy,
    /// Worker count for the parallel strategy; `None` = available cores.
    pub threads: Option<usize>,
    pub self_loops: SelfLoopPolicy,
    /// Show a progress bar on stderr while comparing.
    pub progress: bool,
    pub layout: LayoutParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("fish.csv"),
            output: PathBuf::from("fish_network.gml.gz"),
            loader: LoaderConfig::default(),
            bbox: None,
            strategy: ExecutionStrategy::default(),
            threads: None,
            self_loops: SelfLoopPolicy::default(),
            progress: true,
            layout: LayoutParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }
}
