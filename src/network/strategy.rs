use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::comparator::{EdgeCandidate, compare_row};
use crate::data::model::Dataset;

/// Rows between progress log lines in the sequential scan.
const LOG_EVERY: usize = 500;

/// How the pairwise comparison is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Nested loop on the calling thread.
    Sequential,
    /// One task per row on a rayon pool.
    ///
    /// `threads: None` uses rayon's default (available parallelism).
    #[default]
    Parallel,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::Sequential => write!(f, "sequential"),
            ExecutionStrategy::Parallel => write!(f, "parallel"),
        }
    }
}

impl FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(ExecutionStrategy::Sequential),
            "parallel" | "par" => Ok(ExecutionStrategy::Parallel),
            other => Err(format!("unknown strategy '{other}' (expected sequential or parallel)")),
        }
    }
}

/// Run the comparator over every row and concatenate the candidates.
///
/// Both strategies return candidates grouped by ascending source row, so
/// their output is identical for the same dataset.
pub fn compute_edges(
    dataset: &Dataset,
    strategy: ExecutionStrategy,
    threads: Option<usize>,
    progress: &ProgressBar,
) -> Result<Vec<EdgeCandidate>> {
    let n = dataset.len();
    log::info!("Comparing {n} rows ({strategy})");

    let edges = match strategy {
        ExecutionStrategy::Sequential => sequential(dataset, progress),
        ExecutionStrategy::Parallel => match threads {
            Some(count) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(count)
                    .build()
                    .with_context(|| format!("building a {count}-thread worker pool"))?;
                pool.install(|| parallel(dataset, progress))
            }
            None => parallel(dataset, progress),
        },
    };

    progress.finish_and_clear();
    log::info!("Edges processed: {} candidates", edges.len());
    Ok(edges)
}

fn sequential(dataset: &Dataset, progress: &ProgressBar) -> Vec<EdgeCandidate> {
    let n = dataset.len();
    let mut edges = Vec::new();
    for i in 0..n {
        if i % LOG_EVERY == 0 {
            log::debug!("Processing row {i} of {n}");
        }
        edges.extend(compare_row(dataset, i));
        progress.inc(1);
    }
    edges
}

fn parallel(dataset: &Dataset, progress: &ProgressBar) -> Vec<EdgeCandidate> {
    // Each task owns its row's list; the indexed collect keeps row order.
    let per_row: Vec<Vec<EdgeCandidate>> = (0..dataset.len())
        .into_par_iter()
        .map(|i| {
            let edges = compare_row(dataset, i);
            progress.inc(1);
            edges
        })
        .collect();
    per_row.into_iter().flatten().collect()
}
