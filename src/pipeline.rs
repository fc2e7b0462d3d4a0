//! Batch pipeline: load → (filter) → compare → assemble → export.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data::filter::filter_rows;
use crate::data::loader::load_file;
use crate::data::model::Dataset;
use crate::export::write_gml;
use crate::network::{CooccurrenceGraph, assemble, compute_edges};

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub rows_loaded: usize,
    /// Rows left after the bounding box (equal to `rows_loaded` without one).
    pub rows_compared: usize,
    pub empty_rows: usize,
    pub feature_columns: usize,
    pub candidates: usize,
    pub nodes: usize,
    pub edges: usize,
    pub overwritten_edges: usize,
    pub self_loops_skipped: usize,
    pub elapsed_ms: u128,
}

impl RunSummary {
    /// Write the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing run summary")?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}

/// Compute the co-occurrence graph of an already-loaded dataset.
///
/// Applies the configured bounding box, runs the comparison with the
/// configured strategy and folds the candidates into a graph.
pub fn build_graph(
    dataset: &Dataset,
    config: &PipelineConfig,
    progress: &ProgressBar,
) -> Result<(CooccurrenceGraph, RunSummary)> {
    let started = Instant::now();

    let filtered;
    let working = match &config.bbox {
        Some(bbox) => {
            filtered = filter_rows(dataset, bbox);
            log::info!("Filtered dataset contains {} rows.", filtered.len());
            &filtered
        }
        None => dataset,
    };

    progress.set_length(working.len() as u64);
    let candidates = compute_edges(working, config.strategy, config.threads, progress)?;
    let (graph, stats) = assemble(working, &candidates, config.self_loops);

    let summary = RunSummary {
        rows_loaded: dataset.len(),
        rows_compared: working.len(),
        empty_rows: working.empty_row_count(),
        feature_columns: working.feature_columns.len(),
        candidates: candidates.len(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        overwritten_edges: stats.overwritten,
        self_loops_skipped: stats.self_loops_skipped,
        elapsed_ms: started.elapsed().as_millis(),
    };
    log::info!(
        "Graph created with {} nodes and {} edges",
        summary.nodes,
        summary.edges
    );
    Ok((graph, summary))
}

/// Run the whole batch: load the input, build the graph and write it out.
pub fn run(config: &PipelineConfig) -> Result<(CooccurrenceGraph, RunSummary)> {
    log::info!("Loading data from {}...", config.input.display());
    let dataset = load_file(&config.input, &config.loader)?;

    let progress = progress_bar(config.progress)?;
    let (graph, summary) = build_graph(&dataset, config, &progress)?;

    write_gml(&graph, &config.output)?;
    Ok((graph, summary))
}

/// Row-level progress bar, or a hidden one when disabled.
pub fn progress_bar(enabled: bool) -> Result<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.cyan} [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} rows ({eta})")
            .context("building progress style")?
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::BoundingBox;
    use crate::data::model::{FeatureSet, ObservationRow};

    #[test]
    fn summary_counts_filtered_rows() {
        let sp = FeatureSet::from_flags(&[true]);
        let ds = Dataset::new(
            vec![
                ObservationRow::new(150.0, 20.0, sp.clone()),
                ObservationRow::new(0.0, 0.0, sp.clone()),
                ObservationRow::new(160.0, 30.0, sp),
            ],
            vec!["sp".into()],
        );
        let config = PipelineConfig {
            bbox: Some(BoundingBox::PACIFIC),
            progress: false,
            ..PipelineConfig::default()
        };
        let (graph, summary) = build_graph(&ds, &config, &ProgressBar::hidden()).unwrap();
        assert_eq!(summary.rows_loaded, 3);
        assert_eq!(summary.rows_compared, 2);
        assert_eq!(summary.candidates, 1);
        assert_eq!(graph.weight("150_20", "160_30"), Some(1));
        assert!(!graph.contains_node("0_0"));
    }

    #[test]
    fn summary_serializes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        RunSummary { nodes: 2, ..RunSummary::default() }.write_json(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["nodes"], 2);
    }
}
