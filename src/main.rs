//! species-network CLI
//!
//! Usage:
//!   species-network                              # fish.csv → fish_network.gml.gz
//!   species-network -i sites.csv -o net.gml.gz   # explicit paths
//!   species-network --pacific-preset --plot      # reduced window, then show it
//!   species-network --view net.gml.gz            # only display an existing network

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use species_network::data::filter::BoundingBox;
use species_network::{ExecutionStrategy, PipelineConfig, SelfLoopPolicy, app, read_gml, run};

#[derive(Parser)]
#[command(name = "species-network")]
#[command(version)]
#[command(about = "Build a species co-occurrence network from a site table")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input table (.csv, .json or .parquet)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output GML file (gzip-compressed when it ends in .gz)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Field separator of delimited input
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Extra non-species column to ignore (repeatable)
    #[arg(long = "exclude", value_name = "COLUMN")]
    exclude: Vec<String>,

    /// Bounding box as MIN_LON,MAX_LON,MIN_LAT,MAX_LAT (exclusive)
    #[arg(long, value_name = "BOX", value_delimiter = ',', num_args = 4, allow_hyphen_values = true)]
    bbox: Option<Vec<f64>>,

    /// Restrict to the north-western Pacific window (131<lon<194, 17<lat<48)
    #[arg(long, conflicts_with = "bbox")]
    pacific_preset: bool,

    /// sequential or parallel
    #[arg(short, long)]
    strategy: Option<ExecutionStrategy>,

    /// Worker threads for the parallel strategy
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Record edges between rows with identical coordinates
    #[arg(long)]
    keep_self_loops: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Write run statistics as JSON
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Show the laid-out network after building it
    #[arg(long)]
    plot: bool,

    /// Display an existing GML file instead of building one
    #[arg(long, value_name = "FILE", conflicts_with = "plot")]
    view: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<(PipelineConfig, Option<PathBuf>, bool)> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok((config, self.summary, self.plot))
    }

    /// Flags win over whatever the config file set.
    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if self.delimiter.is_some() {
            config.loader.delimiter = self.delimiter;
        }
        config.loader.excluded_columns.extend(self.exclude.iter().cloned());
        if let Some(&[min_longitude, max_longitude, min_latitude, max_latitude]) = self.bbox.as_deref() {
            config.bbox = Some(BoundingBox {
                min_longitude,
                max_longitude,
                min_latitude,
                max_latitude,
            });
        }
        if self.pacific_preset {
            config.bbox = Some(BoundingBox::PACIFIC);
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.keep_self_loops {
            config.self_loops = SelfLoopPolicy::Keep;
        }
        if self.no_progress {
            config.progress = false;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cli = Cli::parse();

    if let Some(path) = cli.view.take() {
        let layout = match &cli.config {
            Some(config) => PipelineConfig::from_json_file(config)?.layout,
            None => PipelineConfig::default().layout,
        };
        let graph = read_gml(&path)?;
        return app::show(graph, layout);
    }

    let (config, summary_path, plot) = cli.into_config()?;
    let (graph, summary) = run(&config)?;

    log::info!(
        "Done in {} ms: {} of {} rows compared, {} candidates, {} nodes, {} edges",
        summary.elapsed_ms,
        summary.rows_compared,
        summary.rows_loaded,
        summary.candidates,
        summary.nodes,
        summary.edges
    );
    if let Some(path) = summary_path {
        summary.write_json(&path)?;
    }

    if plot {
        app::show(graph, config.layout)?;
    }
    Ok(())
}
