use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use species_network::rng::SimpleRng;

#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic site × species presence table")]
struct Args {
    /// Output file (.csv is semicolon-separated; .parquet is also supported)
    #[arg(default_value = "fish.csv")]
    output: PathBuf,

    /// Number of sampling sites
    #[arg(short = 'n', long, default_value_t = 2000)]
    sites: usize,

    /// Number of species columns
    #[arg(short = 'k', long, default_value_t = 40)]
    species: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// A species' range: presence probability falls off with distance from
/// its centre.
struct Range {
    lon: f64,
    lat: f64,
    sigma: f64,
    peak: f64,
}

impl Range {
    fn probability(&self, lon: f64, lat: f64) -> f64 {
        let d2 = (lon - self.lon).powi(2) + (lat - self.lat).powi(2);
        self.peak * (-d2 / (2.0 * self.sigma.powi(2))).exp()
    }
}

struct Table {
    lon: Vec<f64>,
    lat: Vec<f64>,
    names: Vec<String>,
    /// `presence[k][i]`: species `k` at site `i`.
    presence: Vec<Vec<i64>>,
}

fn generate(args: &Args) -> Table {
    let mut rng = SimpleRng::new(args.seed);

    let ranges: Vec<Range> = (0..args.species)
        .map(|_| Range {
            lon: 100.0 + rng.next_f64() * 120.0,
            lat: -10.0 + rng.next_f64() * 70.0,
            sigma: 5.0 + rng.next_f64() * 20.0,
            peak: 0.3 + rng.next_f64() * 0.6,
        })
        .collect();
    let names = (0..args.species).map(|k| format!("species_{k:03}")).collect();

    // Sites on a jittered 0.5° grid; some share coordinates after rounding.
    let mut lon = Vec::with_capacity(args.sites);
    let mut lat = Vec::with_capacity(args.sites);
    for _ in 0..args.sites {
        let x = (100.0 + rng.next_f64() * 120.0 + rng.gauss(0.0, 0.5)).clamp(100.0, 220.0);
        let y = (-10.0 + rng.next_f64() * 70.0 + rng.gauss(0.0, 0.5)).clamp(-10.0, 60.0);
        lon.push((x * 2.0).round() / 2.0);
        lat.push((y * 2.0).round() / 2.0);
    }

    let presence: Vec<Vec<i64>> = ranges
        .iter()
        .map(|range| {
            lon.iter()
                .zip(&lat)
                .map(|(&x, &y)| i64::from(rng.chance(range.probability(x, y))))
                .collect()
        })
        .collect();

    Table { lon, lat, names, presence }
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec![String::new(), "Longitude".to_string(), "Latitude".to_string()];
    header.extend(table.names.iter().cloned());
    writer.write_record(&header)?;

    for i in 0..table.lon.len() {
        let mut record = vec![i.to_string(), table.lon[i].to_string(), table.lat[i].to_string()];
        record.extend(table.presence.iter().map(|col| col[i].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let mut fields = vec![
        Field::new("Longitude", DataType::Float64, false),
        Field::new("Latitude", DataType::Float64, false),
    ];
    fields.extend(table.names.iter().map(|n| Field::new(n, DataType::Int64, false)));
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(table.lon.clone())),
        Arc::new(Float64Array::from(table.lat.clone())),
    ];
    columns.extend(
        table
            .presence
            .iter()
            .map(|col| Arc::new(Int64Array::from(col.clone())) as ArrayRef),
    );

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let table = generate(&args);
    let is_parquet = args
        .output
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(&table, &args.output)?;
    } else {
        write_csv(&table, &args.output)?;
    }

    log::info!(
        "Wrote {} sites × {} species to {}",
        args.sites,
        args.species,
        args.output.display()
    );
    Ok(())
}
