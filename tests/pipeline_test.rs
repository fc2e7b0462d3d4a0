//! End-to-end runs of the batch pipeline through files on disk.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use flate2::read::GzDecoder;
use parquet::arrow::ArrowWriter;
use pretty_assertions::assert_eq;
use species_network::data::filter::BoundingBox;
use species_network::{
    ExecutionStrategy, LoaderConfig, PipelineConfig, SelfLoopPolicy, load_file, read_gml, run,
};

fn write(path: &Path, text: &str) {
    std::fs::write(path, text).unwrap();
}

fn config_for(dir: &Path, input: &str) -> PipelineConfig {
    PipelineConfig {
        input: dir.join(input),
        output: dir.join("network.gml.gz"),
        progress: false,
        ..PipelineConfig::default()
    }
}

#[test]
fn three_site_example() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("fish.csv"),
        ";Longitude;Latitude;a;b\n0;1;1;1;0\n1;2;2;1;1\n2;3;3;0;0\n",
    );
    let config = config_for(dir.path(), "fish.csv");

    let (graph, summary) = run(&config).unwrap();
    assert_eq!(
        graph.weighted_pairs(),
        vec![("1_1".to_string(), "2_2".to_string(), 1)]
    );
    assert!(!graph.contains_node("3_3"));
    assert_eq!(summary.rows_loaded, 3);
    assert_eq!(summary.empty_rows, 1);

    // The file on disk is gzip and holds the same graph.
    let mut text = String::new();
    GzDecoder::new(std::fs::File::open(&config.output).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    assert!(text.contains("label \"1_1\""));
    assert!(!text.contains("3_3"));
    assert_eq!(read_gml(&config.output).unwrap(), graph);
}

#[test]
fn rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("sites.csv"),
        "Longitude;Latitude;x;y;z\n1;1;1;1;0\n1;1;0;1;1\n2;5;1;0;1\n3;3;1;1;1\n",
    );
    let config = config_for(dir.path(), "sites.csv");

    let (_, _) = run(&config).unwrap();
    let first = read_gml(&config.output).unwrap();
    let (_, _) = run(&config).unwrap();
    let second = read_gml(&config.output).unwrap();

    assert_eq!(first.nodes(), second.nodes());
    assert_eq!(first.weighted_pairs(), second.weighted_pairs());
}

#[test]
fn strategies_write_identical_graphs() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::from("Longitude;Latitude;s0;s1;s2;s3\n");
    for i in 0..60 {
        let flags: Vec<String> = (0..4).map(|k| ((i * 7 + k * 3) % 5 < 2) as u8).map(|f| f.to_string()).collect();
        text.push_str(&format!("{};{};{}\n", i % 13, i % 7, flags.join(";")));
    }
    write(&dir.path().join("grid.csv"), &text);

    let sequential = PipelineConfig {
        strategy: ExecutionStrategy::Sequential,
        ..config_for(dir.path(), "grid.csv")
    };
    let parallel = PipelineConfig {
        strategy: ExecutionStrategy::Parallel,
        threads: Some(4),
        output: dir.path().join("parallel.gml"),
        ..config_for(dir.path(), "grid.csv")
    };

    let (seq_graph, seq_summary) = run(&sequential).unwrap();
    let (par_graph, par_summary) = run(&parallel).unwrap();
    assert_eq!(seq_graph, par_graph);
    assert_eq!(seq_summary.candidates, par_summary.candidates);
    assert_eq!(read_gml(&parallel.output).unwrap(), par_graph);
}

#[test]
fn filter_keeps_in_box_edges() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("ocean.csv"),
        "Longitude;Latitude;tuna;cod;eel\n\
         150;20;1;0;1\n\
         160;30;1;1;0\n\
         10;60;1;1;1\n\
         170;40;0;1;1\n\
         131;30;1;1;1\n",
    );
    let full = config_for(dir.path(), "ocean.csv");
    let boxed = PipelineConfig {
        bbox: Some(BoundingBox::PACIFIC),
        output: dir.path().join("boxed.gml.gz"),
        ..config_for(dir.path(), "ocean.csv")
    };

    let (full_graph, _) = run(&full).unwrap();
    let (boxed_graph, summary) = run(&boxed).unwrap();
    assert_eq!(summary.rows_compared, 3);

    let inside = |id: &str| ["150_20", "160_30", "170_40"].contains(&id);
    let expected: Vec<_> = full_graph
        .weighted_pairs()
        .into_iter()
        .filter(|(a, b, _)| inside(a.as_str()) && inside(b.as_str()))
        .collect();
    assert_eq!(boxed_graph.weighted_pairs(), expected);
}

#[test]
fn empty_window_gives_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("far.csv"), "Longitude;Latitude;sp\n0;0;1\n1;1;1\n");
    let config = PipelineConfig {
        bbox: Some(BoundingBox::PACIFIC),
        ..config_for(dir.path(), "far.csv")
    };

    let (graph, summary) = run(&config).unwrap();
    assert!(graph.is_empty());
    assert_eq!(summary.rows_compared, 0);
    assert!(read_gml(&config.output).unwrap().is_empty());
}

#[test]
fn duplicate_coordinates_follow_last_write() {
    let dir = tempfile::tempdir().unwrap();
    // Rows 0 and 1 share a site; the pair (1, 2) is emitted after (0, 2).
    write(
        &dir.path().join("dup.csv"),
        "Longitude;Latitude;a;b;c\n5;5;1;1;1\n5;5;1;0;0\n6;6;1;1;1\n",
    );
    let config = config_for(dir.path(), "dup.csv");

    let (graph, summary) = run(&config).unwrap();
    assert_eq!(graph.weight("5_5", "6_6"), Some(1));
    assert_eq!(summary.overwritten_edges, 1);
    assert_eq!(summary.self_loops_skipped, 1);
    assert_eq!(graph.weight("5_5", "5_5"), None);

    let keep = PipelineConfig {
        self_loops: SelfLoopPolicy::Keep,
        ..config
    };
    let (graph, _) = run(&keep).unwrap();
    assert_eq!(graph.weight("5_5", "5_5"), Some(1));
}

#[test]
fn malformed_input_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("bad.csv"), "Longitude;Latitude;sp\n1;1;1\n2;2;x\n");
    let config = config_for(dir.path(), "bad.csv");

    let err = run(&config).unwrap_err();
    assert!(format!("{err:#}").contains("invalid presence flag 'x'"));
    assert!(!config.output.exists());
}

#[test]
fn loads_parquet_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sites.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("Longitude", DataType::Float64, false),
        Field::new("Latitude", DataType::Float64, false),
        Field::new("b", DataType::Boolean, false),
        Field::new("a", DataType::Int32, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
        Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
        Arc::new(BooleanArray::from(vec![false, true, false])),
        Arc::new(Int32Array::from(vec![1, 1, 0])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let ds = load_file(&path, &LoaderConfig::default()).unwrap();
    assert_eq!(ds.feature_columns, vec!["a", "b"]);
    assert_eq!(ds.species_of(1), vec!["a", "b"]);
    assert!(ds.rows[2].features.is_empty());

    let config = config_for(dir.path(), "sites.parquet");
    let (graph, _) = run(&config).unwrap();
    assert_eq!(
        graph.weighted_pairs(),
        vec![("1_1".to_string(), "2_2".to_string(), 1)]
    );
}

#[test]
fn json_config_drives_a_run() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("sites.tsv"),
        "site\tlon\tlat\tp\tq\nA\t1\t1\t1\t1\nB\t2\t2\t1\t1\n",
    );
    let output = dir.path().join("out.gml");
    let config_path = dir.path().join("run.json");
    let config_json = serde_json::json!({
        "input": dir.path().join("sites.tsv"),
        "output": output,
        "progress": false,
        "strategy": "sequential",
        "loader": {
            "delimiter": "\t",
            "longitude_column": "lon",
            "latitude_column": "lat",
            "excluded_columns": ["site"]
        }
    });
    write(&config_path, &config_json.to_string());

    let config = PipelineConfig::from_json_file(&config_path).unwrap();
    let (graph, _) = run(&config).unwrap();
    assert_eq!(graph.weight("1_1", "2_2"), Some(2));

    // Uncompressed output when the name has no .gz suffix.
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("graph ["));
}

#[test]
fn pandas_index_column_is_not_a_species() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("indexed.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("Longitude", DataType::Float64, false),
        Field::new("Latitude", DataType::Float64, false),
        Field::new("a", DataType::Int32, false),
        Field::new("b", DataType::Int32, false),
        Field::new("__index_level_0__", DataType::Int32, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(vec![1.0, 2.0])),
        Arc::new(Float64Array::from(vec![1.0, 2.0])),
        Arc::new(Int32Array::from(vec![1, 0])),
        Arc::new(Int32Array::from(vec![0, 1])),
        Arc::new(Int32Array::from(vec![4, 9])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let ds = load_file(&path, &LoaderConfig::default()).unwrap();
    assert_eq!(ds.feature_columns, vec!["a", "b"]);

    let (graph, _) = run(&config_for(dir.path(), "indexed.parquet")).unwrap();
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn tab_separated_input_needs_no_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("sites.tsv"),
        "Longitude\tLatitude\tp\tq\n1\t1\t1\t1\n2\t2\t0\t1\n",
    );
    let (graph, _) = run(&config_for(dir.path(), "sites.tsv")).unwrap();
    assert_eq!(graph.weight("1_1", "2_2"), Some(1));
}
