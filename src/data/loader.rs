use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{Dataset, DatasetError, FeatureSet, ObservationRow, parse_presence};

// ---------------------------------------------------------------------------
// Loader configuration
// ---------------------------------------------------------------------------

/// Column layout of an observation table.
///
/// Every column that is neither a coordinate nor listed in
/// `excluded_columns` is a feature (species) column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Field separator for delimited text. When unset, `.tsv` files use a
    /// tab and everything else uses `;`.
    pub delimiter: Option<char>,
    pub longitude_column: String,
    pub latitude_column: String,
    /// Non-feature columns besides the coordinates (e.g. a row index).
    pub excluded_columns: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            longitude_column: "Longitude".to_string(),
            latitude_column: "Latitude".to_string(),
            // A headerless index column shows up as "" (or "Unnamed: 0" when
            // the file went through pandas twice).
            excluded_columns: vec![String::new(), "Unnamed: 0".to_string()],
        }
    }
}

/// Separator used for delimited text when the config leaves it unset.
pub const DEFAULT_DELIMITER: char = ';';

impl LoaderConfig {
    /// Separator for a delimited file with the given (lowercase) extension.
    pub fn delimiter_for(&self, ext: &str) -> char {
        match (self.delimiter, ext) {
            (Some(d), _) => d,
            (None, "tsv") => '\t',
            (None, _) => DEFAULT_DELIMITER,
        }
    }

    fn is_excluded(&self, column: &str) -> bool {
        column == self.longitude_column
            || column == self.latitude_column
            || is_pandas_index(column)
            || self.excluded_columns.iter().any(|c| c == column)
    }

    /// Resolve the ordered feature-column list from a header.
    ///
    /// Columns are sorted by name, so the bit layout of every `FeatureSet`
    /// is independent of the column order in the file.
    pub fn resolve_feature_columns<'a, I>(&self, headers: I) -> Result<Vec<String>, DatasetError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let features: BTreeSet<&str> = headers
            .into_iter()
            .filter(|h| !self.is_excluded(h))
            .collect();
        if features.is_empty() {
            let mut excluded = vec![self.longitude_column.clone(), self.latitude_column.clone()];
            excluded.extend(self.excluded_columns.iter().cloned());
            return Err(DatasetError::NoFeatureColumns(excluded));
        }
        Ok(features.into_iter().map(str::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an observation table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text, `;` unless `config` sets a separator
/// * `.tsv`     – tab-separated unless `config` sets a separator
/// * `.json`    – `[{ "Longitude": 1.0, "Latitude": 2.0, "sp_a": 1, ... }, ...]`
/// * `.parquet` – flat columns: numeric coordinates, int/bool/float flags
pub fn load_file(path: &Path, config: &LoaderConfig) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" | "tsv" | "txt" => load_csv(path, config.delimiter_for(&ext), config),
        "json" => load_json(path, config),
        "parquet" | "pq" => load_parquet(path, config),
        other => return Err(DatasetError::UnsupportedExtension(other.to_string()).into()),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} rows with {} feature columns from {}",
        dataset.len(),
        dataset.feature_columns.len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Header row with column names, one site per record.
fn load_csv(path: &Path, delimiter: char, config: &LoaderConfig) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening delimited file")?;
    load_delimited(file, delimiter, config)
}

/// Parse delimited text from any reader. The separator defaults to `;`.
pub fn load_csv_reader<R: std::io::Read>(input: R, config: &LoaderConfig) -> Result<Dataset> {
    load_delimited(input, config.delimiter.unwrap_or(DEFAULT_DELIMITER), config)
}

fn load_delimited<R: std::io::Read>(input: R, delimiter: char, config: &LoaderConfig) -> Result<Dataset> {
    let delimiter = u8::try_from(delimiter)
        .with_context(|| format!("delimiter '{delimiter}' is not a single byte"))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let lon_idx = column_position(&headers, &config.longitude_column)?;
    let lat_idx = column_position(&headers, &config.latitude_column)?;
    let feature_columns = config.resolve_feature_columns(headers.iter().map(String::as_str))?;
    let feature_idx: Vec<usize> = feature_columns
        .iter()
        .map(|c| column_position(&headers, c))
        .collect::<Result<_, _>>()?;

    let mut rows = Vec::new();
    let mut flags = vec![false; feature_columns.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading row {row_no}"))?;

        let longitude = parse_coordinate(record.get(lon_idx), row_no, &config.longitude_column)?;
        let latitude = parse_coordinate(record.get(lat_idx), row_no, &config.latitude_column)?;

        for (slot, (&col_idx, name)) in flags.iter_mut().zip(feature_idx.iter().zip(&feature_columns)) {
            let raw = record.get(col_idx).unwrap_or("");
            *slot = parse_presence(raw).ok_or_else(|| DatasetError::InvalidPresence {
                row: row_no,
                column: name.clone(),
                value: raw.to_string(),
            })?;
        }

        rows.push(ObservationRow::new(longitude, latitude, FeatureSet::from_flags(&flags)));
    }

    Ok(Dataset::new(rows, feature_columns))
}

/// Index columns pandas stores in Parquet files (`__index_level_0__`, ...).
fn is_pandas_index(column: &str) -> bool {
    column
        .strip_prefix("__index_level_")
        .and_then(|rest| rest.strip_suffix("__"))
        .is_some_and(|level| !level.is_empty() && level.bytes().all(|b| b.is_ascii_digit()))
}

fn column_position(headers: &[String], name: &str) -> Result<usize, DatasetError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
}

fn parse_coordinate(raw: Option<&str>, row: usize, column: &str) -> Result<f64, DatasetError> {
    let raw = raw.unwrap_or("");
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DatasetError::InvalidCoordinate {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Longitude": 131.5, "Latitude": 20.0, "Thunnus albacares": 1, "Katsuwonus pelamis": 0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path, config: &LoaderConfig) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    load_json_str(&text, config)
}

/// Parse a JSON records array.
pub fn load_json_str(text: &str, config: &LoaderConfig) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let objects = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            rec.as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))
        })
        .collect::<Result<Vec<_>>>()?;

    let keys: BTreeSet<&str> = objects
        .iter()
        .flat_map(|obj| obj.keys().map(String::as_str))
        .collect();
    if objects.is_empty() {
        // No records means no header; nothing to resolve.
        return Ok(Dataset::default());
    }
    let feature_columns = config.resolve_feature_columns(keys.iter().copied())?;

    let mut rows = Vec::with_capacity(objects.len());
    let mut flags = vec![false; feature_columns.len()];

    for (i, obj) in objects.iter().enumerate() {
        let longitude = json_coordinate(obj.get(&config.longitude_column), i, &config.longitude_column)?;
        let latitude = json_coordinate(obj.get(&config.latitude_column), i, &config.latitude_column)?;

        for (slot, name) in flags.iter_mut().zip(&feature_columns) {
            let val = obj
                .get(name)
                .ok_or_else(|| DatasetError::MissingColumn(name.clone()))
                .with_context(|| format!("Row {i}"))?;
            *slot = json_presence(val).ok_or_else(|| DatasetError::InvalidPresence {
                row: i,
                column: name.clone(),
                value: val.to_string(),
            })?;
        }

        rows.push(ObservationRow::new(longitude, latitude, FeatureSet::from_flags(&flags)));
    }

    Ok(Dataset::new(rows, feature_columns))
}

fn json_coordinate(val: Option<&JsonValue>, row: usize, column: &str) -> Result<f64, DatasetError> {
    let val = val.ok_or_else(|| DatasetError::MissingColumn(column.to_string()))?;
    let parsed = match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| DatasetError::InvalidCoordinate {
            row,
            column: column.to_string(),
            value: val.to_string(),
        })
}

fn json_presence(val: &JsonValue) -> Option<bool> {
    match val {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0),
        JsonValue::String(s) => parse_presence(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one site per row.
///
/// Expected schema:
/// - coordinate columns: Float64, Float32, Int64 or Int32
/// - feature columns: Boolean, Int32, Int64, Float32, Float64 or Utf8
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Pandas index columns
/// (`__index_level_N__`) are never treated as features.
fn load_parquet(path: &Path, config: &LoaderConfig) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let field_names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let lon_idx = schema
        .index_of(&config.longitude_column)
        .map_err(|_| DatasetError::MissingColumn(config.longitude_column.clone()))?;
    let lat_idx = schema
        .index_of(&config.latitude_column)
        .map_err(|_| DatasetError::MissingColumn(config.latitude_column.clone()))?;
    let feature_columns = config.resolve_feature_columns(field_names.iter().copied())?;
    let feature_idx: Vec<usize> = feature_columns
        .iter()
        .map(|c| {
            schema
                .index_of(c)
                .map_err(|_| DatasetError::MissingColumn(c.clone()))
        })
        .collect::<Result<_, _>>()?;

    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    let mut flags = vec![false; feature_columns.len()];
    let mut offset = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let lon_col = batch.column(lon_idx);
        let lat_col = batch.column(lat_idx);

        for row in 0..batch.num_rows() {
            let global = offset + row;
            let longitude = extract_coordinate(lon_col, row, global, &config.longitude_column)?;
            let latitude = extract_coordinate(lat_col, row, global, &config.latitude_column)?;

            for (slot, (&col_idx, name)) in flags.iter_mut().zip(feature_idx.iter().zip(&feature_columns)) {
                *slot = extract_presence(batch.column(col_idx), row, global, name)?;
            }

            rows.push(ObservationRow::new(longitude, latitude, FeatureSet::from_flags(&flags)));
        }
        offset += batch.num_rows();
    }

    Ok(Dataset::new(rows, feature_columns))
}

// -- Parquet / Arrow helpers --

/// Read one numeric cell as `f64`, whatever its physical width.
fn numeric_cell(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Float64 => col.as_primitive_opt::<Float64Type>().map(|a| a.value(row)),
        DataType::Float32 => col.as_primitive_opt::<Float32Type>().map(|a| a.value(row) as f64),
        DataType::Int64 => col.as_primitive_opt::<Int64Type>().map(|a| a.value(row) as f64),
        DataType::Int32 => col.as_primitive_opt::<Int32Type>().map(|a| a.value(row) as f64),
        _ => None,
    }
}

fn extract_coordinate(col: &Arc<dyn Array>, row: usize, global: usize, column: &str) -> Result<f64> {
    match col.data_type() {
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 => {}
        other => bail!(DatasetError::UnsupportedType {
            column: column.to_string(),
            data_type: format!("{other:?}"),
        }),
    }
    numeric_cell(col, row)
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            DatasetError::InvalidCoordinate {
                row: global,
                column: column.to_string(),
                value: if col.is_null(row) { "<null>".to_string() } else { "<non-finite>".to_string() },
            }
            .into()
        })
}

fn extract_presence(col: &Arc<dyn Array>, row: usize, global: usize, column: &str) -> Result<bool> {
    let invalid = |value: String| DatasetError::InvalidPresence {
        row: global,
        column: column.to_string(),
        value,
    };
    if col.is_null(row) {
        bail!(invalid("<null>".to_string()));
    }
    match col.data_type() {
        DataType::Boolean => col
            .as_boolean_opt()
            .map(|a| a.value(row))
            .ok_or_else(|| invalid("<boolean>".to_string()).into()),
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 => {
            match numeric_cell(col, row) {
                Some(v) if !v.is_nan() => Ok(v != 0.0),
                _ => Err(invalid("NaN".to_string()).into()),
            }
        }
        DataType::Utf8 => {
            let s = col
                .as_string_opt::<i32>()
                .map(|a| a.value(row).to_string())
                .unwrap_or_default();
            parse_presence(&s).ok_or_else(|| invalid(s).into())
        }
        other => bail!(DatasetError::UnsupportedType {
            column: column.to_string(),
            data_type: format!("{other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_config() -> LoaderConfig {
        LoaderConfig::default()
    }

    #[test]
    fn loads_semicolon_table_and_skips_index_column() {
        let text = ";Longitude;Latitude;b;a\n0;1;1;0;1\n1;2;2;1;1\n2;3;3;0;0\n";
        let ds = load_csv_reader(text.as_bytes(), &csv_config()).unwrap();

        assert_eq!(ds.feature_columns, vec!["a", "b"]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.species_of(0), vec!["a"]);
        assert_eq!(ds.species_of(1), vec!["a", "b"]);
        assert!(ds.rows[2].features.is_empty());
        assert_eq!(ds.rows[1].node_id(), "2_2");
    }

    #[test]
    fn custom_exclusions_and_delimiter() {
        let config = LoaderConfig {
            delimiter: Some(','),
            longitude_column: "lon".into(),
            latitude_column: "lat".into(),
            excluded_columns: vec!["site".into()],
        };
        let text = "site,lon,lat,x,y\nA,10.5,-3,1,true\n";
        let ds = load_csv_reader(text.as_bytes(), &config).unwrap();
        assert_eq!(ds.feature_columns, vec!["x", "y"]);
        assert_eq!(ds.rows[0].longitude, 10.5);
        assert_eq!(ds.rows[0].features.len(), 2);
    }

    #[test]
    fn delimiter_follows_extension_unless_set() {
        let config = LoaderConfig::default();
        assert_eq!(config.delimiter_for("csv"), ';');
        assert_eq!(config.delimiter_for("txt"), ';');
        assert_eq!(config.delimiter_for("tsv"), '\t');

        let pinned = LoaderConfig { delimiter: Some(','), ..LoaderConfig::default() };
        assert_eq!(pinned.delimiter_for("tsv"), ',');
    }

    #[test]
    fn tab_separated_file_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.tsv");
        std::fs::write(&path, "Longitude\tLatitude\ta\tb\n1\t1\t1\t0\n2\t2\t1\t1\n").unwrap();

        let ds = load_file(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(ds.feature_columns, vec!["a", "b"]);
        assert_eq!(ds.species_of(1), vec!["a", "b"]);
    }

    #[test]
    fn pandas_index_columns_are_not_features() {
        assert!(is_pandas_index("__index_level_0__"));
        assert!(is_pandas_index("__index_level_12__"));
        assert!(!is_pandas_index("__index_level___"));
        assert!(!is_pandas_index("index_level_0"));

        let text = "Longitude;Latitude;__index_level_0__;a\n1;1;4;1\n";
        let ds = load_csv_reader(text.as_bytes(), &csv_config()).unwrap();
        assert_eq!(ds.feature_columns, vec!["a"]);
    }

    #[test]
    fn missing_coordinate_column_is_an_error() {
        let text = "Longitude;sp\n1;1\n";
        let err = load_csv_reader(text.as_bytes(), &csv_config()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatasetError>(),
            Some(&DatasetError::MissingColumn("Latitude".into()))
        );
    }

    #[test]
    fn malformed_presence_aborts() {
        let text = "Longitude;Latitude;sp\n1;1;maybe\n";
        let err = load_csv_reader(text.as_bytes(), &csv_config()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::InvalidPresence { row: 0, .. })
        ));
    }

    #[test]
    fn malformed_coordinate_aborts() {
        let text = "Longitude;Latitude;sp\n1;north;1\n";
        let err = load_csv_reader(text.as_bytes(), &csv_config()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::InvalidCoordinate { column, .. }) if column == "Latitude"
        ));
    }

    #[test]
    fn table_without_features_is_rejected() {
        let text = "Longitude;Latitude\n1;1\n";
        let err = load_csv_reader(text.as_bytes(), &csv_config()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::NoFeatureColumns(_))
        ));
    }

    #[test]
    fn loads_json_records() {
        let text = r#"[
            {"Longitude": 1, "Latitude": 1, "a": 1, "b": false},
            {"Longitude": 2.5, "Latitude": "2", "a": true, "b": "1"}
        ]"#;
        let ds = load_json_str(text, &csv_config()).unwrap();
        assert_eq!(ds.feature_columns, vec!["a", "b"]);
        assert_eq!(ds.species_of(0), vec!["a"]);
        assert_eq!(ds.species_of(1), vec!["a", "b"]);
        assert_eq!(ds.rows[1].node_id(), "2.5_2");
    }

    #[test]
    fn json_record_missing_feature_is_an_error() {
        let text = r#"[{"Longitude": 1, "Latitude": 1, "a": 1}, {"Longitude": 2, "Latitude": 2, "b": 1}]"#;
        assert!(load_json_str(text, &csv_config()).is_err());
    }

    #[test]
    fn dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Longitude;Latitude;sp").unwrap();
        writeln!(f, "1;2;1").unwrap();
        drop(f);

        let ds = load_file(&path, &csv_config()).unwrap();
        assert_eq!(ds.len(), 1);

        let err = load_file(&dir.path().join("sites.xlsx"), &csv_config()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatasetError>(),
            Some(&DatasetError::UnsupportedExtension("xlsx".into()))
        );
    }
}
