use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// DatasetError – data-level failures raised while building a dataset
// ---------------------------------------------------------------------------

/// Typed errors for malformed observation tables.  Loaders wrap these in
/// `anyhow` context (file name, row number) before bubbling them up.
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: column '{column}' has non-numeric coordinate '{value}'")]
    InvalidCoordinate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: column '{column}' has invalid presence flag '{value}'")]
    InvalidPresence {
        row: usize,
        column: String,
        value: String,
    },

    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedType { column: String, data_type: String },

    #[error("no feature columns left after excluding {0:?}")]
    NoFeatureColumns(Vec<String>),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
}

// ---------------------------------------------------------------------------
// FeatureSet – packed presence bits of one row
// ---------------------------------------------------------------------------

/// Species presence for one site, one bit per feature column.
///
/// Bit `k` corresponds to `Dataset::feature_columns[k]`, so two sets built
/// against the same dataset can be intersected word by word.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FeatureSet {
    words: Vec<u64>,
}

impl FeatureSet {
    /// An all-absent set sized for `n_features` columns.
    pub fn with_capacity(n_features: usize) -> Self {
        Self {
            words: vec![0; n_features.div_ceil(64)],
        }
    }

    /// Build from a slice of presence flags, in feature-column order.
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut set = Self::with_capacity(flags.len());
        for (k, &present) in flags.iter().enumerate() {
            if present {
                set.insert(k);
            }
        }
        set
    }

    pub fn insert(&mut self, feature: usize) {
        let word = feature / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (feature % 64);
    }

    pub fn contains(&self, feature: usize) -> bool {
        self.words
            .get(feature / 64)
            .is_some_and(|&w| w & (1u64 << (feature % 64)) != 0)
    }

    /// Number of species present.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// `|self ∩ other|`.
    pub fn intersection_count(&self, other: &FeatureSet) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones())
            .sum()
    }

    /// Indices of the present features, ascending.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &bits)| {
            (0..64usize).filter_map(move |b| (bits & (1u64 << b) != 0).then_some(w * 64 + b))
        })
    }
}

// ---------------------------------------------------------------------------
// ObservationRow – one sampling site
// ---------------------------------------------------------------------------

/// A single sampling site (one row of the source table).
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub longitude: f64,
    pub latitude: f64,
    /// Present species, indexed by the owning dataset's feature columns.
    pub features: FeatureSet,
}

impl ObservationRow {
    pub fn new(longitude: f64, latitude: f64, features: FeatureSet) -> Self {
        Self {
            longitude,
            latitude,
            features,
        }
    }

    /// Graph node identifier: `"{lon}_{lat}"`.
    pub fn node_id(&self) -> String {
        node_id(self.longitude, self.latitude)
    }
}

/// Render a coordinate pair as a node identifier.
///
/// Uses the shortest round-trip decimal form, so `1.0` renders as `1`.
/// Networks written by the older pandas scripts from float columns carry
/// ids like `131.0_20.0` instead, so their node ids do not match these.
pub fn node_id(longitude: f64, latitude: f64) -> String {
    format!("{}_{}", Coord(longitude), Coord(latitude))
}

struct Coord(f64);

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -0.0 and 0.0 are the same site.
        if self.0 == 0.0 {
            return write!(f, "0");
        }
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The parsed observation table: an immutable, index-addressable row array
/// plus the resolved feature-column names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub rows: Vec<ObservationRow>,
    /// Ordered feature (species) column names; bit `k` of every row's
    /// `FeatureSet` refers to `feature_columns[k]`.
    pub feature_columns: Vec<String>,
}

impl Dataset {
    pub fn new(rows: Vec<ObservationRow>, feature_columns: Vec<String>) -> Self {
        Self {
            rows,
            feature_columns,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose feature set is empty; they never produce edges.
    pub fn empty_row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.features.is_empty()).count()
    }

    /// Species names present in row `i`; empty when there is no such row.
    pub fn species_of(&self, i: usize) -> Vec<&str> {
        let Some(row) = self.rows.get(i) else {
            return Vec::new();
        };
        row.features
            .iter()
            .filter_map(|k| self.feature_columns.get(k).map(String::as_str))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Presence flag parsing
// ---------------------------------------------------------------------------

/// Interpret a textual cell as a presence flag.
///
/// Accepts integers and floats (non-zero is present) and `true`/`false` in
/// any case.  Anything else, including an empty cell, is rejected.
pub fn parse_presence(raw: &str) -> Option<bool> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(i != 0);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_nan() {
            return None;
        }
        return Some(f != 0.0);
    }
    if s.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    None
}
