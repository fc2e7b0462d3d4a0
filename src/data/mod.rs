/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (feature columns resolved once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<ObservationRow>, one FeatureSet bitset per row
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  optional bounding box → renumbered Dataset
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
