use serde::{Deserialize, Serialize};

use super::model::{Dataset, ObservationRow};

// ---------------------------------------------------------------------------
// Bounding box predicate
// ---------------------------------------------------------------------------

/// Geographic window; all four bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl BoundingBox {
    /// North-western Pacific window used for the reduced fish network.
    pub const PACIFIC: BoundingBox = BoundingBox {
        min_longitude: 131.0,
        max_longitude: 194.0,
        min_latitude: 17.0,
        max_latitude: 48.0,
    };

    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        longitude > self.min_longitude
            && longitude < self.max_longitude
            && latitude > self.min_latitude
            && latitude < self.max_latitude
    }

    pub fn contains_row(&self, row: &ObservationRow) -> bool {
        self.contains(row.longitude, row.latitude)
    }
}

/// Return indices of rows that fall strictly inside `bbox`.
pub fn filtered_indices(dataset: &Dataset, bbox: &BoundingBox) -> Vec<usize> {
    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| bbox.contains_row(row))
        .map(|(i, _)| i)
        .collect()
}

/// Restrict the dataset to rows inside `bbox`.
///
/// Row order is preserved and the retained rows are renumbered from zero.
/// The feature-column list is unchanged, so feature sets stay comparable.
pub fn filter_rows(dataset: &Dataset, bbox: &BoundingBox) -> Dataset {
    let rows = filtered_indices(dataset, bbox)
        .into_iter()
        .map(|i| dataset.rows[i].clone())
        .collect();
    Dataset::new(rows, dataset.feature_columns.clone())
}
