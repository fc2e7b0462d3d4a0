use crate::data::model::Dataset;

/// A proposed edge between rows `source < target`, weighted by the number of
/// species the two sites share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeCandidate {
    pub source: usize,
    pub target: usize,
    pub weight: u32,
}

/// Pair row `i` with every later row and keep the pairs sharing a species.
///
/// Rows with no species on either side are skipped without comparing.
pub fn compare_row(dataset: &Dataset, i: usize) -> Vec<EdgeCandidate> {
    let rows = &dataset.rows;
    let Some(current) = rows.get(i) else {
        return Vec::new();
    };
    if current.features.is_empty() {
        return Vec::new();
    }

    rows.iter()
        .enumerate()
        .skip(i + 1)
        .filter(|(_, candidate)| !candidate.features.is_empty())
        .filter_map(|(j, candidate)| {
            let shared = current.features.intersection_count(&candidate.features);
            (shared > 0).then_some(EdgeCandidate {
                source: i,
                target: j,
                weight: shared,
            })
        })
        .collect()
}
