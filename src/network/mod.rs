/// Network layer: pairwise comparison, execution, and graph assembly.
///
/// ```text
///   Dataset ──► comparator (row i vs rows j > i)
///                  │  driven by strategy: sequential loop | rayon fan-out
///                  ▼
///            Vec<EdgeCandidate>
///                  │
///                  ▼
///   graph::assemble ──► CooccurrenceGraph (last write wins)
/// ```

pub mod comparator;
pub mod graph;
pub mod strategy;

pub use comparator::{EdgeCandidate, compare_row};
pub use graph::{AssemblyStats, CooccurrenceGraph, Edge, EdgeUpdate, SelfLoopPolicy, assemble};
pub use strategy::{ExecutionStrategy, compute_edges};
