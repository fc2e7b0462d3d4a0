//! Species co-occurrence networks from site × species presence tables.
//!
//! Each row of the input is a sampling site (longitude, latitude) with 0/1
//! presence flags for a set of species.  Two sites are linked when they
//! share at least one species; the edge weight is the number they share.
//!
//! ```text
//!  loader ─► (filter) ─► comparator × strategy ─► assemble ─► GML (.gz)
//!                                                     └────► layout ─► viewer
//! ```

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod export;
pub mod layout;
pub mod network;
pub mod pipeline;
pub mod rng;
pub mod state;
pub mod ui;

pub use config::PipelineConfig;
pub use data::filter::{BoundingBox, filter_rows};
pub use data::loader::{LoaderConfig, load_file};
pub use data::model::{Dataset, DatasetError, FeatureSet, ObservationRow, node_id};
pub use export::{read_gml, write_gml};
pub use network::{CooccurrenceGraph, EdgeCandidate, ExecutionStrategy, SelfLoopPolicy};
pub use pipeline::{RunSummary, build_graph, run};
