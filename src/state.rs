use crate::color::DegreeColorMap;
use crate::layout::{LayoutParams, spring_layout};
use crate::network::CooccurrenceGraph;

/// Number of degree buckets in the node colouring.
const DEGREE_BUCKETS: usize = 8;

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct ViewerState {
    pub graph: CooccurrenceGraph,

    /// Node positions, indexed like `graph.nodes()`.
    pub positions: Vec<[f64; 2]>,

    pub degrees: Vec<usize>,

    /// Edges lighter than this are hidden.
    pub min_weight: u32,

    pub max_weight: u32,

    pub show_edges: bool,

    /// Indices into `graph.edges()` passing `min_weight` (cached).
    pub visible_edges: Vec<usize>,

    pub color_map: DegreeColorMap,

    pub layout: LayoutParams,

    /// Status message shown in the UI.
    pub status_message: Option<String>,
}

impl ViewerState {
    pub fn new(graph: CooccurrenceGraph, layout: LayoutParams) -> Self {
        let degrees = graph.degrees();
        let color_map = DegreeColorMap::new(&degrees, DEGREE_BUCKETS);
        let max_weight = graph.edges().iter().map(|e| e.weight).max().unwrap_or(1);
        let positions = spring_layout(&graph, &layout);

        let mut state = Self {
            graph,
            positions,
            degrees,
            min_weight: 1,
            max_weight,
            show_edges: true,
            visible_edges: Vec::new(),
            color_map,
            layout,
            status_message: None,
        };
        state.refilter();
        state
    }

    /// Recompute `visible_edges` after the weight threshold changed.
    pub fn refilter(&mut self) {
        self.visible_edges = self
            .graph
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.weight >= self.min_weight && e.a != e.b)
            .map(|(i, _)| i)
            .collect();
    }

    /// Lay the graph out again from a new seed.
    pub fn relayout(&mut self) {
        self.layout.seed = self.layout.seed.wrapping_add(1);
        self.positions = spring_layout(&self.graph, &self.layout);
        self.status_message = Some(format!("Layout seed {}", self.layout.seed));
    }

    pub fn set_min_weight(&mut self, weight: u32) {
        self.min_weight = weight.clamp(1, self.max_weight.max(1));
        self.refilter();
    }
}
