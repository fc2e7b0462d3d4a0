use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::comparator::EdgeCandidate;
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// CooccurrenceGraph – undirected, weighted, one edge per node pair
// ---------------------------------------------------------------------------

/// An undirected edge between node indices `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub weight: u32,
}

/// Outcome of [`CooccurrenceGraph::add_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeUpdate {
    Inserted,
    Overwritten { previous: u32 },
}

/// Site graph keyed by node identifier.
///
/// Nodes and edges keep first-insertion order; overwriting an edge's weight
/// does not move it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CooccurrenceGraph {
    nodes: Vec<String>,
    node_index: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_index: HashMap<(usize, usize), usize>,
}

impl CooccurrenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `id`, inserting it if unseen.
    pub fn add_node(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.node_index.get(id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(id.to_string());
        self.node_index.insert(id.to_string(), idx);
        idx
    }

    /// Insert an edge or replace the weight of the existing one.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: u32) -> EdgeUpdate {
        let a = self.add_node(a);
        let b = self.add_node(b);
        let key = (a.min(b), a.max(b));
        match self.edge_index.get(&key) {
            Some(&pos) => {
                let previous = self.edges[pos].weight;
                self.edges[pos].weight = weight;
                EdgeUpdate::Overwritten { previous }
            }
            None => {
                self.edge_index.insert(key, self.edges.len());
                self.edges.push(Edge { a, b, weight });
                EdgeUpdate::Inserted
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Weight of the edge between `a` and `b`, in either direction.
    pub fn weight(&self, a: &str, b: &str) -> Option<u32> {
        let a = *self.node_index.get(a)?;
        let b = *self.node_index.get(b)?;
        self.edge_index
            .get(&(a.min(b), a.max(b)))
            .map(|&pos| self.edges[pos].weight)
    }

    /// Number of incident edges per node (a self-loop counts twice).
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nodes.len()];
        for edge in &self.edges {
            degrees[edge.a] += 1;
            degrees[edge.b] += 1;
        }
        degrees
    }

    /// `(node_a, node_b, weight)` triples with each pair in sorted order,
    /// the whole list sorted.  Handy for comparing graphs.
    pub fn weighted_pairs(&self) -> Vec<(String, String, u32)> {
        let mut pairs: Vec<_> = self
            .edges
            .iter()
            .map(|e| {
                let (x, y) = (&self.nodes[e.a], &self.nodes[e.b]);
                let (x, y) = if x <= y { (x, y) } else { (y, x) };
                (x.clone(), y.clone(), e.weight)
            })
            .collect();
        pairs.sort();
        pairs
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// What to do with a candidate whose rows share coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfLoopPolicy {
    /// Drop the candidate.
    #[default]
    Skip,
    /// Record a node-to-itself edge.
    Keep,
}

/// Counters collected while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    pub inserted: usize,
    pub overwritten: usize,
    pub self_loops_skipped: usize,
}

/// Fold candidates into a graph in order; later weights win.
pub fn assemble(
    dataset: &Dataset,
    candidates: &[EdgeCandidate],
    policy: SelfLoopPolicy,
) -> (CooccurrenceGraph, AssemblyStats) {
    // Node ids are derived once per row, not once per candidate.
    let ids: Vec<String> = dataset.rows.iter().map(|r| r.node_id()).collect();
    let mut graph = CooccurrenceGraph::new();
    let mut stats = AssemblyStats::default();

    for c in candidates {
        let (a, b) = (&ids[c.source], &ids[c.target]);
        if a == b && policy == SelfLoopPolicy::Skip {
            stats.self_loops_skipped += 1;
            continue;
        }
        match graph.add_edge(a, b, c.weight) {
            EdgeUpdate::Inserted => stats.inserted += 1,
            EdgeUpdate::Overwritten { previous } => {
                log::debug!("Edge {a} -- {b}: weight {previous} replaced by {}", c.weight);
                stats.overwritten += 1;
            }
        }
    }

    if stats.overwritten > 0 {
        log::warn!(
            "{} edges overwritten by rows with duplicate coordinates",
            stats.overwritten
        );
    }
    if stats.self_loops_skipped > 0 {
        log::warn!(
            "{} self-loops skipped between rows with identical coordinates",
            stats.self_loops_skipped
        );
    }

    (graph, stats)
}
