//! Fruchterman–Reingold spring layout for plotting the site network.
//!
//! Dense O(n²) per iteration, the same scheme `networkx.spring_layout` uses
//! for small graphs.  Positions are seeded, so a given graph always lays
//! out the same way.

use serde::{Deserialize, Serialize};

use crate::network::CooccurrenceGraph;
use crate::rng::SimpleRng;

/// Parameters of [`spring_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Optimal distance between nodes; `None` uses `1/sqrt(n)`.
    pub k: Option<f64>,
    pub iterations: usize,
    pub seed: u64,
    /// Use edge weights as spring strength instead of 1.
    pub weighted: bool,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            k: Some(0.1),
            iterations: 20,
            seed: 42,
            weighted: true,
        }
    }
}

/// Compute 2D positions, rescaled to fit `[-1, 1]` and centred on zero.
///
/// Returned positions are indexed like `graph.nodes()`.
pub fn spring_layout(graph: &CooccurrenceGraph, params: &LayoutParams) -> Vec<[f64; 2]> {
    let n = graph.node_count();
    match n {
        0 => return Vec::new(),
        1 => return vec![[0.0, 0.0]],
        _ => {}
    }

    let mut rng = SimpleRng::new(params.seed);
    let mut pos: Vec<[f64; 2]> = (0..n).map(|_| [rng.next_f64(), rng.next_f64()]).collect();

    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for e in graph.edges() {
        if e.a == e.b {
            continue;
        }
        let w = if params.weighted { e.weight as f64 } else { 1.0 };
        adjacency[e.a].push((e.b, w));
        adjacency[e.b].push((e.a, w));
    }

    let k = params.k.unwrap_or_else(|| (1.0 / n as f64).sqrt());
    let mut t = 0.1;
    let dt = t / (params.iterations as f64 + 1.0);
    let mut strength = vec![0.0; n];

    for _ in 0..params.iterations {
        let mut disp = vec![[0.0f64; 2]; n];
        for i in 0..n {
            for &(j, w) in &adjacency[i] {
                strength[j] = w;
            }
            for j in 0..n {
                if i == j {
                    continue;
                }
                let delta = [pos[i][0] - pos[j][0], pos[i][1] - pos[j][1]];
                let distance = (delta[0] * delta[0] + delta[1] * delta[1]).sqrt().max(0.01);
                let force = k * k / (distance * distance) - strength[j] * distance / k;
                disp[i][0] += delta[0] * force;
                disp[i][1] += delta[1] * force;
            }
            for &(j, _) in &adjacency[i] {
                strength[j] = 0.0;
            }
        }

        for (p, d) in pos.iter_mut().zip(&disp) {
            let length = (d[0] * d[0] + d[1] * d[1]).sqrt().max(0.01);
            p[0] += d[0] * t / length;
            p[1] += d[1] * t / length;
        }
        t -= dt;
    }

    rescale(&mut pos);
    pos
}

fn rescale(pos: &mut [[f64; 2]]) {
    let n = pos.len() as f64;
    let centre = pos
        .iter()
        .fold([0.0, 0.0], |acc, p| [acc[0] + p[0] / n, acc[1] + p[1] / n]);
    let mut extent: f64 = 0.0;
    for p in pos.iter_mut() {
        p[0] -= centre[0];
        p[1] -= centre[1];
        extent = extent.max(p[0].abs()).max(p[1].abs());
    }
    if extent > 0.0 {
        for p in pos.iter_mut() {
            p[0] /= extent;
            p[1] /= extent;
        }
    }
}
