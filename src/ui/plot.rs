use eframe::egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotPoints, Points};

use crate::state::ViewerState;

/// Drawing every edge of a dense network stalls the frame; keep the heaviest.
const MAX_DRAWN_EDGES: usize = 20_000;

// ---------------------------------------------------------------------------
// Network plot (central panel)
// ---------------------------------------------------------------------------

/// Render the laid-out network in the central panel.
pub fn network_plot(ui: &mut Ui, state: &ViewerState) {
    if state.graph.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("The network has no edges");
        });
        return;
    }

    let mut drawn: Vec<usize> = state.visible_edges.clone();
    if drawn.len() > MAX_DRAWN_EDGES {
        let edges = state.graph.edges();
        drawn.sort_by_key(|&i| std::cmp::Reverse(edges[i].weight));
        drawn.truncate(MAX_DRAWN_EDGES);
    }
    let max_weight = state.max_weight.max(1) as f32;

    Plot::new("network_plot")
        .legend(egui_plot::Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if state.show_edges {
                for &i in &drawn {
                    let edge = state.graph.edges()[i];
                    let (a, b) = (state.positions[edge.a], state.positions[edge.b]);
                    let alpha = 0.1 + 0.5 * edge.weight as f32 / max_weight;
                    let line = Line::new(PlotPoints::new(vec![a, b]))
                        .color(Color32::GRAY.gamma_multiply(alpha))
                        .width(1.0);
                    plot_ui.line(line);
                }
            }

            // One point series per colour so the legend stays short.
            for (label, color) in state.color_map.legend_entries() {
                let points: Vec<[f64; 2]> = state
                    .positions
                    .iter()
                    .zip(&state.degrees)
                    .filter(|(_, d)| state.color_map.color_for(**d) == color)
                    .map(|(&p, _)| p)
                    .collect();
                if points.is_empty() {
                    continue;
                }
                plot_ui.points(
                    Points::new(PlotPoints::new(points))
                        .name(format!("degree {label}"))
                        .color(color)
                        .radius(2.5),
                );
            }
        });
}
