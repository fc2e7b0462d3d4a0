use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Title, re-layout button and status line.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.strong("Species co-occurrence network");
        ui.separator();
        if ui.button("Re-layout").clicked() {
            state.relayout();
            log::info!("Re-laid out with seed {}", state.layout.seed);
        }
        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(msg);
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – statistics and display controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ui.heading("Network");
    ui.separator();

    ui.label(format!("Sites: {}", state.graph.node_count()));
    ui.label(format!("Edges: {}", state.graph.edge_count()));
    ui.label(format!("Shown: {}", state.visible_edges.len()));
    ui.separator();

    ui.checkbox(&mut state.show_edges, "Show edges");

    let mut min_weight = state.min_weight;
    let slider = egui::Slider::new(&mut min_weight, 1..=state.max_weight.max(1))
        .text("min shared species");
    if ui.add(slider).changed() {
        state.set_min_weight(min_weight);
    }
    ui.separator();

    ui.strong("Degree");
    let legend = state.color_map.legend_entries();
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (label, color) in legend {
                ui.horizontal(|ui: &mut Ui| {
                    ui.label(RichText::new("⏺").color(color));
                    ui.label(label);
                });
            }
            if state.graph.is_empty() {
                ui.label(RichText::new("No sites share a species.").color(Color32::GRAY));
            }
        });
}
