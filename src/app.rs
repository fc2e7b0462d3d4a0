use anyhow::Result;
use eframe::egui;

use crate::layout::LayoutParams;
use crate::network::CooccurrenceGraph;
use crate::state::ViewerState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct NetworkViewerApp {
    pub state: ViewerState,
}

impl NetworkViewerApp {
    pub fn new(graph: CooccurrenceGraph, layout: LayoutParams) -> Self {
        Self {
            state: ViewerState::new(graph, layout),
        }
    }
}

impl eframe::App for NetworkViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: controls ----
        egui::SidePanel::left("control_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::network_plot(ui, &self.state);
        });
    }
}

/// Open a window showing `graph`; blocks until it is closed.
pub fn show(graph: CooccurrenceGraph, layout: LayoutParams) -> Result<()> {
    log::info!("Laying out {} nodes for display", graph.node_count());
    let app = NetworkViewerApp::new(graph, layout);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 1200.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Species Network",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
