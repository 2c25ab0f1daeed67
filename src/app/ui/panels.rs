use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::history::{Ingest, RelationKind};

use super::super::persist::{LayoutAutosave, ReadOnlyRecords, write_layout};
use super::super::session::GraphSession;
use super::super::{LaunchOptions, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(ingest: Ingest, options: &LaunchOptions) -> Self {
        let mut session = GraphSession::new(options.config);
        if let Some(path) = &options.autosave {
            session.add_listener(Box::new(LayoutAutosave::new(path.clone())));
        }
        session.load(ingest);
        if options.read_only {
            session.set_hooks(Box::new(ReadOnlyRecords));
        }

        let mut status = None;
        if let Some(depth) = options.max_depth
            && let Err(error) = session.set_max_depth(depth)
        {
            tracing::warn!(%error, "ignoring --depth");
            status = Some(error.to_string());
        }
        if let Some(root) = &options.root
            && let Err(error) = session.focus(root)
        {
            tracing::warn!(%error, "ignoring --root");
            status = Some(error.to_string());
        }

        let dataset_label = options
            .dataset
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in demo".to_owned());

        Self {
            link_distance: options.config.simulation.link_distance,
            charge_strength: options.config.simulation.charge_strength,
            session,
            dataset_label,
            export_dir: options.export_dir.clone(),
            autosave: options.autosave.clone(),
            search: String::new(),
            pan: Vec2::ZERO,
            zoom: 1.0,
            link_kind: RelationKind::Influenced,
            form: None,
            status,
            dragging: false,
            hover_controls: None,
            search_match_cache: None,
            details_panel_cache: None,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("history-map");
                    ui.separator();
                    ui.label(format!("dataset: {}", self.dataset_label));
                    let root = self
                        .session
                        .root()
                        .and_then(|id| self.session.store().node(id))
                        .map(|node| node.entity().name.clone())
                        .unwrap_or_else(|| "everything".to_owned());
                    ui.label(format!("root: {root}"));
                    ui.label(format!("entities: {}", self.session.store().node_count()));
                    ui.label(format!("in view: {}", self.session.neighborhood().len()));
                    ui.label(format!("relationships: {}", self.session.store().link_count()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload dataset"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(status) = &self.status {
                            ui.label(status.as_str());
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading dataset...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });

        self.draw_form(ctx);
    }

    /// Final layout write when the window closes.
    pub(in crate::app) fn persist_on_exit(&self) {
        let Some(path) = &self.autosave else {
            return;
        };
        match write_layout(path, &self.session.store().to_layout()) {
            Ok(()) => tracing::info!(path = %path.display(), "layout saved on exit"),
            Err(error) => tracing::warn!(error = %format!("{error:#}"), "saving layout on exit failed"),
        }
    }
}
