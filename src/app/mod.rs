use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Rect, Vec2};

use crate::config::SessionConfig;
use crate::history::{Ingest, RelationKind, load_ingest};

mod expand;
mod graph;
mod interaction;
mod persist;
mod physics;
mod session;
mod snapshot;
mod store;
mod temporal;
mod ui;
mod visual;

use session::GraphSession;
use ui::form::EntityForm;

/// Everything the desktop shell needs to know from the command line.
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub dataset: Option<PathBuf>,
    pub root: Option<String>,
    pub max_depth: Option<usize>,
    pub export_dir: PathBuf,
    pub autosave: Option<PathBuf>,
    pub read_only: bool,
    pub config: SessionConfig,
}

pub struct HistoryMapApp {
    options: LaunchOptions,
    state: AppState,
    reload_rx: Option<Receiver<Result<Ingest, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Ingest, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    session: GraphSession,
    dataset_label: String,
    export_dir: PathBuf,
    autosave: Option<PathBuf>,
    search: String,
    pan: Vec2,
    zoom: f32,
    link_kind: RelationKind,
    link_distance: f32,
    charge_strength: f32,
    form: Option<EntityForm>,
    status: Option<String>,
    dragging: bool,
    hover_controls: Option<(String, Rect)>,
    search_match_cache: Option<SearchMatchCache>,
    details_panel_cache: Option<DetailsPanelCache>,
}

struct SearchMatchCache {
    query: String,
    revision: u64,
    ranked: Arc<Vec<(String, String)>>,
    matches: Arc<HashSet<String>>,
}

struct DetailsPanelCache {
    key: DetailsPanelCacheKey,
    connections: Vec<ConnectionEntry>,
    depth_groups: Vec<(usize, Vec<(String, String)>)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct DetailsPanelCacheKey {
    selected_id: String,
    root: Option<String>,
    max_depth: usize,
    revision: u64,
}

#[derive(Clone)]
struct ConnectionEntry {
    link_id: String,
    other_id: String,
    other_name: String,
    kind: RelationKind,
    description: String,
    outgoing: bool,
    depth: Option<usize>,
}

impl HistoryMapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        let state = Self::start_load(options.dataset.clone());
        Self {
            options,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(dataset: Option<PathBuf>) -> Receiver<Result<Ingest, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_ingest(dataset.as_deref()).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(dataset: Option<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(dataset),
        }
    }

    fn ready(&self, ingest: Ingest) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(ingest, &self.options)))
    }
}

impl eframe::App for HistoryMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(result);
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading history map...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(self.options.dataset.clone());
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.options.dataset.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            model.session.teardown();
                            transition = Some(result);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(Err("background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            self.state = match result {
                Ok(ingest) => self.ready(ingest),
                Err(error) => {
                    tracing::error!(%error, "dataset load failed");
                    AppState::Error(error)
                }
            };
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let AppState::Ready(model) = &mut self.state {
            model.persist_on_exit();
            model.session.teardown();
        }
    }
}
