mod app;
mod config;
mod history;
mod util;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::LaunchOptions;
use crate::config::SessionConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON dataset or saved layout; the built-in demo is used when omitted.
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Entity id to focus on start.
    #[arg(long)]
    root: Option<String>,

    /// Degrees of separation shown around the focused entity (1-5).
    #[arg(long)]
    depth: Option<usize>,

    /// Where SVG snapshots and saved layouts are written.
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Keep this layout file up to date after every edit.
    #[arg(long)]
    autosave: Option<PathBuf>,

    /// Browse without changing entities or relationships.
    #[arg(long)]
    read_only: bool,

    #[arg(long)]
    link_distance: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    charge: Option<f32>,

    /// Log filter, e.g. `info` or `history_map=debug`. Falls back to RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn launch_options(&self) -> LaunchOptions {
        let mut config = SessionConfig::default();
        if let Some(distance) = self.link_distance {
            config.simulation.link_distance = distance;
        }
        if let Some(charge) = self.charge {
            config.simulation.charge_strength = charge;
        }

        LaunchOptions {
            dataset: self.dataset.clone(),
            root: self.root.clone(),
            max_depth: self.depth,
            export_dir: self.export_dir.clone(),
            autosave: self.autosave.clone(),
            read_only: self.read_only,
            config,
        }
    }
}

fn init_tracing(directive: Option<&str>) {
    let filter = directive
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };
    let launch = args.launch_options();

    eframe::run_native(
        "history-map",
        options,
        Box::new(move |cc| Ok(Box::new(app::HistoryMapApp::new(cc, launch)))),
    )
}
