use std::path::PathBuf;

use clap::Parser;
use client_core::{config::normalize_base_url, load_settings};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::{AppPaths, DesktopGuiApp, StartupConfig};

#[derive(Parser, Debug)]
#[command(name = "crop-advisor-gui", about = "Desktop form for crop recommendations")]
struct Args {
    /// Prediction service base url. Overrides client.toml and the environment.
    #[arg(long)]
    api_base_url: Option<String>,
    /// SQLite url for remembered inputs and saved history.
    #[arg(long)]
    database_url: Option<String>,
    /// Directory for local state when no database url is configured.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn resolve_startup(args: Args) -> anyhow::Result<StartupConfig> {
    let mut settings = load_settings()?;
    if let Some(url) = &args.api_base_url {
        settings.api_base_url = normalize_base_url(url)?;
    }
    let paths = match AppPaths::from_data_dir(args.data_dir) {
        Ok(paths) => {
            tracing::info!(data_root = %paths.data_root.display(), "resolved app data dir");
            Some(paths)
        }
        Err(err) => {
            tracing::warn!("{err}; keeping configured database url");
            None
        }
    };
    Ok(StartupConfig::resolve(
        settings,
        args.database_url,
        paths.as_ref(),
    ))
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let startup = match resolve_startup(Args::parse()) {
        Ok(startup) => startup,
        Err(err) => {
            tracing::error!("invalid configuration: {err:#}");
            std::process::exit(2);
        }
    };

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(cmd_rx, ui_tx, startup);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Crop Advisor")
            .with_inner_size([900.0, 720.0])
            .with_min_inner_size([520.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Crop Advisor",
        options,
        Box::new(|_cc| Ok(Box::new(DesktopGuiApp::new(cmd_tx, ui_rx)))),
    )
}
