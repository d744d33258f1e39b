#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use eframe::egui;
use tracing_subscriber::EnvFilter;

mod app;
mod editor;
mod library;
mod settings;
mod theme;

use app::MindCanvasApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "MindCanvas",
        options,
        Box::new(|cc| Ok(Box::new(MindCanvasApp::new(cc)))),
    )
}
