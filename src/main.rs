#![warn(clippy::all, rust_2018_idioms)]

use std::path::PathBuf;

use garment_studio::{StudioApp, StudioConfig};

fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let config = match StudioConfig::resolve(std::env::args_os().nth(1).map(PathBuf::from)) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}; falling back to defaults");
            StudioConfig::default()
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 580.0])
            .with_min_inner_size([480.0, 360.0])
            .with_title("Garment Studio"),
        ..Default::default()
    };

    eframe::run_native(
        "garment_studio",
        native_options,
        Box::new(|cc| Ok(Box::new(StudioApp::new(cc, config)))),
    )
}
