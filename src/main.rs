mod core;
mod gui;
mod jobs;
mod video;

use std::path::PathBuf;
use eframe::egui;
use gui::TrimmothyApp;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Optional: a video to open right away
    let initial_file = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 760.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Trimmothy - Video Trimmer"),
        ..Default::default()
    };

    eframe::run_native(
        "Trimmothy",
        options,
        Box::new(move |cc| {
            match TrimmothyApp::new(cc, initial_file) {
                Ok(app) => Ok(Box::new(app)),
                Err(e) => {
                    eprintln!("Failed to initialize app: {}", e);
                    std::process::exit(1);
                }
            }
        }),
    ).map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))?;

    Ok(())
}
