mod app;
mod convert;
mod error;
mod map;
mod metrics;
mod state;
mod upload;

use eframe::egui;

use crate::app::App;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "KML Viewer",
        options,
        Box::new(|cc| Ok(Box::new(App::new(cc)))),
    )
}
