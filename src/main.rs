use std::path::PathBuf;

use anyhow::Result;
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use track_labeler::app::AppState;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "track_labeler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let images_dir = std::env::args().nth(1).map(PathBuf::from);
    if images_dir.is_none() {
        eprintln!("Usage: track-labeler /path/to/images/<sub>");
    }

    let app = AppState::new(images_dir);
    let native_options = eframe::NativeOptions::default();
    let _ = eframe::run_native(
        "Person ID Labeling Tool",
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(app)
        }),
    );

    Ok(())
}
