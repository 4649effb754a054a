//! folio - a single-book EPUB reader
//!
//! Opens one book, remembers the chapter and scroll position in every
//! chapter, and keeps bookmarks and display preferences between runs.

mod app;
mod book;
mod bookmarks;
mod config;
mod gestures;
mod loader;
mod preferences;
mod progress;
mod reader;
mod restore;
mod session;

use app::FolioApp;
use config::ReaderConfig;
use eframe::NativeOptions;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ReaderConfig::from_env();
    log::info!(
        "book {}, scroll debounce {}ms, state in {}",
        config.book,
        config.scroll_debounce.as_millis(),
        config.data_dir.display()
    );

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 900.0])
            .with_min_inner_size([360.0, 480.0])
            .with_title("folio"),
        ..Default::default()
    };

    eframe::run_native(
        "folio",
        options,
        Box::new(move |cc| Box::new(FolioApp::new(cc, config))),
    )
}
