//! foliocore: shared library for the folio reader

pub mod repaint;
pub mod storage;
pub mod theme;
pub mod widgets;

pub use repaint::RepaintController;
pub use storage::{KeyValueStore, SharedStore};
pub use theme::{FolioTheme, Palette, ThemeName};
