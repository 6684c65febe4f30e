//! GUI - eframe/egui デスクトップ画面

mod app;
mod mapping_panel;
mod theme;

pub use app::{EchequeRenamerApp, run};
