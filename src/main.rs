// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! VIMA - Vector Image Mask Annotator
//!
//! A cross-platform desktop application for drawing box and polygon
//! annotations over images and exporting them as COCO datasets.

mod app;
mod controller;
mod io;
mod models;
mod ui;
mod util;
mod workers;

use anyhow::Result;
use app::VimaApp;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("VIMA - Vector Image Mask Annotator"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "VIMA",
        options,
        Box::new(|_cc| Ok(Box::new(VimaApp::new()))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
