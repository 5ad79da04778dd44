// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! Hosts the document and the interaction controller, wires menu/toolbar
//! actions and keyboard shortcuts to them, and manages background image
//! loading plus the worker channel. All annotation mutation happens
//! synchronously here in response to discrete input events.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use crate::controller::InteractionController;
use crate::io::settings::Settings;
use crate::models::document::{Document, SourceKind};
use crate::models::mask::VectorMask;
use crate::ui::{canvas, toolbar};
use crate::util::smoothing::{smooth_polygon, SmoothingParams};
use crate::workers::{WorkerEndpoint, WorkerLink};

/// Fallback frame dimensions when a video document's size is unknown.
const DEFAULT_VIDEO_SIZE: (u32, u32) = (1920, 1080);

/// Dash animation advance per second, in dash-pattern units.
const DASH_SPEED: f32 = 30.0;

/// Result of background loading: decoded pixels and, when a document file
/// was opened, its parsed contents.
struct LoadedMedia {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    document: Option<Document>,
}

/// Main application state.
pub struct VimaApp {
    document: Document,
    controller: InteractionController,
    settings: Settings,

    /// Path the document was last loaded from or saved to.
    document_path: Option<PathBuf>,

    image_texture: Option<egui::TextureHandle>,
    image_size: Option<(u32, u32)>,

    /// Receiver for background media loading.
    media_loader: Option<Receiver<Result<LoadedMedia, String>>>,
    loading_message: Option<String>,

    worker_link: WorkerLink,
    /// Held until an external worker host attaches; keeping it alive means
    /// unanswered requests stay pending rather than erroring.
    _worker_endpoint: WorkerEndpoint,

    smoothing: SmoothingParams,
    dash_offset: f32,
}

impl Default for VimaApp {
    fn default() -> Self {
        Self::new()
    }
}

impl VimaApp {
    pub fn new() -> Self {
        let settings = Settings::load();
        let (worker_link, worker_endpoint) = WorkerLink::channel();

        let mut app = Self {
            document: Document::default(),
            controller: InteractionController::new(),
            settings,
            document_path: None,
            image_texture: None,
            image_size: None,
            media_loader: None,
            loading_message: None,
            worker_link,
            _worker_endpoint: worker_endpoint,
            smoothing: SmoothingParams::default(),
            dash_offset: 0.0,
        };

        let recent = app.settings.most_recent_document_path.clone();
        if !recent.is_empty() {
            let path = PathBuf::from(&recent);
            if path.exists() {
                log::info!("Reopening most recent document {}", path.display());
                app.open_document(path);
            }
        }
        app
    }

    fn image_dimensions(&self) -> (u32, u32) {
        self.image_size.unwrap_or((0, 0))
    }

    /// Load an image file and create a texture for display (asynchronously).
    fn open_image(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.media_loader = Some(receiver);
        self.loading_message = Some("Loading image...".to_string());

        let path_string = path.to_string_lossy().to_string();
        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedMedia, String> {
                let img = crate::io::media::load_image(&path)
                    .map_err(|e| format!("Failed to load image: {e}"))?;
                log::info!("Loaded image: {} ({}x{})", path.display(), img.width, img.height);
                Ok(LoadedMedia {
                    width: img.width,
                    height: img.height,
                    pixels: img.pixels,
                    document: Some(Document::new(path_string, SourceKind::Image)),
                })
            })();
            let _ = sender.send(result);
        });
    }

    /// Load a document file and its referenced image (asynchronously).
    fn open_document(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.media_loader = Some(receiver);
        self.loading_message = Some("Loading document...".to_string());
        self.document_path = Some(path.clone());
        self.remember_document_path(&path);

        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedMedia, String> {
                let document = crate::io::serialization::load_document(&path)
                    .map_err(|e| format!("Failed to load document: {e}"))?;
                log::info!(
                    "Loaded {} masks from {}",
                    document.vector_masks.len(),
                    path.display()
                );

                match document.src_file_type {
                    SourceKind::Image => {
                        let media_path = PathBuf::from(&document.src_file_path);
                        let img = crate::io::media::load_image(&media_path)
                            .map_err(|e| format!("Failed to load image: {e}"))?;
                        Ok(LoadedMedia {
                            width: img.width,
                            height: img.height,
                            pixels: img.pixels,
                            document: Some(document),
                        })
                    }
                    SourceKind::Video => {
                        // Playback is out of scope; annotate against the
                        // fallback frame size with no backdrop.
                        log::warn!(
                            "Video source {}: using fallback dimensions {}x{}",
                            document.src_file_path,
                            DEFAULT_VIDEO_SIZE.0,
                            DEFAULT_VIDEO_SIZE.1
                        );
                        Ok(LoadedMedia {
                            width: DEFAULT_VIDEO_SIZE.0,
                            height: DEFAULT_VIDEO_SIZE.1,
                            pixels: Vec::new(),
                            document: Some(document),
                        })
                    }
                }
            })();
            let _ = sender.send(result);
        });
    }

    fn save_document(&mut self, path: PathBuf) {
        match crate::io::serialization::save_document(&self.document, &path) {
            Ok(()) => {
                log::info!("Saved document to {}", path.display());
                self.document_path = Some(path.clone());
                self.remember_document_path(&path);
            }
            Err(e) => log::error!("Failed to save document: {e}"),
        }
    }

    fn remember_document_path(&mut self, path: &std::path::Path) {
        self.settings.most_recent_document_path = path.to_string_lossy().to_string();
        if let Err(e) = self.settings.save() {
            log::warn!("Failed to persist settings: {e}");
        }
    }

    fn export_coco(&self, path: PathBuf) {
        let (img_w, img_h) = self.image_dimensions();
        if img_w == 0 || img_h == 0 {
            log::error!("Cannot export without image dimensions");
            return;
        }
        match crate::io::export::write_coco(&self.document, img_w, img_h, &path) {
            Ok(out) => log::info!("Exported COCO annotations to {}", out.display()),
            Err(e) => log::error!("Failed to export annotations: {e}"),
        }
    }

    fn smooth_selected(&mut self) {
        let (img_w, img_h) = self.image_dimensions();
        let Some(id) = self.controller.selected_id().map(str::to_string) else {
            return;
        };
        match self.document.get_mut(&id) {
            Some(VectorMask::PolygonShape(polygon)) => {
                smooth_polygon(polygon, img_w, img_h, &self.smoothing);
            }
            Some(VectorMask::BoundingBox(_)) => {
                log::info!("Smoothing applies to polygons only");
            }
            None => {}
        }
    }

    fn request_segmentation(&mut self) {
        let (img_w, img_h) = self.image_dimensions();
        let Some(id) = self.controller.selected_id() else {
            return;
        };
        if let Some(VectorMask::BoundingBox(b)) = self.document.get(id) {
            let box_px = [
                b.x * img_w as f64,
                b.y * img_h as f64,
                (b.x + b.w) * img_w as f64,
                (b.y + b.h) * img_h as f64,
            ];
            let request_id = self.worker_link.request_segment(box_px, img_w, img_h);
            log::info!("Sent segmentation request {request_id}");
        }
    }

    fn request_density(&mut self) {
        let (img_w, img_h) = self.image_dimensions();
        let request_id = self.worker_link.request_density(img_w, img_h);
        log::info!("Sent density request {request_id}");
    }

    fn poll_media_loader(&mut self, ctx: &egui::Context) {
        let Some(receiver) = &self.media_loader else {
            return;
        };
        let Ok(result) = receiver.try_recv() else {
            return;
        };
        self.media_loader = None;
        self.loading_message = None;

        match result {
            Ok(media) => {
                self.image_size = Some((media.width, media.height));
                self.image_texture = if media.pixels.is_empty() {
                    None
                } else {
                    let size = [media.width as usize, media.height as usize];
                    let color_image =
                        egui::ColorImage::from_rgba_unmultiplied(size, &media.pixels);
                    Some(ctx.load_texture(
                        "loaded_image",
                        color_image,
                        egui::TextureOptions::LINEAR,
                    ))
                };
                if let Some(document) = media.document {
                    self.document = document;
                    self.controller.cancel();
                }
                log::info!("Media loaded successfully");
            }
            Err(e) => log::error!("Failed to load media: {e}"),
        }
    }

    /// Drain worker responses; correlation is best-effort by request id.
    fn poll_workers(&mut self) {
        for response in self.worker_link.poll() {
            if let Some(mask) = &response.mask {
                log::info!(
                    "Segmentation mask received for request {} ({} rows)",
                    response.request_id,
                    mask.len()
                );
            }
            if let Some(count) = response.count {
                log::info!(
                    "Density count for request {}: {count}",
                    response.request_id
                );
            }
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.controller.cancel();
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            self.controller.on_delete_key(&mut self.document);
        }

        // Undo (Ctrl+Z)
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.document.undo();
            self.controller.sync_selection(&self.document);
        }

        // Redo (Ctrl+Shift+Z or Ctrl+Y)
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.document.redo();
        }
    }

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "tiff", "tif"])
                            .pick_file()
                        {
                            self.open_image(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Open Document...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Documents", &["json", "yaml", "yml"])
                            .pick_file()
                        {
                            self.open_document(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Save Document...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Documents", &["json", "yaml", "yml"])
                            .set_file_name("annotations.json")
                            .save_file()
                        {
                            self.save_document(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Export COCO...").clicked() {
                        let default_name = self
                            .document_path
                            .as_ref()
                            .and_then(|p| p.file_name())
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| "annotations.json".to_string());
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name(default_name)
                            .save_file()
                        {
                            self.export_coco(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Edit", |ui| {
                    if ui.button("Undo (Ctrl+Z)").clicked() {
                        self.document.undo();
                        self.controller.sync_selection(&self.document);
                        ui.close_menu();
                    }
                    if ui.button("Redo (Ctrl+Shift+Z)").clicked() {
                        self.document.redo();
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_selection = self.controller.selected_id().is_some();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Delete Selected"))
                        .clicked()
                    {
                        self.controller.on_delete_key(&mut self.document);
                        ui.close_menu();
                    }
                    if ui.button("Clear All").clicked() {
                        // Bypasses the redo buffer: cannot be undone.
                        self.document.clear();
                        self.controller.sync_selection(&self.document);
                        ui.close_menu();
                    }
                });

                ui.menu_button("Tools", |ui| {
                    let has_selection = self.controller.selected_id().is_some();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Smooth Polygon"))
                        .clicked()
                    {
                        self.smooth_selected();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Segment Selection"))
                        .clicked()
                    {
                        self.request_segmentation();
                        ui.close_menu();
                    }
                    if ui.button("Estimate Density").clicked() {
                        self.request_density();
                        ui.close_menu();
                    }
                });
            });
        });
    }
}

impl eframe::App for VimaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_media_loader(ctx);
        self.poll_workers();

        if self.loading_message.is_some() {
            ctx.request_repaint();
        }

        self.show_menu_bar(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let action = toolbar::show(
                ui,
                self.controller.mode(),
                self.controller.selected_id().is_some(),
            );
            match action {
                toolbar::ToolbarAction::SetMode(mode) => self.controller.set_mode(mode),
                toolbar::ToolbarAction::SmoothSelected => self.smooth_selected(),
                toolbar::ToolbarAction::ClearAll => {
                    self.document.clear();
                    self.controller.sync_selection(&self.document);
                }
                toolbar::ToolbarAction::None => {}
            }
        });

        self.handle_keyboard(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = &self.loading_message {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.spinner();
                        ui.add_space(10.0);
                        ui.label(
                            egui::RichText::new(message)
                                .size(16.0)
                                .color(egui::Color32::from_gray(200)),
                        );
                    });
                });
            } else {
                canvas::show(
                    ui,
                    &mut self.document,
                    &mut self.controller,
                    &self.image_texture,
                    self.image_size,
                    self.dash_offset,
                );
            }
        });

        // Cosmetic dash animation; annotation state is never touched here.
        if self.image_size.is_some() {
            let dt = ctx.input(|i| i.stable_dt).min(0.1);
            self.dash_offset = (self.dash_offset + DASH_SPEED * dt) % 12.0;
            ctx.request_repaint_after(Duration::from_millis(30));
        }
    }
}
