// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas: image display, mask rendering, pointer dispatch.
//!
//! Computes the letterboxed display rect once per frame and feeds pointer
//! events into the interaction controller. Mask outlines are dashed with
//! an animated offset; the offset is cosmetic and owned by the app.

use crate::controller::InteractionController;
use crate::models::document::Document;
use crate::models::mask::VectorMask;
use crate::util::geometry::{compute_display_rect, normalized_to_viewport};

const MASK_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 250, 240);
const LIVE_COLOR: egui::Color32 = egui::Color32::from_rgb(226, 61, 40);
const SELECTED_COLOR: egui::Color32 = egui::Color32::from_rgb(160, 160, 160);
const ACTIVE_VERTEX_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 180, 0);

/// Display the canvas and route pointer input to the controller.
pub fn show(
    ui: &mut egui::Ui,
    document: &mut Document,
    controller: &mut InteractionController,
    image_texture: &Option<egui::TextureHandle>,
    image_size: Option<(u32, u32)>,
    dash_offset: f32,
) {
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);
    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let Some((img_w, img_h)) = image_size else {
            show_welcome(ui);
            return;
        };

        let viewport = egui::Rect::from_min_size(ui.min_rect().min, ui.available_size());
        let rect = compute_display_rect(img_w, img_h, viewport);

        if let Some(texture) = image_texture {
            ui.painter().image(
                texture.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        // Pointer dispatch. A plain click is a press/release pair.
        let response = ui.allocate_rect(viewport, egui::Sense::click_and_drag());
        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                controller.on_double_click(document, pos, rect, img_w, img_h);
            }
        } else if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                controller.on_press(document, pos, rect, img_w, img_h);
                controller.on_release(document);
            }
        } else if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                controller.on_press(document, pos, rect, img_w, img_h);
            }
        } else if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                controller.on_move(document, pos, rect, img_w, img_h);
            }
        } else if response.drag_stopped() {
            controller.on_release(document);
        } else if let Some(pos) = response.hover_pos() {
            // Hover drives vertex highlighting while a mask is selected.
            controller.on_move(document, pos, rect, img_w, img_h);
        }

        // Committed masks, bottom to top.
        let painter = ui.painter();
        for mask in &document.vector_masks {
            let selected = controller.selected_id() == Some(mask.id());
            let color = if selected { SELECTED_COLOR } else { MASK_COLOR };
            draw_mask_outline(painter, mask, rect, color, dash_offset, &[8.0, 4.0]);
        }

        // Live transient mask.
        if let Some(mask) = controller.drawing_mask() {
            draw_mask_outline(painter, mask, rect, LIVE_COLOR, dash_offset, &[6.0, 6.0]);
        }

        // Vertex handles of the selected mask.
        if let Some(id) = controller.selected_id() {
            if let Some(mask) = document.get(id) {
                for (i, point) in mask.points().iter().enumerate() {
                    let pos = normalized_to_viewport(*point, rect);
                    let (radius, color) = if controller.active_vertex() == Some(i) {
                        (6.0, ACTIVE_VERTEX_COLOR)
                    } else {
                        (4.0, SELECTED_COLOR)
                    };
                    painter.circle_filled(pos, radius, color);
                    painter.circle_stroke(pos, radius, egui::Stroke::new(1.0, egui::Color32::BLACK));
                }
            }
        }
    });
}

fn draw_mask_outline(
    painter: &egui::Painter,
    mask: &VectorMask,
    rect: egui::Rect,
    color: egui::Color32,
    dash_offset: f32,
    dash_pattern: &[f32; 2],
) {
    let mut points: Vec<egui::Pos2> = mask
        .points()
        .iter()
        .map(|p| normalized_to_viewport(*p, rect))
        .collect();
    if points.len() < 2 {
        return;
    }
    // Close the outline.
    points.push(points[0]);

    let shapes = egui::Shape::dashed_line_with_offset(
        &points,
        egui::Stroke::new(2.0, color),
        &dash_pattern[..1],
        &dash_pattern[1..],
        dash_offset,
    );
    painter.extend(shapes);
}

fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("VIMA")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Vector Image Mask Annotator")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Open an image to begin annotating")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Open Image...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}
