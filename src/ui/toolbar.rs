// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar: drawing mode selection and on-demand operations.

use crate::models::mask::DrawMode;

/// Operation requested from the toolbar, handled by the app.
pub enum ToolbarAction {
    None,
    SetMode(DrawMode),
    SmoothSelected,
    ClearAll,
}

/// Display the toolbar with mode buttons and operation shortcuts.
pub fn show(ui: &mut egui::Ui, current_mode: DrawMode, has_selection: bool) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Mode:");
        ui.separator();

        if ui
            .selectable_label(current_mode == DrawMode::Box, "▭ Box")
            .clicked()
        {
            action = ToolbarAction::SetMode(DrawMode::Box);
        }
        if ui
            .selectable_label(current_mode == DrawMode::Polygon, "▱ Polygon")
            .clicked()
        {
            action = ToolbarAction::SetMode(DrawMode::Polygon);
        }

        ui.separator();

        if ui
            .add_enabled(has_selection, egui::Button::new("Smooth"))
            .on_hover_text("Resample the selected polygon at a minimum physical spacing")
            .clicked()
        {
            action = ToolbarAction::SmoothSelected;
        }
        if ui.button("Clear All").clicked() {
            action = ToolbarAction::ClearAll;
        }

        ui.separator();

        let hint = match current_mode {
            DrawMode::Box => "Drag to draw a box, double-click to select, drag corners to resize",
            DrawMode::Polygon => "Drag to draw freehand, double-click to select, Delete removes a vertex",
        };
        ui.label(egui::RichText::new(hint).italics().weak());
    });

    action
}
