// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer/keyboard interaction state machine.
//!
//! Owns the transient mask while a draw gesture is in flight and drives all
//! edits of committed masks through the [`Document`]. The controller is
//! pure with respect to the UI: callers translate raw input into press /
//! move / release / double-click / key events and pass the current display
//! rect along, so everything here is unit-testable without a window.
//!
//! Vertex hit-radius comparisons happen in viewport pixels. Letterboxing
//! makes normalized distance anisotropic in pixels, so a normalized-space
//! radius would feel different on the padded axis.

use std::time::{SystemTime, UNIX_EPOCH};

use egui::{Pos2, Rect};

use crate::models::document::Document;
use crate::models::mask::{DrawMode, VectorMask};
use crate::util::geometry::{normalized_to_viewport, viewport_to_normalized};

/// Pixel distance within which a press or hover grabs a vertex.
pub const VERTEX_HIT_RADIUS_PX: f32 = 8.0;

/// Strictly increasing integer timestamps.
///
/// Wall-clock seconds, bumped past the previous value on collision so two
/// commits in the same second still order correctly. Document undo picks
/// the live mask with the maximum timestamp, which needs strictness.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: i64,
}

impl MonotonicClock {
    pub fn next(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// Current interaction state.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Idle,
    /// A transient mask is being drawn; it is not in the document yet.
    Drawing(VectorMask),
    Selected {
        id: String,
    },
    MovingMask {
        id: String,
    },
    MovingVertex {
        id: String,
        index: usize,
    },
}

pub struct InteractionController {
    state: ControllerState,
    mode: DrawMode,
    /// Hover-highlighted vertex of the selected mask, if any.
    active_vertex: Option<usize>,
    last_pos: Option<Pos2>,
    clock: MonotonicClock,
    mask_counter: u64,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            mode: DrawMode::Box,
            active_vertex: None,
            last_pos: None,
            clock: MonotonicClock::default(),
            mask_counter: 0,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DrawMode) {
        self.mode = mode;
    }

    pub fn selected_id(&self) -> Option<&str> {
        match &self.state {
            ControllerState::Selected { id }
            | ControllerState::MovingMask { id }
            | ControllerState::MovingVertex { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The transient mask of an in-flight draw gesture.
    pub fn drawing_mask(&self) -> Option<&VectorMask> {
        match &self.state {
            ControllerState::Drawing(mask) => Some(mask),
            _ => None,
        }
    }

    pub fn active_vertex(&self) -> Option<usize> {
        self.active_vertex
    }

    /// Left button pressed.
    ///
    /// On a selected mask this grabs a vertex (within the pixel hit
    /// radius) or the whole body. Anywhere else it starts a new draw
    /// gesture, silently abandoning selection and any previous transient.
    pub fn on_press(&mut self, doc: &mut Document, pos: Pos2, rect: Rect, img_w: u32, img_h: u32) {
        let point = viewport_to_normalized(pos, rect, img_w, img_h);

        if let ControllerState::Selected { id } = &self.state {
            let id = id.clone();
            if let Some(mask) = doc.get(&id) {
                if let Some((index, dist)) = nearest_vertex_px(mask, pos, rect) {
                    if dist <= VERTEX_HIT_RADIUS_PX {
                        self.active_vertex = Some(index);
                        self.last_pos = Some(pos);
                        self.state = ControllerState::MovingVertex { id, index };
                        return;
                    }
                }
                if mask.contains(point.x, point.y) {
                    self.last_pos = Some(pos);
                    self.state = ControllerState::MovingMask { id };
                    return;
                }
            }
        }

        self.active_vertex = None;
        self.last_pos = Some(pos);
        self.state = ControllerState::Drawing(VectorMask::begin(self.mode, point));
    }

    /// Pointer moved (dragging or hovering).
    pub fn on_move(&mut self, doc: &mut Document, pos: Pos2, rect: Rect, img_w: u32, img_h: u32) {
        let point = viewport_to_normalized(pos, rect, img_w, img_h);

        match &mut self.state {
            ControllerState::Drawing(mask) => mask.update(point),
            ControllerState::MovingVertex { id, index } => {
                let (id, index) = (id.clone(), *index);
                if let Some(mask) = doc.get_mut(&id) {
                    mask.move_point(index, point.x, point.y);
                }
            }
            ControllerState::MovingMask { id } => {
                let id = id.clone();
                if let Some(last) = self.last_pos {
                    if rect.width() > 0.0 && rect.height() > 0.0 {
                        let dx = ((pos.x - last.x) / rect.width()) as f64;
                        let dy = ((pos.y - last.y) / rect.height()) as f64;
                        if let Some(mask) = doc.get_mut(&id) {
                            mask.move_by(dx, dy);
                        }
                    }
                }
            }
            ControllerState::Selected { id } => {
                // Hover-only highlight; no state transition.
                let id = id.clone();
                self.active_vertex = doc.get(&id).and_then(|mask| {
                    nearest_vertex_px(mask, pos, rect)
                        .filter(|&(_, dist)| dist <= VERTEX_HIT_RADIUS_PX)
                        .map(|(index, _)| index)
                });
            }
            ControllerState::Idle => {}
        }
        self.last_pos = Some(pos);
    }

    /// Left button released: commit or discard the transient mask, or end
    /// a drag and return to `Selected`.
    pub fn on_release(&mut self, doc: &mut Document) {
        let state = std::mem::replace(&mut self.state, ControllerState::Idle);
        self.state = match state {
            ControllerState::Drawing(mut mask) => {
                let ts = self.clock.next();
                self.mask_counter += 1;
                mask.set_identity(format!("mask-{ts:x}-{}", self.mask_counter), ts);
                let id = mask.id().to_string();
                if doc.append(mask) {
                    log::info!("Committed mask {}, total: {}", id, doc.vector_masks.len());
                    ControllerState::Selected { id }
                } else {
                    log::info!("Discarded mask below minimum geometry");
                    ControllerState::Idle
                }
            }
            ControllerState::MovingVertex { id, index } => {
                log::debug!("Finished vertex {index} drag on mask {id}");
                ControllerState::Selected { id }
            }
            ControllerState::MovingMask { id } => {
                log::debug!("Finished body drag on mask {id}");
                ControllerState::Selected { id }
            }
            other => other,
        };
        self.last_pos = None;
    }

    /// Double-click: select the topmost mask under the pointer, or clear
    /// the selection and fall back to box drawing mode on empty space.
    pub fn on_double_click(
        &mut self,
        doc: &Document,
        pos: Pos2,
        rect: Rect,
        img_w: u32,
        img_h: u32,
    ) {
        let point = viewport_to_normalized(pos, rect, img_w, img_h);
        self.active_vertex = None;
        match doc.hit_test(point.x, point.y) {
            Some(mask) => {
                log::info!("Selected mask {}", mask.id());
                self.state = ControllerState::Selected {
                    id: mask.id().to_string(),
                };
            }
            None => {
                self.state = ControllerState::Idle;
                self.mode = DrawMode::Box;
            }
        }
    }

    /// Delete/Backspace: remove the highlighted vertex if there is one,
    /// otherwise delete the whole selected mask.
    pub fn on_delete_key(&mut self, doc: &mut Document) {
        let ControllerState::Selected { id } = &self.state else {
            return;
        };
        let id = id.clone();

        if let Some(index) = self.active_vertex {
            if let Some(mask) = doc.get_mut(&id) {
                if mask.delete_point(index) {
                    self.active_vertex = None;
                }
            }
            return;
        }

        doc.delete(&id);
        self.active_vertex = None;
        self.state = ControllerState::Idle;
    }

    /// Escape: drop any transient mask and clear the selection.
    pub fn cancel(&mut self) {
        self.state = ControllerState::Idle;
        self.active_vertex = None;
        self.last_pos = None;
    }

    /// Drop a selection whose mask no longer exists (after undo/clear).
    pub fn sync_selection(&mut self, doc: &Document) {
        if let Some(id) = self.selected_id() {
            if doc.get(id).is_none() {
                self.state = ControllerState::Idle;
                self.active_vertex = None;
            }
        }
    }
}

/// Nearest editable vertex of `mask` to `pos`, with its viewport-pixel
/// distance.
fn nearest_vertex_px(mask: &VectorMask, pos: Pos2, rect: Rect) -> Option<(usize, f32)> {
    mask.points()
        .iter()
        .enumerate()
        .map(|(i, &p)| (i, normalized_to_viewport(p, rect).distance(pos)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::Document;
    use crate::models::mask::DrawMode;
    use crate::util::geometry::compute_display_rect;
    use egui::pos2;

    // Image 1000x500 shown 1:1, so viewport == display rect.
    const IMG_W: u32 = 1000;
    const IMG_H: u32 = 500;

    fn rect() -> Rect {
        compute_display_rect(
            IMG_W,
            IMG_H,
            Rect::from_min_size(pos2(0.0, 0.0), egui::vec2(1000.0, 500.0)),
        )
    }

    fn draw_box(
        ctl: &mut InteractionController,
        doc: &mut Document,
        from: Pos2,
        to: Pos2,
    ) {
        ctl.on_press(doc, from, rect(), IMG_W, IMG_H);
        ctl.on_move(doc, to, rect(), IMG_W, IMG_H);
        ctl.on_release(doc);
    }

    #[test]
    fn test_draw_box_commits_and_selects() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();

        // Normalized (0.1, 0.2) -> (0.4, 0.6).
        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(400.0, 300.0));

        assert_eq!(doc.vector_masks.len(), 1);
        let VectorMask::BoundingBox(b) = &doc.vector_masks[0] else {
            panic!("expected a box");
        };
        assert!((b.x - 0.1).abs() < 1e-6);
        assert!((b.y - 0.2).abs() < 1e-6);
        assert!((b.w - 0.3).abs() < 1e-6);
        assert!((b.h - 0.4).abs() < 1e-6);
        assert_eq!(ctl.selected_id(), Some(b.id.as_str()));
    }

    #[test]
    fn test_tiny_box_discarded() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();

        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(103.0, 101.0));

        assert!(doc.vector_masks.is_empty());
        assert_eq!(*ctl.state(), ControllerState::Idle);
    }

    #[test]
    fn test_draw_polygon_commits() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        ctl.set_mode(DrawMode::Polygon);

        ctl.on_press(&mut doc, pos2(100.0, 100.0), rect(), IMG_W, IMG_H);
        for pos in [pos2(400.0, 100.0), pos2(400.0, 400.0), pos2(100.0, 400.0)] {
            ctl.on_move(&mut doc, pos, rect(), IMG_W, IMG_H);
        }
        ctl.on_release(&mut doc);

        assert_eq!(doc.vector_masks.len(), 1);
        assert!(matches!(
            doc.vector_masks[0],
            VectorMask::PolygonShape(ref p) if p.points.len() == 4
        ));
        assert!(ctl.selected_id().is_some());
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(300.0, 200.0));
        draw_box(&mut ctl, &mut doc, pos2(400.0, 100.0), pos2(600.0, 200.0));
        assert!(doc.vector_masks[1].ts() > doc.vector_masks[0].ts());
    }

    #[test]
    fn test_double_click_selects_topmost_and_resets_mode() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(500.0, 400.0));
        draw_box(&mut ctl, &mut doc, pos2(200.0, 150.0), pos2(600.0, 450.0));
        let top_id = doc.vector_masks[1].id().to_string();

        ctl.on_double_click(&doc, pos2(300.0, 200.0), rect(), IMG_W, IMG_H);
        assert_eq!(ctl.selected_id(), Some(top_id.as_str()));

        // Empty space: deselect and reset the drawing mode to box.
        ctl.set_mode(DrawMode::Polygon);
        ctl.on_double_click(&doc, pos2(950.0, 480.0), rect(), IMG_W, IMG_H);
        assert_eq!(*ctl.state(), ControllerState::Idle);
        assert_eq!(ctl.mode(), DrawMode::Box);
    }

    #[test]
    fn test_press_near_vertex_starts_vertex_drag() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(400.0, 300.0));

        // Press 5 px from the top-left corner: inside the 8 px radius.
        ctl.on_press(&mut doc, pos2(104.0, 103.0), rect(), IMG_W, IMG_H);
        assert!(matches!(
            ctl.state(),
            ControllerState::MovingVertex { index: 0, .. }
        ));

        ctl.on_move(&mut doc, pos2(50.0, 50.0), rect(), IMG_W, IMG_H);
        ctl.on_release(&mut doc);
        assert!(matches!(ctl.state(), ControllerState::Selected { .. }));

        let VectorMask::BoundingBox(b) = &doc.vector_masks[0] else {
            panic!("expected a box");
        };
        // Bottom-right corner unchanged; top-left followed the pointer.
        assert!((b.x + b.w - 0.4).abs() < 1e-6);
        assert!((b.y + b.h - 0.6).abs() < 1e-6);
        assert!((b.x - 0.05).abs() < 1e-6);
        assert!((b.y - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_press_inside_body_moves_mask() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(400.0, 300.0));

        ctl.on_press(&mut doc, pos2(250.0, 200.0), rect(), IMG_W, IMG_H);
        assert!(matches!(ctl.state(), ControllerState::MovingMask { .. }));

        ctl.on_move(&mut doc, pos2(350.0, 200.0), rect(), IMG_W, IMG_H);
        ctl.on_release(&mut doc);

        let VectorMask::BoundingBox(b) = &doc.vector_masks[0] else {
            panic!("expected a box");
        };
        assert!((b.x - 0.2).abs() < 1e-6);
        assert!((b.y - 0.2).abs() < 1e-6);
        assert!(matches!(ctl.state(), ControllerState::Selected { .. }));
    }

    #[test]
    fn test_press_outside_selected_mask_starts_new_gesture() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(300.0, 200.0));
        assert!(ctl.selected_id().is_some());

        ctl.on_press(&mut doc, pos2(700.0, 400.0), rect(), IMG_W, IMG_H);
        assert!(matches!(ctl.state(), ControllerState::Drawing(_)));
        assert!(ctl.drawing_mask().is_some());
    }

    #[test]
    fn test_hover_highlights_vertex_in_pixel_space() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();

        // Letterboxed: 1000x500 image in a square 500x500 viewport.
        let vp = Rect::from_min_size(pos2(0.0, 0.0), egui::vec2(500.0, 500.0));
        let rect = compute_display_rect(IMG_W, IMG_H, vp);

        ctl.on_press(&mut doc, pos2(50.0, 150.0), rect, IMG_W, IMG_H);
        ctl.on_move(&mut doc, pos2(250.0, 350.0), rect, IMG_W, IMG_H);
        ctl.on_release(&mut doc);
        assert_eq!(doc.vector_masks.len(), 1);

        // 6 px from the top-left corner in viewport pixels: highlighted.
        ctl.on_move(&mut doc, pos2(56.0, 150.0), rect, IMG_W, IMG_H);
        assert_eq!(ctl.active_vertex(), Some(0));

        // 20 px away: cleared.
        ctl.on_move(&mut doc, pos2(70.0, 150.0), rect, IMG_W, IMG_H);
        assert_eq!(ctl.active_vertex(), None);
    }

    #[test]
    fn test_delete_key_vertex_then_mask() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        ctl.set_mode(DrawMode::Polygon);

        ctl.on_press(&mut doc, pos2(100.0, 100.0), rect(), IMG_W, IMG_H);
        for pos in [pos2(400.0, 100.0), pos2(400.0, 400.0), pos2(100.0, 400.0)] {
            ctl.on_move(&mut doc, pos, rect(), IMG_W, IMG_H);
        }
        ctl.on_release(&mut doc);
        let id = ctl.selected_id().unwrap().to_string();

        // Highlight vertex 0 and delete it: 4 -> 3 points, highlight cleared.
        ctl.on_move(&mut doc, pos2(102.0, 101.0), rect(), IMG_W, IMG_H);
        assert_eq!(ctl.active_vertex(), Some(0));
        ctl.on_delete_key(&mut doc);
        assert_eq!(ctl.active_vertex(), None);
        assert!(matches!(
            doc.vector_masks[0],
            VectorMask::PolygonShape(ref p) if p.points.len() == 3
        ));
        assert!(matches!(ctl.state(), ControllerState::Selected { .. }));

        // Refused vertex delete keeps the mask and the selection.
        ctl.on_move(&mut doc, pos2(400.0, 100.0), rect(), IMG_W, IMG_H);
        assert!(ctl.active_vertex().is_some());
        ctl.on_delete_key(&mut doc);
        assert_eq!(doc.vector_masks.len(), 1);
        assert!(matches!(ctl.state(), ControllerState::Selected { .. }));

        // No highlight: the whole mask goes to the redo buffer.
        ctl.on_move(&mut doc, pos2(250.0, 250.0), rect(), IMG_W, IMG_H);
        assert_eq!(ctl.active_vertex(), None);
        ctl.on_delete_key(&mut doc);
        assert!(doc.vector_masks.is_empty());
        assert_eq!(*ctl.state(), ControllerState::Idle);
        assert!(doc.redo());
        assert_eq!(doc.vector_masks[0].id(), id);
    }

    #[test]
    fn test_sync_selection_after_undo() {
        let mut ctl = InteractionController::new();
        let mut doc = Document::default();
        draw_box(&mut ctl, &mut doc, pos2(100.0, 100.0), pos2(400.0, 300.0));

        doc.undo();
        ctl.sync_selection(&doc);
        assert_eq!(*ctl.state(), ControllerState::Idle);
    }
}
