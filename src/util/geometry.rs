// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate mapping between viewport and image space.
//!
//! The image is drawn letterboxed inside the viewport: scaled to fit while
//! preserving aspect ratio, centered on the padded axis. All mapping goes
//! through a precomputed display rect; shape code never infers viewport
//! geometry on its own.

use crate::models::mask::NormalizedPoint;
use egui::{pos2, Pos2, Rect};

/// Compute the sub-rectangle of `viewport` where the image is drawn.
///
/// Centers and scales the image to fit while preserving aspect ratio.
/// Unknown or degenerate image dimensions fall back to the full viewport.
pub fn compute_display_rect(img_w: u32, img_h: u32, viewport: Rect) -> Rect {
    if img_w == 0 || img_h == 0 {
        return viewport;
    }

    let viewport_ratio = viewport.width() / viewport.height();
    let img_ratio = img_w as f32 / img_h as f32;

    let (width, height, x_offset, y_offset) = if viewport_ratio > img_ratio {
        // Viewport is wider - fit height, center horizontally
        let height = viewport.height();
        let width = img_ratio * height;
        (width, height, (viewport.width() - width) / 2.0, 0.0)
    } else {
        // Viewport is taller - fit width, center vertically
        let width = viewport.width();
        let height = width / img_ratio;
        (width, height, 0.0, (viewport.height() - height) / 2.0)
    };

    Rect::from_min_size(
        viewport.min + egui::vec2(x_offset, y_offset),
        egui::vec2(width, height),
    )
}

/// Map a viewport position to absolute image coordinates (pixels).
///
/// The position is clamped into the display rect, so results are always
/// within `[0, img_w] x [0, img_h]`. Degenerate image sizes map to (0, 0).
pub fn to_image_coords(pos: Pos2, rect: Rect, img_w: u32, img_h: u32) -> (f64, f64) {
    if img_w == 0 || img_h == 0 {
        return (0.0, 0.0);
    }

    let x_rel = ((pos.x - rect.min.x) / rect.width()).clamp(0.0, 1.0) as f64;
    let y_rel = ((pos.y - rect.min.y) / rect.height()).clamp(0.0, 1.0) as f64;

    (x_rel * img_w as f64, y_rel * img_h as f64)
}

/// Map absolute image coordinates (pixels) to a viewport position.
///
/// Degenerate image sizes map to the display rect origin.
pub fn to_viewport_coords(x_img: f64, y_img: f64, rect: Rect, img_w: u32, img_h: u32) -> Pos2 {
    if img_w == 0 || img_h == 0 {
        return rect.min;
    }

    let x_rel = (x_img / img_w as f64) as f32;
    let y_rel = (y_img / img_h as f64) as f32;

    pos2(
        rect.min.x + x_rel * rect.width(),
        rect.min.y + y_rel * rect.height(),
    )
}

/// Map a viewport position to a normalized point, clamped to [0,1].
pub fn viewport_to_normalized(pos: Pos2, rect: Rect, img_w: u32, img_h: u32) -> NormalizedPoint {
    if img_w == 0 || img_h == 0 {
        return NormalizedPoint::new(0.0, 0.0);
    }
    let (x_img, y_img) = to_image_coords(pos, rect, img_w, img_h);
    NormalizedPoint::new(x_img / img_w as f64, y_img / img_h as f64)
}

/// Map a normalized point to its viewport position inside the display rect.
pub fn normalized_to_viewport(point: NormalizedPoint, rect: Rect) -> Pos2 {
    pos2(
        rect.min.x + point.x as f32 * rect.width(),
        rect.min.y + point.y as f32 * rect.height(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), egui::vec2(w, h))
    }

    #[test]
    fn test_display_rect_wide_viewport() {
        // 1000x500 image in a 2000x500 viewport: fit height, centered.
        let rect = compute_display_rect(1000, 500, viewport(2000.0, 500.0));
        assert_eq!(rect.width(), 1000.0);
        assert_eq!(rect.height(), 500.0);
        assert_eq!(rect.min.x, 500.0);
        assert_eq!(rect.min.y, 0.0);
    }

    #[test]
    fn test_display_rect_tall_viewport() {
        let rect = compute_display_rect(1000, 500, viewport(1000.0, 2000.0));
        assert_eq!(rect.width(), 1000.0);
        assert_eq!(rect.height(), 500.0);
        assert_eq!(rect.min.x, 0.0);
        assert_eq!(rect.min.y, 750.0);
    }

    #[test]
    fn test_display_rect_degenerate_image() {
        let vp = viewport(640.0, 480.0);
        assert_eq!(compute_display_rect(0, 500, vp), vp);
        assert_eq!(compute_display_rect(1000, 0, vp), vp);
    }

    #[test]
    fn test_image_viewport_roundtrip() {
        let rect = compute_display_rect(1920, 1080, viewport(2560.0, 1440.0));
        let p = pos2(700.0, 300.0);

        let (x_img, y_img) = to_image_coords(p, rect, 1920, 1080);
        let back = to_viewport_coords(x_img, y_img, rect, 1920, 1080);

        assert!((back.x - p.x).abs() < 0.01);
        assert!((back.y - p.y).abs() < 0.01);
    }

    #[test]
    fn test_image_coords_clamped() {
        let rect = compute_display_rect(100, 100, viewport(100.0, 100.0));
        let (x, y) = to_image_coords(pos2(-50.0, 250.0), rect, 100, 100);
        assert_eq!(x, 0.0);
        assert_eq!(y, 100.0);
    }

    #[test]
    fn test_degenerate_mappings() {
        let rect = viewport(640.0, 480.0);
        assert_eq!(to_image_coords(pos2(10.0, 10.0), rect, 0, 100), (0.0, 0.0));
        assert_eq!(to_viewport_coords(5.0, 5.0, rect, 0, 100), rect.min);
    }

    #[test]
    fn test_normalized_roundtrip_under_letterbox() {
        // Letterboxed rect makes normalized distance anisotropic in pixels,
        // but the mapping itself must still round-trip.
        let rect = compute_display_rect(1000, 500, viewport(2000.0, 500.0));
        let n = NormalizedPoint::new(0.25, 0.75);
        let pos = normalized_to_viewport(n, rect);
        let back = viewport_to_normalized(pos, rect, 1000, 500);
        assert!((back.x - n.x).abs() < 1e-5);
        assert!((back.y - n.y).abs() < 1e-5);
    }
}
