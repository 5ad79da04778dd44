// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Vector mask shapes: bounding boxes and polygons.
//!
//! All coordinates are normalized to [0,1] relative to the image size.
//! The two shape kinds share one capability set (live update, hit test,
//! move, vertex editing) dispatched through the closed [`VectorMask`] enum.

use serde::{Deserialize, Serialize};

/// Minimum normalized distance between consecutive freehand vertices.
/// Bounds vertex density during continuous pointer motion.
const VERTEX_EPSILON: f64 = 0.002;

/// Minimum committed box extent on either axis.
pub const MIN_BOX_EXTENT: f64 = 0.01;

/// Minimum committed polygon vertex count.
pub const MIN_POLYGON_POINTS: usize = 3;

/// A 2D point with normalized coordinates, clamped to [0,1] on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// Euclidean distance in normalized units.
    pub fn distance(&self, other: &NormalizedPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned box with normalized top-left origin and extent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub id: String,
    pub ts: i64,
    /// Corner the live-draw gesture started from. Not persisted.
    #[serde(skip)]
    anchor: Option<NormalizedPoint>,
}

// The live-draw anchor is gesture state, not geometry; it does not take
// part in equality.
impl PartialEq for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.w == other.w
            && self.h == other.h
            && self.id == other.id
            && self.ts == other.ts
    }
}

impl BoundingBox {
    /// Start a live box anchored at `point`, with zero extent.
    pub fn anchored_at(point: NormalizedPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            w: 0.0,
            h: 0.0,
            id: String::new(),
            ts: 0,
            anchor: Some(point),
        }
    }

    /// Live draw: span the box between the anchor and the pointer.
    ///
    /// Recomputes origin/extent so the origin is always the min corner;
    /// the box both grows and shrinks as the pointer moves.
    pub fn update(&mut self, point: NormalizedPoint) {
        let anchor = self.anchor.unwrap_or(NormalizedPoint {
            x: self.x,
            y: self.y,
        });
        self.x = anchor.x.min(point.x);
        self.y = anchor.y.min(point.y);
        self.w = (anchor.x - point.x).abs();
        self.h = (anchor.y - point.y).abs();
    }

    /// Translate rigidly, keeping the whole box inside [0,1]^2.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.x = (self.x + dx).clamp(0.0, (1.0 - self.w).max(0.0));
        self.y = (self.y + dy).clamp(0.0, (1.0 - self.h).max(0.0));
    }

    /// Corners in TL, TR, BR, BL order.
    pub fn corners(&self) -> [NormalizedPoint; 4] {
        [
            NormalizedPoint::new(self.x, self.y),
            NormalizedPoint::new(self.x + self.w, self.y),
            NormalizedPoint::new(self.x + self.w, self.y + self.h),
            NormalizedPoint::new(self.x, self.y + self.h),
        ]
    }

    /// Drag corner `index` to (nx, ny), holding the opposite corner fixed.
    pub fn move_point(&mut self, index: usize, nx: f64, ny: f64) {
        if index >= 4 {
            return;
        }
        let corners = self.corners();
        let opposite = corners[(index + 2) % 4];
        let dragged = NormalizedPoint::new(nx, ny);

        self.x = opposite.x.min(dragged.x);
        self.y = opposite.y.min(dragged.y);
        self.w = (opposite.x - dragged.x).abs();
        self.h = (opposite.y - dragged.y).abs();
    }

    /// Inclusive axis-aligned containment test.
    pub fn contains(&self, nx: f64, ny: f64) -> bool {
        nx >= self.x && nx <= self.x + self.w && ny >= self.y && ny <= self.y + self.h
    }

    pub fn is_valid(&self) -> bool {
        self.w > MIN_BOX_EXTENT && self.h > MIN_BOX_EXTENT
    }
}

/// Closed polygon with normalized vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonShape {
    pub points: Vec<NormalizedPoint>,
    pub id: String,
    pub ts: i64,
}

impl PolygonShape {
    /// Start a live polygon from a single vertex.
    pub fn anchored_at(point: NormalizedPoint) -> Self {
        Self {
            points: vec![point],
            id: String::new(),
            ts: 0,
        }
    }

    /// Live draw: append the pointer position as a new vertex, unless it is
    /// within [`VERTEX_EPSILON`] of the last one.
    pub fn update(&mut self, point: NormalizedPoint) {
        match self.points.last() {
            Some(last) if last.distance(&point) <= VERTEX_EPSILON => {}
            _ => self.points.push(point),
        }
    }

    /// Translate every vertex, each clamped to [0,1] independently.
    ///
    /// Unlike [`BoundingBox::move_by`] this can distort the shape when the
    /// translation would push part of it out of bounds.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            *p = NormalizedPoint::new(p.x + dx, p.y + dy);
        }
    }

    /// Replace vertex `index` with (nx, ny), clamped to [0,1].
    pub fn move_point(&mut self, index: usize, nx: f64, ny: f64) {
        if let Some(p) = self.points.get_mut(index) {
            *p = NormalizedPoint::new(nx, ny);
        }
    }

    /// Remove vertex `index` if at least [`MIN_POLYGON_POINTS`] remain.
    pub fn delete_point(&mut self, index: usize) -> bool {
        if index >= self.points.len() || self.points.len() - 1 < MIN_POLYGON_POINTS {
            return false;
        }
        self.points.remove(index);
        true
    }

    /// Even-odd ray casting containment test.
    pub fn contains(&self, nx: f64, ny: f64) -> bool {
        let pts = &self.points;
        if pts.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = pts.len() - 1;
        for i in 0..pts.len() {
            let (pi, pj) = (pts[i], pts[j]);
            // Epsilon keeps the slope denominator non-zero on horizontal edges.
            if (pi.y > ny) != (pj.y > ny)
                && nx < (pj.x - pi.x) * (ny - pi.y) / (pj.y - pi.y + f64::EPSILON) + pi.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    pub fn is_valid(&self) -> bool {
        self.points.len() >= MIN_POLYGON_POINTS
    }
}

/// Drawing mode for new masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Box,
    Polygon,
}

/// A vector annotation: box or polygon.
///
/// Serialized internally tagged, so document files carry
/// `{"type": "BoundingBox", ...}` / `{"type": "PolygonShape", ...}` records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VectorMask {
    BoundingBox(BoundingBox),
    PolygonShape(PolygonShape),
}

impl VectorMask {
    /// Start a transient mask for a new draw gesture.
    pub fn begin(mode: DrawMode, point: NormalizedPoint) -> Self {
        match mode {
            DrawMode::Box => VectorMask::BoundingBox(BoundingBox::anchored_at(point)),
            DrawMode::Polygon => VectorMask::PolygonShape(PolygonShape::anchored_at(point)),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            VectorMask::BoundingBox(b) => &b.id,
            VectorMask::PolygonShape(p) => &p.id,
        }
    }

    pub fn ts(&self) -> i64 {
        match self {
            VectorMask::BoundingBox(b) => b.ts,
            VectorMask::PolygonShape(p) => p.ts,
        }
    }

    /// Assign identity at commit time.
    pub fn set_identity(&mut self, id: String, ts: i64) {
        match self {
            VectorMask::BoundingBox(b) => {
                b.id = id;
                b.ts = ts;
            }
            VectorMask::PolygonShape(p) => {
                p.id = id;
                p.ts = ts;
            }
        }
    }

    /// Live-draw update with the current pointer position.
    pub fn update(&mut self, point: NormalizedPoint) {
        match self {
            VectorMask::BoundingBox(b) => b.update(point),
            VectorMask::PolygonShape(p) => p.update(point),
        }
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        match self {
            VectorMask::BoundingBox(b) => b.move_by(dx, dy),
            VectorMask::PolygonShape(p) => p.move_by(dx, dy),
        }
    }

    /// Editable vertices: box corners (TL, TR, BR, BL) or polygon points.
    pub fn points(&self) -> Vec<NormalizedPoint> {
        match self {
            VectorMask::BoundingBox(b) => b.corners().to_vec(),
            VectorMask::PolygonShape(p) => p.points.clone(),
        }
    }

    pub fn move_point(&mut self, index: usize, nx: f64, ny: f64) {
        match self {
            VectorMask::BoundingBox(b) => b.move_point(index, nx, ny),
            VectorMask::PolygonShape(p) => p.move_point(index, nx, ny),
        }
    }

    /// Delete a vertex. Box corners are not removable; polygons refuse to
    /// drop below the minimum vertex count. Returns whether a vertex was
    /// removed.
    pub fn delete_point(&mut self, index: usize) -> bool {
        match self {
            VectorMask::BoundingBox(_) => false,
            VectorMask::PolygonShape(p) => p.delete_point(index),
        }
    }

    pub fn contains(&self, nx: f64, ny: f64) -> bool {
        match self {
            VectorMask::BoundingBox(b) => b.contains(nx, ny),
            VectorMask::PolygonShape(p) => p.contains(nx, ny),
        }
    }

    /// Commit validation rule for this shape kind.
    pub fn is_valid(&self) -> bool {
        match self {
            VectorMask::BoundingBox(b) => b.is_valid(),
            VectorMask::PolygonShape(p) => p.is_valid(),
        }
    }
}
