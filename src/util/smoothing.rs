// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! One-shot freehand polygon cleanup.
//!
//! Resamples a raw polygon along an interpolating closed spline, removes
//! self-intersections, and thins vertices to a minimum physical spacing.
//! Spacing is measured in millimeters on the display so the result is
//! independent of image resolution. Runs only on explicit request; this is
//! CPU-bound work that must stay off the per-frame path.

use std::collections::HashMap;

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line};

use crate::models::mask::{NormalizedPoint, PolygonShape, MIN_POLYGON_POINTS};

/// Physical display geometry and spacing threshold for smoothing.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingParams {
    pub screen_width_mm: f64,
    pub screen_height_mm: f64,
    /// Minimum distance between surviving vertices, in millimeters.
    pub min_spacing_mm: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        // 15.6" 16:9 panel; close enough when the real size is unknown.
        Self {
            screen_width_mm: 344.0,
            screen_height_mm: 194.0,
            min_spacing_mm: 3.0,
        }
    }
}

/// Smooth a polygon's vertex list in place.
///
/// Leaves the polygon unchanged when the geometry is degenerate: unknown
/// image size, fewer than 3 distinct vertices, or a result that would drop
/// below the minimum vertex count.
pub fn smooth_polygon(
    polygon: &mut PolygonShape,
    img_w: u32,
    img_h: u32,
    params: &SmoothingParams,
) {
    if img_w == 0 || img_h == 0 {
        return;
    }

    // Normalized -> image pixels -> physical millimeters.
    let scale_x = params.screen_width_mm / img_w as f64;
    let scale_y = params.screen_height_mm / img_h as f64;
    if scale_x <= 0.0 || scale_y <= 0.0 {
        return;
    }
    let raw_mm: Vec<(f64, f64)> = polygon
        .points
        .iter()
        .map(|p| ((p.x * img_w as f64) * scale_x, (p.y * img_h as f64) * scale_y))
        .collect();

    let control = dedup_consecutive(&raw_mm);
    if control.len() < MIN_POLYGON_POINTS {
        log::info!(
            "Skipping smoothing: only {} distinct vertices",
            control.len()
        );
        return;
    }

    // Dense resample of the closed interpolating curve.
    let perimeter = closed_perimeter(&control);
    let n_samples = ((perimeter / (params.min_spacing_mm / 2.0)).ceil() as usize)
        .max(2 * control.len())
        .max(2);
    let sampled = sample_closed_curve(&control, n_samples);

    // Resolve self-intersections; keep the most-vertexed simple component.
    let components = split_into_simple_components(&sampled);
    let simple = match components.into_iter().max_by_key(|c| c.len()) {
        Some(c) => c,
        None => return,
    };

    // Thin to the minimum spacing, then back to normalized coordinates.
    let thinned = enforce_min_spacing(&simple, params.min_spacing_mm);
    if thinned.len() < MIN_POLYGON_POINTS {
        return;
    }

    polygon.points = thinned
        .iter()
        .map(|&(x, y)| NormalizedPoint::new(x / (img_w as f64 * scale_x), y / (img_h as f64 * scale_y)))
        .collect();
    log::info!(
        "Smoothed polygon {}: {} -> {} vertices",
        polygon.id,
        raw_mm.len(),
        polygon.points.len()
    );
}

fn dedup_consecutive(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for &p in points {
        match out.last() {
            Some(&last) if dist(last, p) < 1e-9 => {}
            _ => out.push(p),
        }
    }
    // The path is treated as closed; a trailing copy of the head is noise.
    if out.len() > 1 && dist(out[0], *out.last().unwrap()) < 1e-9 {
        out.pop();
    }
    out
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn closed_perimeter(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    (0..n).map(|i| dist(points[i], points[(i + 1) % n])).sum()
}

/// Evaluate a uniform Catmull-Rom segment at `u` in [0,1].
///
/// Interpolating: u = 0 yields `p1`, u = 1 yields `p2`.
fn catmull_rom(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), u: f64) -> (f64, f64) {
    let eval = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b
            + (c - a) * u
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * u * u
            + (3.0 * b - a - 3.0 * c + d) * u * u * u)
    };
    (
        eval(p0.0, p1.0, p2.0, p3.0),
        eval(p0.1, p1.1, p2.1, p3.1),
    )
}

/// Sample a closed interpolating spline through `control` at `n_samples`
/// evenly spaced parameters. Periodic boundary via modular indexing.
fn sample_closed_curve(control: &[(f64, f64)], n_samples: usize) -> Vec<(f64, f64)> {
    let n = control.len();
    let mut out = Vec::with_capacity(n_samples);
    for k in 0..n_samples {
        let t = k as f64 * n as f64 / n_samples as f64;
        let i = (t.floor() as usize) % n;
        let u = t - t.floor();
        out.push(catmull_rom(
            control[(i + n - 1) % n],
            control[i],
            control[(i + 1) % n],
            control[(i + 2) % n],
            u,
        ));
    }
    out
}

fn quantize(p: (f64, f64)) -> (i64, i64) {
    ((p.0 * 1e9).round() as i64, (p.1 * 1e9).round() as i64)
}

/// Split a closed polyline into simple (non-self-intersecting) components.
///
/// Proper crossings are noded into both segments, then loops are peeled
/// off wherever the walk revisits a junction. A simple input comes back as
/// a single component. Components shorter than a triangle are dropped.
fn split_into_simple_components(ring: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let n = ring.len();
    if n < 4 {
        return vec![ring.to_vec()];
    }

    // Proper pairwise crossings, recorded per segment with their position
    // along it so multiple hits on one segment stay ordered.
    let mut cuts: Vec<Vec<(f64, (f64, f64))>> = vec![Vec::new(); n];
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        let seg_i = Line::new(Coord { x: a.0, y: a.1 }, Coord { x: b.0, y: b.1 });
        for j in (i + 2)..n {
            // The closing segment is adjacent to segment 0.
            if i == 0 && j == n - 1 {
                continue;
            }
            let c = ring[j];
            let d = ring[(j + 1) % n];
            let seg_j = Line::new(Coord { x: c.0, y: c.1 }, Coord { x: d.0, y: d.1 });
            if let Some(LineIntersection::SinglePoint {
                intersection,
                is_proper: true,
            }) = line_intersection(seg_i, seg_j)
            {
                let p = (intersection.x, intersection.y);
                cuts[i].push((param_along(a, b, p), p));
                cuts[j].push((param_along(c, d, p), p));
            }
        }
    }

    // Noded traversal: every vertex plus crossings in walk order.
    let mut noded = Vec::with_capacity(n);
    for i in 0..n {
        noded.push(ring[i]);
        cuts[i].sort_by(|x, y| x.0.total_cmp(&y.0));
        for &(_, p) in &cuts[i] {
            noded.push(p);
        }
    }

    // Peel loops at revisited junctions.
    let mut components = Vec::new();
    let mut path: Vec<(f64, f64)> = Vec::new();
    let mut seen: HashMap<(i64, i64), usize> = HashMap::new();
    for &pt in &noded {
        let key = quantize(pt);
        if let Some(&start) = seen.get(&key) {
            let component = path[start..].to_vec();
            if component.len() >= MIN_POLYGON_POINTS {
                components.push(component);
            }
            for p in &path[start + 1..] {
                seen.remove(&quantize(*p));
            }
            path.truncate(start + 1);
        } else {
            seen.insert(key, path.len());
            path.push(pt);
        }
    }
    if path.len() >= MIN_POLYGON_POINTS {
        components.push(path);
    }

    if components.is_empty() {
        vec![ring.to_vec()]
    } else {
        components
    }
}

fn param_along(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let len2 = (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2);
    if len2 == 0.0 {
        return 0.0;
    }
    ((p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1)) / len2
}

/// Keep a vertex only if it is at least `spacing` away from the last kept
/// one. The first vertex is always kept.
fn enforce_min_spacing(points: &[(f64, f64)], spacing: f64) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    for &p in points {
        match out.last() {
            Some(&last) if dist(last, p) < spacing => {}
            _ => out.push(p),
        }
    }
    out
}
