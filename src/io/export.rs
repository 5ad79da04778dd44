// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! COCO export.
//!
//! Serializes a document into the COCO `{images, annotations, categories}`
//! structure: one image entry, one fixed "object" category, one annotation
//! per mask in document order with ids starting at 1. All geometry is in
//! absolute image pixels.

use std::path::{Path, PathBuf};

use anyhow::Result;
use geo::{Area, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::models::document::Document;
use crate::models::mask::VectorMask;

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoDataset {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u32,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u32,
    pub image_id: u32,
    pub category_id: u32,
    pub bbox: [f64; 4],
    pub area: f64,
    pub segmentation: Vec<Vec<f64>>,
    pub iscrowd: u8,
}

/// Build the COCO structure for `doc` against the given image dimensions.
pub fn export_coco(doc: &Document, image_width: u32, image_height: u32) -> CocoDataset {
    let file_name = Path::new(&doc.src_file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let annotations = doc
        .vector_masks
        .iter()
        .enumerate()
        .map(|(i, mask)| annotation_for(mask, i as u32 + 1, image_width, image_height))
        .collect();

    CocoDataset {
        images: vec![CocoImage {
            id: 1,
            file_name,
            width: image_width,
            height: image_height,
        }],
        annotations,
        categories: vec![CocoCategory {
            id: 1,
            name: "object".into(),
            supercategory: "none".into(),
        }],
    }
}

/// Export `doc` as pretty JSON next to `document_path`, with a `_coco.json`
/// suffix. Returns the written path.
pub fn write_coco(
    doc: &Document,
    image_width: u32,
    image_height: u32,
    document_path: &Path,
) -> Result<PathBuf> {
    let dataset = export_coco(doc, image_width, image_height);
    let out_path = coco_output_path(document_path);
    std::fs::write(&out_path, serde_json::to_string_pretty(&dataset)?)?;
    Ok(out_path)
}

fn coco_output_path(document_path: &Path) -> PathBuf {
    let stem = document_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    document_path.with_file_name(format!("{stem}_coco.json"))
}

fn annotation_for(mask: &VectorMask, ann_id: u32, img_w: u32, img_h: u32) -> CocoAnnotation {
    let (w, h) = (img_w as f64, img_h as f64);
    match mask {
        VectorMask::BoundingBox(b) => {
            let (x_abs, y_abs, w_abs, h_abs) = (b.x * w, b.y * h, b.w * w, b.h * h);
            CocoAnnotation {
                id: ann_id,
                image_id: 1,
                category_id: 1,
                bbox: [x_abs, y_abs, w_abs, h_abs],
                area: w_abs * h_abs,
                segmentation: vec![vec![
                    x_abs,
                    y_abs,
                    x_abs + w_abs,
                    y_abs,
                    x_abs + w_abs,
                    y_abs + h_abs,
                    x_abs,
                    y_abs + h_abs,
                ]],
                iscrowd: 0,
            }
        }
        VectorMask::PolygonShape(p) => {
            let abs: Vec<(f64, f64)> = p.points.iter().map(|pt| (pt.x * w, pt.y * h)).collect();
            let mut flattened = Vec::with_capacity(abs.len() * 2);
            for &(x, y) in &abs {
                flattened.push(x);
                flattened.push(y);
            }

            let min_x = abs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
            let max_x = abs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
            let min_y = abs.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
            let max_y = abs.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

            let ring: LineString<f64> = abs
                .iter()
                .map(|&(x, y)| Coord { x, y })
                .collect::<Vec<_>>()
                .into();
            let area = Polygon::new(ring, vec![]).unsigned_area();

            CocoAnnotation {
                id: ann_id,
                image_id: 1,
                category_id: 1,
                bbox: [min_x, min_y, max_x - min_x, max_y - min_y],
                area,
                segmentation: vec![flattened],
                iscrowd: 0,
            }
        }
    }
}
