// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation document: committed masks, redo buffer, validated mutations.
//!
//! Insertion order is z-order (last mask is topmost). Deleting or undoing a
//! mask retires it to the redo buffer; redo re-appends it topmost. All
//! refusals are silent boolean results, never errors.

use super::mask::VectorMask;
use serde::{Deserialize, Serialize};

/// Kind of media the annotations refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Image,
    Video,
}

/// Complete annotation document for one media source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub src_file_path: String,
    pub src_file_type: SourceKind,
    pub vector_masks: Vec<VectorMask>,
    /// Masks retired by undo/delete, restorable by redo. Session-local.
    #[serde(skip)]
    redo_buffer: Vec<VectorMask>,
}

impl Document {
    pub fn new(src_file_path: String, src_file_type: SourceKind) -> Self {
        Self {
            src_file_path,
            src_file_type,
            vector_masks: Vec::new(),
            redo_buffer: Vec::new(),
        }
    }

    /// Append a mask if it passes its variant's validation rule.
    ///
    /// Returns whether the mask was appended; an invalid mask leaves the
    /// collection unchanged.
    pub fn append(&mut self, mask: VectorMask) -> bool {
        if !mask.is_valid() {
            log::info!("Rejected invalid mask (id {})", mask.id());
            return false;
        }
        self.vector_masks.push(mask);
        true
    }

    /// Remove a mask by identity, retiring it to the redo buffer.
    /// No-op if the id is not present.
    pub fn delete(&mut self, id: &str) {
        if let Some(idx) = self.vector_masks.iter().position(|m| m.id() == id) {
            let mask = self.vector_masks.remove(idx);
            self.redo_buffer.push(mask);
            log::info!("Deleted mask {}, total: {}", id, self.vector_masks.len());
        }
    }

    /// Retire the live mask with the maximum creation timestamp.
    ///
    /// Deliberately not last-action undo: editing a mask does not refresh
    /// its timestamp, so an older, unedited mask can be removed instead of
    /// the most recently changed one.
    pub fn undo(&mut self) {
        let newest = self
            .vector_masks
            .iter()
            .enumerate()
            .max_by_key(|(_, m)| m.ts())
            .map(|(idx, _)| idx);
        if let Some(idx) = newest {
            let mask = self.vector_masks.remove(idx);
            log::info!("Undo retired mask {}", mask.id());
            self.redo_buffer.push(mask);
        }
    }

    /// Restore the most recently retired mask, re-appended topmost.
    /// Returns whether anything was restored.
    pub fn redo(&mut self) -> bool {
        match self.redo_buffer.pop() {
            Some(mask) => {
                log::info!("Redo restored mask {}", mask.id());
                self.vector_masks.push(mask);
                true
            }
            None => false,
        }
    }

    /// Empty the live collection. The redo buffer is left untouched, so
    /// this cannot be undone.
    pub fn clear(&mut self) {
        self.vector_masks.clear();
    }

    pub fn get(&self, id: &str) -> Option<&VectorMask> {
        self.vector_masks.iter().find(|m| m.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut VectorMask> {
        self.vector_masks.iter_mut().find(|m| m.id() == id)
    }

    /// Topmost-first hit test: the last-inserted mask wins.
    pub fn hit_test(&self, nx: f64, ny: f64) -> Option<&VectorMask> {
        self.vector_masks.iter().rev().find(|m| m.contains(nx, ny))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mask::{BoundingBox, NormalizedPoint, PolygonShape};

    fn boxed(id: &str, ts: i64, w: f64, h: f64) -> VectorMask {
        let mut b = BoundingBox::anchored_at(NormalizedPoint::new(0.1, 0.1));
        b.update(NormalizedPoint::new(0.1 + w, 0.1 + h));
        b.id = id.to_string();
        b.ts = ts;
        VectorMask::BoundingBox(b)
    }

    fn triangle(id: &str, ts: i64) -> VectorMask {
        VectorMask::PolygonShape(PolygonShape {
            points: vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(0.5, 0.0),
                NormalizedPoint::new(0.5, 0.5),
            ],
            id: id.to_string(),
            ts,
        })
    }

    #[test]
    fn test_append_rejects_small_box() {
        let mut doc = Document::default();
        assert!(!doc.append(boxed("a", 1, 0.008, 0.5)));
        assert!(!doc.append(boxed("b", 2, 0.5, 0.005)));
        assert!(doc.vector_masks.is_empty());
        assert!(doc.append(boxed("c", 3, 0.5, 0.5)));
        assert_eq!(doc.vector_masks.len(), 1);
    }

    #[test]
    fn test_append_rejects_degenerate_polygon() {
        let mut doc = Document::default();
        let degenerate = VectorMask::PolygonShape(PolygonShape {
            points: vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(0.5, 0.0),
            ],
            id: "p".into(),
            ts: 1,
        });
        assert!(!doc.append(degenerate));
        assert!(doc.vector_masks.is_empty());
        assert!(doc.append(triangle("t", 2)));
    }

    #[test]
    fn test_undo_picks_max_timestamp_regardless_of_order() {
        for reversed in [false, true] {
            let mut doc = Document::default();
            let (a, b) = (boxed("a", 10, 0.2, 0.2), boxed("b", 20, 0.2, 0.2));
            if reversed {
                assert!(doc.append(b.clone()));
                assert!(doc.append(a.clone()));
            } else {
                assert!(doc.append(a.clone()));
                assert!(doc.append(b.clone()));
            }

            doc.undo();
            assert_eq!(doc.vector_masks.len(), 1);
            assert_eq!(doc.vector_masks[0].id(), "a");

            // Redo restores the same identity, topmost.
            assert!(doc.redo());
            assert_eq!(doc.vector_masks.len(), 2);
            assert_eq!(doc.vector_masks.last().unwrap().id(), "b");
        }
    }

    #[test]
    fn test_undo_redo_restores_set_of_identities() {
        let mut doc = Document::default();
        doc.append(boxed("a", 1, 0.3, 0.3));
        doc.append(triangle("b", 2));
        doc.append(boxed("c", 3, 0.4, 0.4));

        let before: Vec<String> = doc.vector_masks.iter().map(|m| m.id().to_string()).collect();
        doc.undo();
        doc.redo();
        let mut after: Vec<String> = doc.vector_masks.iter().map(|m| m.id().to_string()).collect();
        let mut expected = before.clone();
        expected.sort();
        after.sort();
        assert_eq!(after, expected);
    }

    #[test]
    fn test_redo_on_empty_buffer_is_noop() {
        let mut doc = Document::default();
        doc.append(boxed("a", 1, 0.3, 0.3));
        assert!(!doc.redo());
        assert_eq!(doc.vector_masks.len(), 1);
    }

    #[test]
    fn test_delete_retires_to_redo_buffer() {
        let mut doc = Document::default();
        doc.append(boxed("a", 1, 0.3, 0.3));
        doc.delete("a");
        assert!(doc.vector_masks.is_empty());
        assert!(doc.redo());
        assert_eq!(doc.vector_masks[0].id(), "a");

        // Deleting an unknown id is a no-op.
        doc.delete("nope");
        assert_eq!(doc.vector_masks.len(), 1);
    }

    #[test]
    fn test_clear_is_irreversible() {
        let mut doc = Document::default();
        doc.append(boxed("a", 1, 0.3, 0.3));
        doc.append(boxed("b", 2, 0.3, 0.3));
        doc.clear();
        assert!(doc.vector_masks.is_empty());
        assert!(!doc.redo());
    }

    #[test]
    fn test_hit_test_topmost_first() {
        let mut doc = Document::default();
        doc.append(boxed("bottom", 1, 0.5, 0.5));
        doc.append(boxed("top", 2, 0.5, 0.5));
        assert_eq!(doc.hit_test(0.3, 0.3).unwrap().id(), "top");
        assert!(doc.hit_test(0.95, 0.95).is_none());
    }

    #[test]
    fn test_document_serialization_roundtrip() {
        let mut doc = Document::new("frames/cam0.png".into(), SourceKind::Image);
        doc.append(boxed("a", 1, 0.3, 0.3));
        doc.append(triangle("b", 2));
        doc.delete("a"); // redo buffer must not serialize

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"src_file_type\":\"image\""));
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back.vector_masks.len(), 1);
        assert_eq!(back.vector_masks[0].id(), "b");
        assert!(!back.clone().redo());
    }
}
