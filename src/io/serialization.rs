// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Document serialization and deserialization.
//!
//! Documents are stored as tagged-variant JSON or YAML, selected by file
//! extension. The redo buffer is session-local and never persisted.

use crate::models::document::Document;
use anyhow::{bail, Result};
use std::path::Path;

/// Save a document, picking the format from the file extension.
pub fn save_document(doc: &Document, path: &Path) -> Result<()> {
    match extension(path).as_deref() {
        Some("yaml") | Some("yml") => export_yaml(doc, path),
        Some("json") => export_json(doc, path),
        other => bail!("Unsupported document extension: {:?}", other),
    }
}

/// Load a document, picking the format from the file extension.
pub fn load_document(path: &Path) -> Result<Document> {
    match extension(path).as_deref() {
        Some("yaml") | Some("yml") => import_yaml(path),
        Some("json") => import_json(path),
        other => bail!("Unsupported document extension: {:?}", other),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|s| s.to_string_lossy().to_lowercase())
}

/// Export a document to YAML format.
pub fn export_yaml(doc: &Document, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(doc)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export a document to JSON format.
pub fn export_json(doc: &Document, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import a document from YAML format.
pub fn import_yaml(path: &Path) -> Result<Document> {
    let yaml = std::fs::read_to_string(path)?;
    let doc = serde_yaml::from_str(&yaml)?;
    Ok(doc)
}

/// Import a document from JSON format.
pub fn import_json(path: &Path) -> Result<Document> {
    let json = std::fs::read_to_string(path)?;
    let doc = serde_json::from_str(&json)?;
    Ok(doc)
}
