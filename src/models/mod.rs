// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data model.

pub mod document;
pub mod mask;
