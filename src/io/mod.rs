// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations: media decode, document files, COCO export, settings.

pub mod export;
pub mod media;
pub mod serialization;
pub mod settings;
