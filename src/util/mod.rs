// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Geometry and smoothing utilities.

pub mod geometry;
pub mod smoothing;
