// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! User interface components.

pub mod canvas;
pub mod toolbar;
