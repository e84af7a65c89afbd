// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: page images on disk and the density stored in their headers.

pub mod resolution;
pub mod source;

pub use resolution::{Resolution, read_resolution};
pub use source::{ImageInfo, SourceImage};
