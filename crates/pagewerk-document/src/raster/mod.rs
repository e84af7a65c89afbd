// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module: per-page compression, bounded batch compression, and the
// multi-page merge, all driven through the external raster tool.

pub mod batch;
pub mod compressor;
pub mod merger;
pub mod tool;

pub use batch::BatchCompressor;
pub use compressor::{CompressionStrategy, RasterCompressor};
pub use merger::PageMerger;
pub use tool::{InputForm, RasterTool};
