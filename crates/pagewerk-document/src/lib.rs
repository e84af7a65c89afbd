// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document: the image-to-PDF pipeline.
//
// External raster tool invocation, per-page compression under a concurrency
// bound, the multi-page merge gate, page geometry, PDF rendering and
// finalisation, and the assembler that runs it all end to end.

pub mod assemble;
pub mod image;
pub mod pdf;
pub mod process;
pub mod raster;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the primary structs so callers can use `pagewerk_document::DocumentAssembler` etc.
pub use assemble::DocumentAssembler;
pub use image::SourceImage;
pub use pdf::{PdfReader, PdfWriter};
pub use process::{ProcessInvoker, ProcessRunner};
pub use raster::{BatchCompressor, PageMerger, RasterCompressor, RasterTool};
