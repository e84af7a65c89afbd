// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page geometry, rendering image pages, finalising the file for
// its variant, and reading it back for verification.

pub mod conformance;
pub mod geometry;
pub mod reader;
pub mod writer;

pub use conformance::finalize;
pub use geometry::{FALLBACK_DPI, PageGeometry};
pub use reader::PdfReader;
pub use writer::{ImagePage, PdfWriter};
