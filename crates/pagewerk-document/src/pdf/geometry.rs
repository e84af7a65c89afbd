// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry derived from an image's pixel size and resolution.

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::DocumentVariant;

use crate::image::Resolution;

/// Resolution assumed by the standard variant for an axis reporting 0.
pub const FALLBACK_DPI: u32 = 92;

/// PostScript points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Convert a pixel length at `dpi` to points.
pub fn pixels_to_points(pixels: u32, dpi: u32) -> f32 {
    pixels as f32 / dpi as f32 * POINTS_PER_INCH
}

/// Convert points to millimetres.
pub fn points_to_mm(points: f32) -> f32 {
    points * 25.4 / POINTS_PER_INCH
}

/// Size of one page and the uniform scale that makes its image fill the page
/// width. The image is drawn at 72 dpi, so one pixel starts out as one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_pt: f32,
    pub height_pt: f32,
    pub scale: f32,
    pub dpi: Resolution,
}

impl PageGeometry {
    /// Lay out a `width`×`height` pixel image.
    ///
    /// The archival variant trusts the image's own density and refuses an
    /// axis without one; the standard variant substitutes [`FALLBACK_DPI`]
    /// per axis.
    pub fn for_image(
        width: u32,
        height: u32,
        resolution: Resolution,
        variant: DocumentVariant,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PagewerkError::PageGeometry(format!(
                "image has no pixels ({width}x{height})"
            )));
        }

        let dpi = match variant {
            DocumentVariant::Archival => {
                if !resolution.is_known() {
                    return Err(PagewerkError::PageGeometry(format!(
                        "archival page needs a resolution on both axes, got {}x{} dpi",
                        resolution.x, resolution.y
                    )));
                }
                resolution
            }
            DocumentVariant::Standard => Resolution::new(
                non_zero_or_fallback(resolution.x),
                non_zero_or_fallback(resolution.y),
            ),
        };

        let width_pt = pixels_to_points(width, dpi.x);
        let height_pt = pixels_to_points(height, dpi.y);
        Ok(Self {
            width_pt,
            height_pt,
            scale: width_pt / width as f32,
            dpi,
        })
    }
}

fn non_zero_or_fallback(dpi: u32) -> u32 {
    if dpi == 0 { FALLBACK_DPI } else { dpi }
}
