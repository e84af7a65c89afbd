// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resolution (pixels per inch) read straight from image file headers.
//
// The decoder in the `image` crate does not expose density. EXIF resolution
// tags (TIFF, or APP1 in JPEG) are read with `exif`, PNG pHYs with `png`. The
// JFIF APP0 segment and the BMP info header are small fixed layouts read
// directly. A format without density (GIF) reports 0 on both axes.

use std::io::Cursor;

use exif::{In, Tag, Value};
use tracing::debug;

const CM_PER_INCH: f64 = 2.54;
const METRES_PER_INCH: f64 = 0.0254;

/// Horizontal and vertical resolution in dots per inch; 0 means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    pub x: u32,
    pub y: u32,
}

impl Resolution {
    pub const UNKNOWN: Self = Self { x: 0, y: 0 };

    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Both axes carry a density.
    pub fn is_known(&self) -> bool {
        self.x > 0 && self.y > 0
    }
}

/// Unit a header expresses its density in.
#[derive(Debug, Clone, Copy)]
enum DensityUnit {
    Inch,
    Centimetre,
    Metre,
}

impl DensityUnit {
    fn to_dpi(self, value: f64) -> u32 {
        let dpi = match self {
            Self::Inch => value,
            Self::Centimetre => value * CM_PER_INCH,
            Self::Metre => value * METRES_PER_INCH,
        };
        if dpi.is_finite() && dpi > 0.0 {
            dpi.round() as u32
        } else {
            0
        }
    }
}

/// Read the resolution of an encoded image, sniffing the format from its
/// leading bytes.
pub fn read_resolution(data: &[u8]) -> Resolution {
    let resolution = if data.starts_with(&[0xFF, 0xD8]) {
        jfif_density(data).or_else(|| exif_resolution(data))
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        png_resolution(data)
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        exif_resolution(data)
    } else if data.starts_with(b"BM") {
        bmp_resolution(data)
    } else {
        None
    };

    let resolution = resolution.unwrap_or(Resolution::UNKNOWN);
    debug!(x = resolution.x, y = resolution.y, "Header resolution");
    resolution
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(data.get(at..at + 2)?.try_into().ok()?))
}

fn le_i32(data: &[u8], at: usize) -> Option<i32> {
    Some(i32::from_le_bytes(data.get(at..at + 4)?.try_into().ok()?))
}

// ---------------------------------------------------------------------------
// JFIF
// ---------------------------------------------------------------------------

const JFIF_ID: &[u8] = b"JFIF\0";

/// JFIF puts APP0 straight after SOI: marker (2), length (2), "JFIF\0",
/// version (2), units (1), x density (2), y density (2).
fn jfif_density(data: &[u8]) -> Option<Resolution> {
    if data.get(2..4)? != [0xFF, 0xE0] {
        return None;
    }
    let body = data.get(6..)?;
    if !body.starts_with(JFIF_ID) {
        return None;
    }
    let unit = match *body.get(7)? {
        1 => DensityUnit::Inch,
        2 => DensityUnit::Centimetre,
        // 0 is an aspect ratio only.
        _ => return None,
    };
    let x = be_u16(body, 8)?;
    let y = be_u16(body, 10)?;
    Some(Resolution::new(
        unit.to_dpi(f64::from(x)),
        unit.to_dpi(f64::from(y)),
    ))
}

// ---------------------------------------------------------------------------
// EXIF (TIFF files and JPEG APP1)
// ---------------------------------------------------------------------------

fn exif_resolution(data: &[u8]) -> Option<Resolution> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;

    let rational = |tag: Tag| -> Option<f64> {
        match &exif.get_field(tag, In::PRIMARY)?.value {
            Value::Rational(values) => values
                .first()
                .filter(|value| value.denom != 0)
                .map(|value| value.to_f64()),
            _ => None,
        }
    };
    // Inches unless stated otherwise.
    let unit = match exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
    {
        None | Some(2) => DensityUnit::Inch,
        Some(3) => DensityUnit::Centimetre,
        Some(_) => return None,
    };

    let x = rational(Tag::XResolution)?;
    let y = rational(Tag::YResolution)?;
    Some(Resolution::new(unit.to_dpi(x), unit.to_dpi(y)))
}

// ---------------------------------------------------------------------------
// PNG
// ---------------------------------------------------------------------------

fn png_resolution(data: &[u8]) -> Option<Resolution> {
    let reader = png::Decoder::new(Cursor::new(data)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    // An unspecified unit is an aspect ratio only.
    if dims.unit != png::Unit::Meter {
        return None;
    }
    Some(Resolution::new(
        DensityUnit::Metre.to_dpi(f64::from(dims.xppu)),
        DensityUnit::Metre.to_dpi(f64::from(dims.yppu)),
    ))
}

// ---------------------------------------------------------------------------
// BMP
// ---------------------------------------------------------------------------

/// BITMAPINFOHEADER stores pels per metre at offsets 38 and 42.
fn bmp_resolution(data: &[u8]) -> Option<Resolution> {
    let x = le_i32(data, 38)?;
    let y = le_i32(data, 42)?;
    Some(Resolution::new(
        DensityUnit::Metre.to_dpi(f64::from(x)),
        DensityUnit::Metre.to_dpi(f64::from(y)),
    ))
}
