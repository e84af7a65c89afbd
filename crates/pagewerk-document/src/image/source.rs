// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A page image on disk: its path plus attributes read lazily from the file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::{DynamicImage, ImageReader};
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::ImageKind;
use printpdf::{RawImage, RawImageData, RawImageFormat};
use tracing::{debug, instrument};

use crate::image::resolution::{Resolution, read_resolution};

/// Pixel size and density of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub resolution: Resolution,
}

/// An image file whose header is read on first use.
///
/// The format is sniffed from content, not the extension: compressed artifacts
/// are named by strategy and the name is not proof of what the tool wrote.
#[derive(Debug)]
pub struct SourceImage {
    path: PathBuf,
    info: OnceLock<ImageInfo>,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            info: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::from_path(&self.path)
    }

    /// Pixel size and resolution, read from the file once.
    pub fn info(&self) -> Result<&ImageInfo> {
        if let Some(info) = self.info.get() {
            return Ok(info);
        }
        let info = self.read_info()?;
        Ok(self.info.get_or_init(|| info))
    }

    pub fn width(&self) -> Result<u32> {
        Ok(self.info()?.width)
    }

    pub fn height(&self) -> Result<u32> {
        Ok(self.info()?.height)
    }

    pub fn resolution(&self) -> Result<Resolution> {
        Ok(self.info()?.resolution)
    }

    fn read_info(&self) -> Result<ImageInfo> {
        let data = std::fs::read(&self.path)?;
        let (width, height) = ImageReader::new(std::io::Cursor::new(&data))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|err| self.image_error("read dimensions of", err))?;
        let resolution = read_resolution(&data);

        debug!(
            path = %self.path.display(),
            width,
            height,
            dpi_x = resolution.x,
            dpi_y = resolution.y,
            "Image header read"
        );
        Ok(ImageInfo {
            width,
            height,
            resolution,
        })
    }

    /// Decode the pixels into the form the PDF writer embeds. Greyscale stays
    /// single-channel; everything else is flattened to 8-bit RGB.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn decode(&self) -> Result<RawImage> {
        let decoded = ImageReader::open(&self.path)?
            .with_guessed_format()?
            .decode()
            .map_err(|err| self.image_error("decode", err))?;

        let (width, height) = (decoded.width() as usize, decoded.height() as usize);
        let (pixels, data_format) = match decoded {
            DynamicImage::ImageLuma8(gray) => (gray.into_raw(), RawImageFormat::R8),
            other => (other.to_rgb8().into_raw(), RawImageFormat::RGB8),
        };
        debug!(width, height, format = ?data_format, "Image decoded");

        Ok(RawImage {
            pixels: RawImageData::U8(pixels),
            width,
            height,
            data_format,
            tag: Vec::new(),
        })
    }

    fn image_error(&self, action: &str, err: image::ImageError) -> PagewerkError {
        PagewerkError::ImageError(format!(
            "failed to {action} {}: {err}",
            self.path.display()
        ))
    }
}
