// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewerk conversion pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionId(pub Uuid);

impl ConversionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Captured outcome of one external process invocation.
///
/// `success` means the process was started and both streams were drained; it
/// says nothing about the tool's own exit status. Callers judge the logical
/// outcome from `error` and from the artifacts the tool left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    /// Captured standard output.
    pub message: String,
    /// Captured standard error.
    pub error: String,
    /// Exit code, when the process ran and exited normally.
    pub exit_code: Option<i32>,
}

impl CommandResult {
    /// The process ran to completion.
    pub fn completed(message: String, error: String, exit_code: Option<i32>) -> Self {
        Self {
            success: true,
            message,
            error,
            exit_code,
        }
    }

    /// The invocation was refused before any process was started.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            message: reason.into(),
            error: String::new(),
            exit_code: None,
        }
    }
}

/// Verdict of a conversion stage, carrying the produced artifact on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    /// Path of the produced artifact; `None` on failure.
    pub result: Option<PathBuf>,
    pub message: String,
}

impl ConversionResult {
    pub fn succeeded(result: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            message: message.into(),
        }
    }
}

impl From<crate::error::Result<PathBuf>> for ConversionResult {
    fn from(outcome: crate::error::Result<PathBuf>) -> Self {
        match outcome {
            Ok(path) => Self::succeeded(path),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

/// Quality parameters handed to the external raster tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    /// Used with lossy colour compression.
    pub color_quality: u8,
    /// Used with lossless bilevel compression.
    pub black_white_quality: u8,
}

impl Quality {
    pub fn new(color_quality: u8, black_white_quality: u8) -> Self {
        Self {
            color_quality,
            black_white_quality,
        }
    }

    /// Clamp both parameters into the tool's accepted `1..=100` range.
    pub fn clamped(self) -> Self {
        Self {
            color_quality: self.color_quality.clamp(1, 100),
            black_white_quality: self.black_white_quality.clamp(1, 100),
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self {
            color_quality: 60,
            black_white_quality: 80,
        }
    }
}

/// Compression scheme requested from the raster tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionMode {
    /// Lossless CCITT Group 4, for two-colour content.
    Bilevel,
    /// Quality-parameterised encoding for multi-tone content.
    LossyColor,
}

impl CompressionMode {
    /// Value passed to the tool's `-compress` option.
    pub fn tool_keyword(&self) -> &'static str {
        match self {
            Self::Bilevel => "Group4",
            Self::LossyColor => "LZW",
        }
    }

    /// Extension of the container the compressed page is written into.
    pub fn target_extension(&self) -> &'static str {
        match self {
            Self::Bilevel => "tif",
            Self::LossyColor => "jpg",
        }
    }
}

/// Flavour of the final document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentVariant {
    /// Plain PDF 1.5.
    #[default]
    Standard,
    /// PDF/A-1b with embedded XMP metadata.
    Archival,
}

impl DocumentVariant {
    /// PDF header version written for this variant.
    pub fn pdf_version(&self) -> &'static str {
        match self {
            Self::Standard => "1.5",
            Self::Archival => "1.4",
        }
    }
}

/// Raster formats accepted as conversion sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Gif,
}

impl ImageKind {
    /// Infer the image kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Infer the image kind from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Per-page text drawn beneath the image, keyed by the image path.
///
/// Populated by an external recogniser; the pipeline only renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTextOverlay(HashMap<PathBuf, String>);

impl PageTextOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: impl Into<PathBuf>, text: impl Into<String>) {
        self.0.insert(image.into(), text.into());
    }

    pub fn text_for(&self, image: &Path) -> Option<&str> {
        self.0.get(image).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
