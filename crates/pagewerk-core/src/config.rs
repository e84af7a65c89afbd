// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration and on-disk layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PagewerkError, Result};
use crate::types::{ConversionId, DocumentVariant, Quality};

/// Subdirectory of the temp root holding compressed page artifacts.
pub const COMPRESS_DIR_NAME: &str = "__compress__";

/// Subdirectory of the temp root holding finished documents.
pub const FINAL_DIR_NAME: &str = "__final__";

/// Default number of pages compressed concurrently.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Settings for one conversion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory containing the raster tool binaries (`convert`, `identify`).
    pub tool_dir: PathBuf,
    /// Root for intermediate and final artifacts.
    pub temp_dir: PathBuf,
    /// Directory the bootstrap binary collects source images from.
    pub image_dir: PathBuf,
    /// Quality parameters for per-page compression.
    pub quality: Quality,
    /// Density (pixels per inch) tagged on the merged container.
    pub merge_density: u32,
    /// Maximum number of pages compressed concurrently.
    pub window_size: usize,
    /// Standard or archival output.
    pub variant: DocumentVariant,
    /// Title written into the document information.
    pub title: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tool_dir: PathBuf::from("/usr/local/bin"),
            temp_dir: PathBuf::from(".temp"),
            image_dir: PathBuf::from(".image"),
            quality: Quality::default(),
            merge_density: 200,
            window_size: DEFAULT_WINDOW_SIZE,
            variant: DocumentVariant::Standard,
            title: None,
        }
    }
}

impl PipelineConfig {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        info!(path = %path.display(), "Loaded pipeline configuration");
        config.validated()
    }

    /// Normalise values the pipeline cannot work with.
    pub fn validated(mut self) -> Result<Self> {
        if self.window_size == 0 {
            return Err(PagewerkError::Config("window_size must be at least 1".into()));
        }
        if self.merge_density == 0 {
            return Err(PagewerkError::Config("merge_density must be at least 1".into()));
        }
        self.quality = self.quality.clamped();
        debug!(
            quality = ?self.quality,
            window_size = self.window_size,
            merge_density = self.merge_density,
            "Configuration validated"
        );
        Ok(self)
    }

    /// Path of the tool used for compression and merging.
    pub fn convert_path(&self) -> PathBuf {
        self.tool_dir.join(executable_name("convert"))
    }

    /// Path of the tool used for probing image properties.
    pub fn identify_path(&self) -> PathBuf {
        self.tool_dir.join(executable_name("identify"))
    }

    /// Directory compressed page artifacts are written into.
    pub fn compress_dir(&self) -> PathBuf {
        self.temp_dir.join(COMPRESS_DIR_NAME)
    }

    /// Default location of the finished document for a conversion.
    pub fn final_path(&self, id: &ConversionId) -> PathBuf {
        self.temp_dir.join(FINAL_DIR_NAME).join(format!("{id}.pdf"))
    }
}

fn executable_name(stem: &str) -> String {
    if cfg!(windows) {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}
