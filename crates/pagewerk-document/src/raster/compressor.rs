// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page compression through the external raster tool.
//
// Two-colour pages compress best as Group 4 inside a TIFF; anything with more
// tones is smaller as a quality-parameterised JPEG. The opposite pairings make
// the output larger than the source, so they are never chosen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{CompressionMode, Quality};
use tracing::{debug, info, instrument, warn};

use crate::process::ProcessInvoker;
use crate::raster::tool::RasterTool;

/// Colour count assumed when the probe output is not a number.
pub const DEFAULT_COLOR_COUNT: u64 = 2;

/// Compression settings chosen for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionStrategy {
    pub mode: CompressionMode,
    pub quality: u8,
}

impl CompressionStrategy {
    /// Pick the strategy for an image with `colors` distinct colours.
    pub fn for_colors(colors: u64, quality: &Quality) -> Self {
        if colors > 2 {
            Self {
                mode: CompressionMode::LossyColor,
                quality: quality.color_quality,
            }
        } else {
            Self {
                mode: CompressionMode::Bilevel,
                quality: quality.black_white_quality,
            }
        }
    }

    pub fn target_extension(&self) -> &'static str {
        self.mode.target_extension()
    }
}

/// Compresses single pages, falling back to the source on any failure.
pub struct RasterCompressor<P> {
    invoker: Arc<P>,
    tool: RasterTool,
    quality: Quality,
    output_dir: PathBuf,
}

impl<P: ProcessInvoker> RasterCompressor<P> {
    pub fn new(invoker: Arc<P>, tool: RasterTool, quality: Quality, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            invoker,
            tool,
            quality,
            output_dir: output_dir.into(),
        }
    }

    /// Directory compressed artifacts are written into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Compress `source`, returning the artifact path, or `source` itself when
    /// compression produced nothing usable.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub async fn compress(&self, source: &Path) -> PathBuf {
        match self.try_compress(source).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                warn!("Compression produced no output, keeping original page");
                source.to_path_buf()
            }
            Err(err) => {
                warn!(error = %err, "Compression failed, keeping original page");
                source.to_path_buf()
            }
        }
    }

    /// Ask the tool how many distinct colours `source` contains.
    pub async fn probe_colors(&self, source: &Path) -> Result<u64> {
        let result = self.invoker.invoke(&self.tool.probe_colors(source)).await?;
        let colors = result
            .message
            .trim()
            .parse::<u64>()
            .unwrap_or(DEFAULT_COLOR_COUNT);
        debug!(colors, raw = %result.message, "Probed colour count");
        Ok(colors)
    }

    /// Where the compressed form of `source` is written for `strategy`.
    pub fn target_path(&self, source: &Path, strategy: &CompressionStrategy) -> Result<PathBuf> {
        let stem = source.file_stem().ok_or_else(|| {
            PagewerkError::Validation(format!("{} has no file name", source.display()))
        })?;
        let mut target = self.output_dir.join(stem);
        target.set_extension(strategy.target_extension());
        Ok(target)
    }

    async fn try_compress(&self, source: &Path) -> Result<Option<PathBuf>> {
        let colors = self.probe_colors(source).await?;
        let strategy = CompressionStrategy::for_colors(colors, &self.quality);
        let target = self.target_path(source, &strategy)?;

        // Concurrent tasks share the directory; create_dir_all tolerates a
        // directory that already exists.
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let invocation = self
            .tool
            .compress(strategy.mode, strategy.quality, source, &target);
        info!(
            colors,
            mode = strategy.mode.tool_keyword(),
            quality = strategy.quality,
            target = %target.display(),
            "Compressing page"
        );

        let result = self.invoker.invoke(&invocation).await?;
        if !result.success {
            return Err(PagewerkError::CommandTooLong {
                length: invocation.argument_len(),
                limit: crate::process::MAX_COMMAND_LENGTH,
            });
        }
        if !result.error.is_empty() {
            debug!(stderr = %result.error, "Raster tool reported diagnostics");
        }

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(Some(target)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedInvoker, write_jpeg};

    fn compressor(invoker: ScriptedInvoker, out: &Path) -> (Arc<ScriptedInvoker>, RasterCompressor<ScriptedInvoker>) {
        let invoker = Arc::new(invoker);
        let compressor = RasterCompressor::new(
            Arc::clone(&invoker),
            RasterTool::new("convert", "identify"),
            Quality::new(60, 80),
            out,
        );
        (invoker, compressor)
    }

    #[test]
    fn two_or_fewer_colours_choose_bilevel() {
        let quality = Quality::new(60, 80);
        for colors in [0, 1, 2] {
            let strategy = CompressionStrategy::for_colors(colors, &quality);
            assert_eq!(strategy.mode, CompressionMode::Bilevel);
            assert_eq!(strategy.quality, 80);
            assert_eq!(strategy.target_extension(), "tif");
        }
    }

    #[test]
    fn more_colours_never_choose_bilevel() {
        let quality = Quality::new(60, 80);
        for colors in [3, 256, 16_777_216] {
            let strategy = CompressionStrategy::for_colors(colors, &quality);
            assert_eq!(strategy.mode, CompressionMode::LossyColor);
            assert_eq!(strategy.quality, 60);
            assert_eq!(strategy.target_extension(), "jpg");
        }
    }

    #[tokio::test]
    async fn unparsable_probe_output_defaults_to_two_colours() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("scan.png");
        let invoker = ScriptedInvoker::new().with_colors(&source, "identify: improper image header");
        let (_, compressor) = compressor(invoker, &dir.path().join("out"));

        assert_eq!(compressor.probe_colors(&source).await.expect("probe"), 2);
    }

    #[tokio::test]
    async fn bilevel_page_is_written_as_tif() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a.jpg");
        write_jpeg(&source, 80, 100, 200);
        let out = dir.path().join("__compress__");
        let (invoker, compressor) = compressor(ScriptedInvoker::new().with_colors(&source, "2"), &out);

        let compressed = compressor.compress(&source).await;
        assert_eq!(compressed, out.join("a.tif"));
        assert!(compressed.exists());

        let calls = invoker.calls();
        let compress_call = calls
            .iter()
            .find(|call| call.has_flag("-compress"))
            .expect("compress invoked");
        assert!(compress_call.has_flag("Group4"));
        assert!(compress_call.rendered_args().contains("-quality 80"));
    }

    #[tokio::test]
    async fn colour_page_is_written_as_jpg() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("photo.png");
        write_jpeg(&source, 40, 40, 72);
        let out = dir.path().join("__compress__");
        let (invoker, compressor) =
            compressor(ScriptedInvoker::new().with_colors(&source, "48213"), &out);

        assert_eq!(compressor.compress(&source).await, out.join("photo.jpg"));
        assert!(invoker.calls().iter().any(|call| call.has_flag("LZW")));
    }

    #[tokio::test]
    async fn missing_output_returns_source_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a.jpg");
        write_jpeg(&source, 40, 40, 72);
        let invoker = ScriptedInvoker::new().failing_compression(&source);
        let (_, compressor) = compressor(invoker, &dir.path().join("out"));

        assert_eq!(compressor.compress(&source).await, source);
    }

    #[tokio::test]
    async fn empty_output_returns_source_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a.jpg");
        write_jpeg(&source, 40, 40, 72);
        let invoker = ScriptedInvoker::new().sized_output(&source, 0);
        let (_, compressor) = compressor(invoker, &dir.path().join("out"));

        assert_eq!(compressor.compress(&source).await, source);
    }

    #[tokio::test]
    async fn spawn_failure_returns_source_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a.jpg");
        let invoker = Arc::new(crate::process::ProcessRunner::new());
        let compressor = RasterCompressor::new(
            invoker,
            RasterTool::new("/nonexistent/convert", "/nonexistent/identify"),
            Quality::default(),
            dir.path().join("out"),
        );

        assert_eq!(compressor.compress(&source).await, source);
    }
}
