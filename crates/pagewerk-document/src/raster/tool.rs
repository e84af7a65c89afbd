// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Argument grammar of the external raster tool (ImageMagick-compatible).

use std::path::{Path, PathBuf};

use pagewerk_core::PipelineConfig;
use pagewerk_core::types::CompressionMode;

use crate::process::{Arg, Invocation};

/// How merge inputs are spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputForm {
    /// Full paths, run from the current directory.
    FullPath,
    /// Bare file names, run from the first input's directory.
    FileName,
}

/// Locations of the raster tool binaries and the commands built for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterTool {
    convert: PathBuf,
    identify: PathBuf,
}

impl RasterTool {
    pub fn new(convert: impl Into<PathBuf>, identify: impl Into<PathBuf>) -> Self {
        Self {
            convert: convert.into(),
            identify: identify.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.convert_path(), config.identify_path())
    }

    /// `identify -format %k <source>`: prints the number of distinct colours.
    pub fn probe_colors(&self, source: &Path) -> Invocation {
        Invocation::new(&self.identify).args([
            Arg::flag("-format"),
            Arg::flag("%k"),
            Arg::path(source),
        ])
    }

    /// `convert -compress <mode> -quality <q> <source> <target>`.
    pub fn compress(
        &self,
        mode: CompressionMode,
        quality: u8,
        source: &Path,
        target: &Path,
    ) -> Invocation {
        Invocation::new(&self.convert).args([
            Arg::flag("-compress"),
            Arg::flag(mode.tool_keyword()),
            Arg::flag("-quality"),
            Arg::flag(quality.to_string()),
            Arg::path(source),
            Arg::path(target),
        ])
    }

    /// `convert -density <dpi> -units PixelsPerInch [+compress] -adjoin <inputs…> <target>`.
    ///
    /// With [`InputForm::FileName`] the inputs are reduced to their file names
    /// and the command runs from the first input's parent directory. The target
    /// is made absolute there, so a relative target still lands where the
    /// caller expects it.
    pub fn merge(
        &self,
        inputs: &[PathBuf],
        target: &Path,
        dpi: u32,
        disable_compression: bool,
        form: InputForm,
    ) -> Invocation {
        let mut invocation = Invocation::new(&self.convert).args([
            Arg::flag("-density"),
            Arg::flag(dpi.to_string()),
            Arg::flag("-units"),
            Arg::flag("PixelsPerInch"),
        ]);
        if disable_compression {
            invocation = invocation.arg(Arg::flag("+compress"));
        }
        invocation = invocation.arg(Arg::flag("-adjoin"));

        match form {
            InputForm::FullPath => {
                invocation = invocation
                    .args(inputs.iter().map(|input| Arg::path(input)))
                    .arg(Arg::path(target));
            }
            InputForm::FileName => {
                invocation = invocation.args(
                    inputs
                        .iter()
                        .map(|input| Arg::path(input.file_name().map(PathBuf::from).unwrap_or_default())),
                );
                if let Some(dir) = inputs.first().and_then(|first| first.parent()) {
                    invocation = invocation.current_dir(dir);
                }
                let target = std::path::absolute(target).unwrap_or_else(|_| target.to_path_buf());
                invocation = invocation.arg(Arg::path(target));
            }
        }

        invocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> RasterTool {
        RasterTool::new("/opt/im/convert", "/opt/im/identify")
    }

    #[test]
    fn probe_uses_identify() {
        let invocation = tool().probe_colors(Path::new("/in/a.png"));
        assert_eq!(invocation.program, PathBuf::from("/opt/im/identify"));
        assert_eq!(invocation.rendered_args(), "-format %k \"/in/a.png\"");
    }

    #[test]
    fn compress_orders_mode_quality_source_target() {
        let invocation = tool().compress(
            CompressionMode::Bilevel,
            80,
            Path::new("/in/a.png"),
            Path::new("/tmp/__compress__/a.tif"),
        );
        assert_eq!(
            invocation.rendered_args(),
            "-compress Group4 -quality 80 \"/in/a.png\" \"/tmp/__compress__/a.tif\""
        );
    }

    #[test]
    fn merge_places_optional_flag_before_adjoin() {
        let inputs = vec![PathBuf::from("/c/a.tif"), PathBuf::from("/c/b.jpg")];
        let plain = tool().merge(&inputs, Path::new("/out/doc.tif"), 200, false, InputForm::FullPath);
        assert_eq!(
            plain.rendered_args(),
            "-density 200 -units PixelsPerInch -adjoin \"/c/a.tif\" \"/c/b.jpg\" \"/out/doc.tif\""
        );

        let uncompressed =
            tool().merge(&inputs, Path::new("/out/doc.tif"), 200, true, InputForm::FullPath);
        assert!(uncompressed.rendered_args().contains("PixelsPerInch +compress -adjoin"));
    }

    #[test]
    fn file_name_form_runs_from_first_input_directory() {
        let inputs = vec![PathBuf::from("/c/a.tif"), PathBuf::from("/c/b.jpg")];
        let invocation =
            tool().merge(&inputs, Path::new("/out/doc.tif"), 200, false, InputForm::FileName);
        assert_eq!(invocation.working_dir, PathBuf::from("/c"));
        assert_eq!(
            invocation.rendered_args(),
            "-density 200 -units PixelsPerInch -adjoin \"a.tif\" \"b.jpg\" \"/out/doc.tif\""
        );
    }

    #[test]
    fn file_name_form_makes_relative_target_absolute() {
        let inputs = vec![PathBuf::from("/c/a.tif")];
        let relative = Path::new(".temp/__final__/doc.tif");
        let invocation = tool().merge(&inputs, relative, 200, false, InputForm::FileName);

        let target = invocation.path_args().last().expect("target");
        assert!(target.is_absolute());
        assert_eq!(target, std::env::current_dir().expect("cwd").join(relative));

        let full = tool().merge(&inputs, relative, 200, false, InputForm::FullPath);
        assert_eq!(full.path_args().last(), Some(relative));
    }
}
