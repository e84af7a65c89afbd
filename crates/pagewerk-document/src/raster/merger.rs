// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merge of compressed pages into one density-tagged multi-page container.
//
// A merge command lists every page, so long documents can exceed the host's
// command-line limit. When that happens the command is rebuilt with bare file
// names and run from the pages' directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, info, instrument, warn};

use crate::process::ProcessInvoker;
use crate::raster::tool::{InputForm, RasterTool};

/// Merges pages through the external raster tool.
pub struct PageMerger<P> {
    invoker: Arc<P>,
    tool: RasterTool,
}

impl<P: ProcessInvoker> PageMerger<P> {
    pub fn new(invoker: Arc<P>, tool: RasterTool) -> Self {
        Self { invoker, tool }
    }

    /// Merge `images` into `target`, tagged with `dpi` pixels per inch.
    ///
    /// Returns the container path. Fails when the tool could not be run, wrote
    /// anything to stderr, or left no non-empty file at `target`.
    #[instrument(
        skip_all,
        fields(pages = images.len(), target = %target.display(), dpi = dpi, disable_compression = disable_compression)
    )]
    pub async fn merge(
        &self,
        images: &[PathBuf],
        target: &Path,
        dpi: u32,
        disable_compression: bool,
    ) -> Result<PathBuf> {
        if images.is_empty() {
            return Err(PagewerkError::Merge("no pages to merge".into()));
        }

        let mut invocation =
            self.tool
                .merge(images, target, dpi, disable_compression, InputForm::FullPath);
        if invocation.exceeds_limit() {
            let full_length = invocation.argument_len();
            invocation =
                self.tool
                    .merge(images, target, dpi, disable_compression, InputForm::FileName);
            info!(
                full_length,
                short_length = invocation.argument_len(),
                working_dir = %invocation.working_dir.display(),
                "Merge command too long, using file names"
            );
        }

        let result = self.invoker.invoke(&invocation).await?;
        if !result.success {
            warn!(reason = %result.message, "Merge command refused");
            return Err(PagewerkError::Merge(result.message));
        }
        if !result.error.is_empty() {
            warn!(stderr = %result.error, "Merge reported errors");
            return Err(PagewerkError::Merge(result.error));
        }

        match tokio::fs::metadata(target).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                debug!(bytes = meta.len(), "Merged container written");
                Ok(target.to_path_buf())
            }
            Ok(_) => Err(PagewerkError::Merge(format!(
                "{} is empty",
                target.display()
            ))),
            Err(_) => Err(PagewerkError::Merge(format!(
                "{} was not created",
                target.display()
            ))),
        }
    }
}
