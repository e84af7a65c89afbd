// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembly: the whole pipeline from source images to a finished PDF.
//
// Sources are compressed in a bounded batch, merged once into a multi-page
// container as a gate (the container itself is discarded), validated, and then
// re-read one by one to build the pages. Intermediate artifacts are removed on
// every path out; original sources are never touched.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagewerk_core::PipelineConfig;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{ConversionResult, DocumentVariant, PageTextOverlay};
use tracing::{debug, error, info, instrument, warn};

use crate::image::SourceImage;
use crate::pdf::{ImagePage, PageGeometry, PdfReader, PdfWriter, conformance};
use crate::process::ProcessInvoker;
use crate::raster::{BatchCompressor, PageMerger, RasterCompressor, RasterTool};

/// A compressed page must be strictly larger than this many bytes.
pub const MIN_COMPRESSED_BYTES: f64 = 0.5 * 1027.0;

/// Extension of the merge-gate container, placed next to the target.
pub const CONTAINER_EXTENSION: &str = "tif";

/// Title used when none is configured and the target has no file stem.
const DEFAULT_TITLE: &str = "pagewerk document";

/// Runs the full conversion for a list of source images.
pub struct DocumentAssembler<P> {
    batch: BatchCompressor<P>,
    merger: PageMerger<P>,
    merge_density: u32,
    title: Option<String>,
    overlay: PageTextOverlay,
}

impl<P: ProcessInvoker> DocumentAssembler<P> {
    pub fn new(batch: BatchCompressor<P>, merger: PageMerger<P>, merge_density: u32) -> Self {
        Self {
            batch,
            merger,
            merge_density,
            title: None,
            overlay: PageTextOverlay::new(),
        }
    }

    /// Wire the compressor, batch, and merger from `config`, all sharing
    /// `invoker`.
    pub fn from_config(invoker: Arc<P>, config: &PipelineConfig) -> Self {
        let tool = RasterTool::from_config(config);
        let compressor = RasterCompressor::new(
            Arc::clone(&invoker),
            tool.clone(),
            config.quality,
            config.compress_dir(),
        );
        let batch = BatchCompressor::new(Arc::new(compressor), config.window_size);
        let merger = PageMerger::new(invoker, tool);

        let mut assembler = Self::new(batch, merger, config.merge_density);
        assembler.title = config.title.clone();
        assembler
    }

    /// Text drawn beneath each page's image, looked up by compressed path
    /// first and then by source path.
    pub fn with_overlay(mut self, overlay: PageTextOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Convert `sources`, in order, into one PDF at `target`.
    #[instrument(
        skip_all,
        fields(sources = sources.len(), target = %target.display(), variant = ?variant)
    )]
    pub async fn assemble(
        &self,
        sources: &[PathBuf],
        target: &Path,
        variant: DocumentVariant,
    ) -> ConversionResult {
        if sources.is_empty() {
            warn!("Nothing to assemble");
            return ConversionResult::failed("no source images");
        }
        info!("Assembling document");

        let images = self.batch.compress_all(sources).await;
        let outcome = self.build(sources, &images, target, variant).await;
        self.clean_up(&images, sources).await;

        match outcome {
            Ok(path) => {
                info!(path = %path.display(), pages = images.len(), "Document assembled");
                ConversionResult::succeeded(path)
            }
            Err(err) => {
                error!(error = %err, "Document assembly failed");
                ConversionResult::failed(err.to_string())
            }
        }
    }

    /// Merge `images` into `container`: once as is, then once more with the
    /// container's own compression disabled.
    pub async fn merge_gate(&self, images: &[PathBuf], container: &Path) -> ConversionResult {
        self.merge_with_retry(images, container).await.into()
    }

    async fn merge_with_retry(&self, images: &[PathBuf], container: &Path) -> Result<PathBuf> {
        match self
            .merger
            .merge(images, container, self.merge_density, false)
            .await
        {
            Ok(path) => Ok(path),
            Err(first) => {
                warn!(error = %first, "Merge failed, retrying without container compression");
                self.merger
                    .merge(images, container, self.merge_density, true)
                    .await
            }
        }
    }

    async fn build(
        &self,
        sources: &[PathBuf],
        images: &[PathBuf],
        target: &Path,
        variant: DocumentVariant,
    ) -> Result<PathBuf> {
        if let Some(parent) = target.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let container = target.with_extension(CONTAINER_EXTENSION);
        let gate = self.merge_with_retry(images, &container).await;
        remove_if_present(&container).await;
        gate?;
        debug!("Merge gate passed");

        validate(images, sources, variant).await?;

        let pages: Vec<(PathBuf, Option<String>)> = images
            .iter()
            .zip(sources)
            .map(|(image, source)| {
                let overlay = self
                    .overlay
                    .text_for(image)
                    .or_else(|| self.overlay.text_for(source))
                    .map(str::to_string);
                (image.clone(), overlay)
            })
            .collect();
        let title = self.title.clone().unwrap_or_else(|| default_title(target));
        let destination = target.to_path_buf();

        tokio::task::spawn_blocking(move || write_document(pages, &destination, variant, &title))
            .await
            .map_err(|err| PagewerkError::Task(format!("document writer: {err}")))??;

        Ok(target.to_path_buf())
    }

    /// Delete every intermediate page that is not an original source, then the
    /// compression directory if that left it empty.
    async fn clean_up(&self, images: &[PathBuf], sources: &[PathBuf]) {
        let originals: HashSet<&PathBuf> = sources.iter().collect();
        let mut removed = 0usize;
        for image in images.iter().filter(|image| !originals.contains(image)) {
            match tokio::fs::remove_file(image).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = %image.display(), error = %err, "Could not remove page"),
            }
        }

        let compress_dir = self.batch.compressor().output_dir();
        // Only succeeds when empty; another conversion may still be using it.
        if tokio::fs::remove_dir(compress_dir).await.is_ok() {
            debug!(dir = %compress_dir.display(), "Removed compression directory");
        }
        debug!(removed, "Intermediate pages cleaned up");
    }
}

/// Every page must exist and be larger than [`MIN_COMPRESSED_BYTES`]. The
/// archival variant also refuses pages that never got compressed.
async fn validate(images: &[PathBuf], sources: &[PathBuf], variant: DocumentVariant) -> Result<()> {
    let mut problems = Vec::new();

    if variant == DocumentVariant::Archival {
        let originals: HashSet<&PathBuf> = sources.iter().collect();
        problems.extend(
            images
                .iter()
                .filter(|image| originals.contains(image))
                .map(|image| format!("{} was not compressed", image.display())),
        );
    }

    for image in images {
        match tokio::fs::metadata(image).await {
            Ok(meta) if meta.is_file() && meta.len() as f64 > MIN_COMPRESSED_BYTES => {}
            Ok(meta) => problems.push(format!(
                "{} is too small ({} bytes)",
                image.display(),
                meta.len()
            )),
            Err(_) => problems.push(format!("{} does not exist", image.display())),
        }
    }

    if problems.is_empty() {
        return Ok(());
    }
    for problem in &problems {
        warn!(%problem, "Page rejected");
    }
    Err(PagewerkError::Validation(problems.join("; ")))
}

/// Lay out, render, finalise, and write the document. The bytes go to a
/// sibling `.part` file that is only renamed onto `target` once it reads back
/// with the expected number of pages.
fn write_document(
    pages: Vec<(PathBuf, Option<String>)>,
    target: &Path,
    variant: DocumentVariant,
    title: &str,
) -> Result<()> {
    let expected = pages.len();
    let mut image_pages = Vec::with_capacity(expected);

    for (path, overlay) in pages {
        let source = SourceImage::new(path);
        let info = *source.info()?;
        let geometry = PageGeometry::for_image(info.width, info.height, info.resolution, variant)
            .inspect_err(|err| {
                error!(path = %source.path().display(), error = %err, "Page cannot be laid out");
            })?;
        info!(
            path = %source.path().display(),
            width_pt = geometry.width_pt,
            height_pt = geometry.height_pt,
            dpi_x = geometry.dpi.x,
            dpi_y = geometry.dpi.y,
            "Page geometry"
        );
        image_pages.push(ImagePage {
            image: source.decode()?,
            geometry,
            overlay,
        });
    }

    let rendered = PdfWriter::new(title).render(image_pages)?;
    let finished = conformance::finalize(&rendered, variant, title)?;

    let partial = partial_path(target);
    let written = std::fs::write(&partial, &finished)
        .map_err(PagewerkError::from)
        .and_then(|()| verify_page_count(&partial, expected))
        .and_then(|()| std::fs::rename(&partial, target).map_err(PagewerkError::from));
    if written.is_err() {
        discard_partial(&partial);
    }
    written
}

fn discard_partial(partial: &Path) {
    match std::fs::remove_file(partial) {
        Ok(()) => debug!(path = %partial.display(), "Removed partial document"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %partial.display(), error = %err, "Could not remove partial document"),
    }
}

fn verify_page_count(path: &Path, expected: usize) -> Result<()> {
    let found = PdfReader::open(path)?.page_count();
    if found == expected {
        Ok(())
    } else {
        Err(PagewerkError::PdfError(format!(
            "written document has {found} pages, expected {expected}"
        )))
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn default_title(target: &Path) -> String {
    target
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed merge container"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "Could not remove merge container"),
    }
}
