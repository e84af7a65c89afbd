// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: inspect a written document with the `lopdf` crate.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, instrument};

/// Read-only view of an existing PDF, used to verify assembled output.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            PagewerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PagewerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Header version, e.g. `"1.5"`.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// Width and height in points of every page, in page order. A page without
    /// its own `/MediaBox` inherits one from its `/Parent` chain.
    pub fn page_sizes(&self) -> Result<Vec<(f32, f32)>> {
        self.document
            .get_pages()
            .values()
            .map(|&page_id| self.media_box(page_id))
            .collect()
    }

    /// Raw XMP packet referenced from the catalog, if any.
    pub fn metadata_xmp(&self) -> Option<String> {
        let catalog = self.document.catalog().ok()?;
        let id = catalog.get(b"Metadata").ok()?.as_reference().ok()?;
        let stream = self.document.get_object(id).ok()?.as_stream().ok()?;
        Some(String::from_utf8_lossy(&stream.content).into_owned())
    }

    fn media_box(&self, page_id: ObjectId) -> Result<(f32, f32)> {
        let mut node = self.dictionary(page_id)?;
        loop {
            if let Ok(media_box) = node.get(b"MediaBox") {
                return self.box_size(media_box);
            }
            let parent = node
                .get(b"Parent")
                .and_then(Object::as_reference)
                .map_err(|_| {
                    PagewerkError::PdfError(format!("page {page_id:?} has no /MediaBox"))
                })?;
            node = self.dictionary(parent)?;
        }
    }

    fn box_size(&self, media_box: &Object) -> Result<(f32, f32)> {
        let media_box = match media_box {
            Object::Reference(id) => self.resolve(*id)?,
            other => other,
        };
        let corners = media_box
            .as_array()
            .map_err(|err| PagewerkError::PdfError(format!("/MediaBox is not an array: {err}")))?;
        let values: Vec<f32> = corners
            .iter()
            .map(Object::as_float)
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| PagewerkError::PdfError(format!("/MediaBox entry: {err}")))?;
        match values.as_slice() {
            [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => Err(PagewerkError::PdfError(format!(
                "/MediaBox has {} entries",
                values.len()
            ))),
        }
    }

    fn dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.resolve(id)?
            .as_dict()
            .map_err(|err| PagewerkError::PdfError(format!("object {id:?}: {err}")))
    }

    fn resolve(&self, id: ObjectId) -> Result<&Object> {
        self.document
            .get_object(id)
            .map_err(|err| PagewerkError::PdfError(format!("cannot read object {id:?}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// Two pages: one with its own MediaBox, one inheriting from the tree.
    fn two_page_document() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let own = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 288.into(), 360.into()],
        });
        let inherited = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![own.into(), inherited.into()],
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save");
        bytes
    }

    #[test]
    fn counts_pages_and_reads_version() {
        let reader = PdfReader::from_bytes(&two_page_document()).expect("load");
        assert_eq!(reader.page_count(), 2);
        assert_eq!(reader.version(), "1.5");
        assert!(reader.metadata_xmp().is_none());
    }

    #[test]
    fn media_box_is_inherited_from_parent() {
        let reader = PdfReader::from_bytes(&two_page_document()).expect("load");
        assert_eq!(
            reader.page_sizes().expect("sizes"),
            vec![(288.0, 360.0), (612.0, 792.0)]
        );
    }

    #[test]
    fn opens_from_the_filesystem() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, two_page_document()).expect("write");

        let reader = PdfReader::open(&path).expect("open");
        assert_eq!(reader.page_count(), 2);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(PdfReader::from_bytes(b"not a pdf").is_err());
    }
}
