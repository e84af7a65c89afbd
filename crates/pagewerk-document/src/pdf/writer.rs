// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: one page per image using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. Each page is exactly the size of its image; overlay
// text is emitted before the image so that it sits beneath it.

use pagewerk_core::error::{PagewerkError, Result};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::pdf::geometry::{POINTS_PER_INCH, PageGeometry, points_to_mm};

/// Font size of overlay text.
const OVERLAY_FONT_SIZE: f32 = 8.0;

/// One page to be written: decoded pixels, their layout, optional overlay.
pub struct ImagePage {
    pub image: RawImage,
    pub geometry: PageGeometry,
    pub overlay: Option<String>,
}

/// Renders image pages into a PDF byte stream.
pub struct PdfWriter {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Serialise `pages` into a PDF, in order.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn render(&self, pages: Vec<ImagePage>) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(PagewerkError::PdfError("document has no pages".into()));
        }
        info!(title = %self.title, "Rendering image PDF");

        let mut doc = PdfDocument::new(&self.title);
        let mut pdf_pages = Vec::with_capacity(pages.len());

        for (index, page) in pages.into_iter().enumerate() {
            let xobject_id = doc.add_image(&page.image);
            let geometry = page.geometry;

            let mut ops = Vec::new();
            if let Some(text) = page.overlay.filter(|text| !text.is_empty()) {
                ops.extend(overlay_ops(text));
            }
            ops.push(Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(geometry.scale),
                    scale_y: Some(geometry.scale),
                    dpi: Some(POINTS_PER_INCH),
                    rotate: None,
                },
            });

            debug!(
                page = index + 1,
                width_pt = geometry.width_pt,
                height_pt = geometry.height_pt,
                scale = geometry.scale,
                "Page laid out"
            );
            pdf_pages.push(PdfPage::new(
                Mm(points_to_mm(geometry.width_pt)),
                Mm(points_to_mm(geometry.height_pt)),
                ops,
            ));
        }

        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
        }
        debug!(bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

/// Text drawn at the page origin in the built-in Helvetica.
fn overlay_ops(text: String) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point {
                x: Pt(0.0),
                y: Pt(0.0),
            },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(OVERLAY_FONT_SIZE),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text)],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}
