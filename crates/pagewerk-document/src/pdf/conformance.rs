// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Final pass over a rendered document: header version, file identifier, the
// document information dictionary, and for the archival variant an XMP packet
// declaring PDF/A-1b. The information dictionary and the XMP packet carry the
// same title, tool names, and timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::DocumentVariant;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Byte-order mark opening an XMP packet.
const BOM: char = '\u{feff}';

/// Name recorded as creator and producer.
const PRODUCER: &str = concat!("pagewerk ", env!("CARGO_PKG_VERSION"));

/// Rewrite `pdf` for `variant`.
#[instrument(skip(pdf), fields(bytes = pdf.len()))]
pub fn finalize(pdf: &[u8], variant: DocumentVariant, title: &str) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(pdf)
        .map_err(|err| PagewerkError::PdfError(format!("cannot reload rendered PDF: {err}")))?;

    let now = Utc::now();
    doc.version = variant.pdf_version().to_string();
    set_file_id(&mut doc);
    set_document_info(&mut doc, title, now)?;
    if variant == DocumentVariant::Archival {
        embed_pdfa_metadata(&mut doc, title, now)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| PagewerkError::PdfError(format!("failed to serialise PDF: {err}")))?;
    debug!(version = %doc.version, bytes = output.len(), "PDF finalised");
    Ok(output)
}

/// Both halves of the trailer `/ID` start out equal for a new file.
fn set_file_id(doc: &mut Document) {
    let id = Uuid::new_v4().as_bytes().to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

/// Rewrite `/Info` with our title, tool names, and dates, dropping the empty
/// entries the renderer leaves behind.
fn set_document_info(doc: &mut Document, title: &str, now: DateTime<Utc>) -> Result<()> {
    let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
        Ok(id) => id,
        Err(_) => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };
    let info = doc
        .get_object_mut(info_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| PagewerkError::PdfError(format!("document info unreadable: {err}")))?;

    let empty: Vec<Vec<u8>> = info
        .iter()
        .filter(|(_, value)| matches!(value, Object::String(bytes, _) if bytes.is_empty()))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &empty {
        info.remove(key);
    }

    let date = pdf_date(now);
    info.set("Title", text_string(title));
    info.set("Creator", text_string(PRODUCER));
    info.set("Producer", text_string(PRODUCER));
    info.set("CreationDate", Object::string_literal(date.clone()));
    info.set("ModDate", Object::string_literal(date));
    debug!(dropped = empty.len(), "Document information rewritten");
    Ok(())
}

/// `D:YYYYMMDDHHmmSS+00'00'`, always in UTC.
fn pdf_date(at: DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

/// ASCII stays a literal string; anything else is UTF-16BE behind a BOM.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn embed_pdfa_metadata(doc: &mut Document, title: &str, now: DateTime<Utc>) -> Result<()> {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let packet = xmp_packet(title, &timestamp);

    // PDF/A requires the metadata stream to stay uncompressed.
    let mut stream = Stream::new(
        dictionary! {
            "Type" => "Metadata",
            "Subtype" => "XML",
        },
        packet.into_bytes(),
    );
    stream.allows_compression = false;
    let metadata_id = doc.add_object(stream);

    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|err| PagewerkError::PdfError(format!("trailer has no /Root: {err}")))?;
    doc.get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| PagewerkError::PdfError(format!("catalog unreadable: {err}")))?
        .set("Metadata", Object::Reference(metadata_id));

    debug!(?metadata_id, "XMP metadata embedded");
    Ok(())
}

/// XMP packet carrying the PDF/A identification schema and the basic
/// descriptive properties mirrored from the document information.
fn xmp_packet(title: &str, timestamp: &str) -> String {
    let title = escape_xml(title);
    format!(
        r#"<?xpacket begin="{BOM}" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmlns:pdfaid="http://www.aiim.org/pdfa/ns/id/"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:pdf="http://ns.adobe.com/pdf/1.3/">
   <pdfaid:part>1</pdfaid:part>
   <pdfaid:conformance>B</pdfaid:conformance>
   <dc:format>application/pdf</dc:format>
   <dc:title><rdf:Alt><rdf:li xml:lang="x-default">{title}</rdf:li></rdf:Alt></dc:title>
   <xmp:CreateDate>{timestamp}</xmp:CreateDate>
   <xmp:ModifyDate>{timestamp}</xmp:ModifyDate>
   <xmp:CreatorTool>{PRODUCER}</xmp:CreatorTool>
   <pdf:Producer>{PRODUCER}</pdf:Producer>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
