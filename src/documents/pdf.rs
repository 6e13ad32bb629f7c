//! PDF text and property extraction.
//!
//! Text comes from `pdf-extract`, page by page so the classifier can look at
//! the first page alone. Container properties (title, author, creation date)
//! come from the PDF Info dictionary via `lopdf`; property extraction is
//! best-effort and never fails a document that still has extractable text.

use thiserror::Error;

use super::{UNKNOWN_AUTHORS, UNKNOWN_DATE};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to extract text: {0}")]
    Extraction(String),

    #[error("document contains no extractable text")]
    NoText,
}

/// Container-level metadata read from the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creation_date: Option<String>,
}

/// Best-effort paper metadata derived from container properties, with the
/// filename stem as the title fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperMetadata {
    pub title: String,
    pub authors: String,
    pub publication_date: String,
}

/// A parsed PDF: per-page text plus container properties.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pages: Vec<String>,
    properties: PdfProperties,
}

impl PdfDocument {
    /// Parse a PDF from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, PdfError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| PdfError::Extraction(e.to_string()))?;

        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(PdfError::NoText);
        }

        Ok(Self {
            pages,
            properties: read_properties(bytes),
        })
    }

    /// Build a document from already-extracted pages. Used by tests and by
    /// callers that source text elsewhere.
    pub fn from_pages(pages: Vec<String>, properties: PdfProperties) -> Self {
        Self { pages, properties }
    }

    /// Text of the first page, or empty if the document has none.
    pub fn first_page_text(&self) -> &str {
        self.pages.first().map(String::as_str).unwrap_or("")
    }

    /// Full document text, pages joined with a space.
    pub fn full_text(&self) -> String {
        self.pages.join(" ")
    }

    pub fn properties(&self) -> &PdfProperties {
        &self.properties
    }
}

/// Derive paper metadata from container properties and the filename.
pub fn extract_paper_metadata(properties: &PdfProperties, filename: &str) -> PaperMetadata {
    let title = properties
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| filename_stem(filename));

    let authors = properties
        .author
        .clone()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHORS.to_string());

    let publication_date = properties
        .creation_date
        .as_deref()
        .map(format_pdf_date)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    PaperMetadata {
        title,
        authors,
        publication_date,
    }
}

fn filename_stem(filename: &str) -> String {
    filename
        .strip_suffix(".pdf")
        .or_else(|| filename.strip_suffix(".PDF"))
        .unwrap_or(filename)
        .to_string()
}

/// Read the Info dictionary. Any failure along the way yields empty
/// properties; the caller falls back to filename and sentinels.
fn read_properties(bytes: &[u8]) -> PdfProperties {
    let Ok(doc) = lopdf::Document::load_mem(bytes) else {
        return PdfProperties::default();
    };

    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            lopdf::Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_dict().ok())
    else {
        return PdfProperties::default();
    };

    PdfProperties {
        title: info.get(b"Title").ok().and_then(decode_text_string),
        author: info.get(b"Author").ok().and_then(decode_text_string),
        creation_date: info.get(b"CreationDate").ok().and_then(decode_text_string),
    }
}

/// Decode a PDF text string: UTF-16BE when the BOM is present, otherwise
/// treated as byte text.
fn decode_text_string(obj: &lopdf::Object) -> Option<String> {
    let lopdf::Object::String(bytes, _) = obj else {
        return None;
    };

    let decoded = if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    let trimmed = decoded.trim().to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Turn a PDF date string (`D:YYYYMMDDHHmmSS...`) into `YYYY-MM-DD`, passing
/// through anything that does not follow the convention.
fn format_pdf_date(raw: &str) -> String {
    let digits = raw.strip_prefix("D:").unwrap_or(raw);
    if digits.len() >= 8 && digits[..8].bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &digits[..4], &digits[4..6], &digits[6..8])
    } else {
        raw.trim().to_string()
    }
}
