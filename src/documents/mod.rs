//! Document types and the ingestion-side text processing.
//!
//! This module provides:
//! - The stored chunk record and its in-memory pre-persistence form
//! - Overlapping text chunking
//! - Document classification (patent vs. paper) and metadata extraction
//! - PDF text and property extraction

pub mod chunker;
pub mod classify;
pub mod pdf;

pub use chunker::TextChunker;
pub use classify::{DocumentType, PatentMetadata, extract_patent_metadata};
pub use pdf::{PaperMetadata, PdfDocument, PdfError, PdfProperties, extract_paper_metadata};

use serde::{Deserialize, Serialize};

/// Sentinel for a patent field whose structural marker did not match.
pub const NOT_FOUND: &str = "Not Found";

/// Sentinel for a paper with no author property.
pub const UNKNOWN_AUTHORS: &str = "Unknown Authors";

/// Sentinel for a paper with no creation-date property.
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// A stored, searchable unit of document text.
///
/// Chunks are created during ingestion, persisted once, and never updated;
/// re-embedding means replacing the row, not mutating it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Original file identifier.
    pub source_filename: String,

    /// Best-effort extracted title.
    pub title: String,

    /// Best-effort extracted authors (for patents: inventors and assignee).
    pub authors: String,

    /// Best-effort extracted publication date.
    pub publication_date: String,

    /// Contiguous slice of the source document's text. Non-empty.
    pub content: String,

    /// Embedding vector. Fixed dimensionality per deployment.
    pub embedding: Vec<f32>,
}

/// An ingestion-time chunk that may not have an embedding yet.
///
/// The ordinal is assigned at creation and carried through the embedding step
/// so vectors are keyed back to chunks explicitly rather than by re-aligning
/// indices across the whole run. Chunks whose embedding is still `None` after
/// the embedding step are never persisted.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    /// Position of this chunk within the ingestion run.
    pub ordinal: usize,

    pub source_filename: String,
    pub title: String,
    pub authors: String,
    pub publication_date: String,
    pub content: String,

    /// Attached by the embedding step; `None` means the chunk's batch failed.
    pub embedding: Option<Vec<f32>>,
}

impl PendingChunk {
    /// Convert into a persistable chunk, or `None` if no embedding was attached.
    pub fn into_chunk(self) -> Option<DocumentChunk> {
        self.embedding.map(|embedding| DocumentChunk {
            source_filename: self.source_filename,
            title: self.title,
            authors: self.authors,
            publication_date: self.publication_date,
            content: self.content,
            embedding,
        })
    }
}
