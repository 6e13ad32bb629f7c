//! Ingestion pipeline: files in, embedded chunks persisted, per-file report out.
//!
//! Each file is classified, its metadata extracted along the matching path,
//! its text chunked, and the chunks embedded in batches. A file that cannot
//! be read or parsed is skipped and reported; it never aborts the batch.
//! Chunks whose embedding batch failed are excluded from persistence and
//! counted per file.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ChunkingConfig, EmbeddingConfig};
use crate::datastore::{DataStore, DataStoreError};
use crate::documents::{
    DocumentChunk, DocumentType, PdfDocument, PendingChunk, TextChunker, extract_paper_metadata,
    extract_patent_metadata,
};
use crate::embedding::{Embedder, embed_pending};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{filename} contains no extractable text")]
    EmptyDocument { filename: String },
}

/// A file handed to the pipeline: original name plus raw bytes.
#[derive(Debug, Clone)]
pub struct NamedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of one file within an ingestion request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// The file was chunked and stored. `skipped` counts chunks dropped
    /// because their embedding batch failed.
    Ingested { chunks: usize, skipped: usize },

    /// The file could not be processed and was skipped entirely.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Aggregate result of an ingestion request: every file accounted for, plus
/// the number of chunks actually persisted.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub files: Vec<FileOutcome>,
    pub chunks_stored: usize,
}

/// A processed batch before persistence: chunks ready to store and the
/// per-file bookkeeping to report.
pub struct ProcessedBatch {
    pub chunks: Vec<DocumentChunk>,
    pub outcomes: Vec<FileOutcome>,
}

pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    datastore: Arc<dyn DataStore>,
    batch_size: usize,
}

impl IngestPipeline {
    pub fn new(
        chunking: &ChunkingConfig,
        embedding: &EmbeddingConfig,
        embedder: Arc<dyn Embedder>,
        datastore: Arc<dyn DataStore>,
    ) -> Self {
        Self {
            chunker: TextChunker::new(chunking.chunk_size, chunking.overlap),
            embedder,
            datastore,
            batch_size: embedding.batch_size,
        }
    }

    /// Ingest raw files: parse, process, and append to the store.
    pub async fn ingest_files(&self, files: Vec<NamedFile>) -> Result<IngestReport, DataStoreError> {
        let batch = self.process_files(files).await;
        self.store(batch).await
    }

    /// Parse raw PDFs off the async runtime, then process the survivors.
    /// Parse failures become per-file outcomes.
    pub async fn process_files(&self, files: Vec<NamedFile>) -> ProcessedBatch {
        let mut documents = Vec::new();
        let mut failures = Vec::new();

        for file in files {
            let name = file.name.clone();
            let parsed =
                tokio::task::spawn_blocking(move || PdfDocument::parse(&file.bytes)).await;

            match parsed {
                Ok(Ok(document)) => documents.push((name, document)),
                Ok(Err(e)) => {
                    tracing::warn!(target: "ingest", "skipping {name}: {e}");
                    failures.push(FileOutcome {
                        filename: name,
                        status: FileStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", "skipping {name}: parse task failed: {e}");
                    failures.push(FileOutcome {
                        filename: name,
                        status: FileStatus::Failed {
                            reason: format!("parse task failed: {e}"),
                        },
                    });
                }
            }
        }

        let mut batch = self.process_documents(documents).await;
        batch.outcomes.extend(failures);
        batch
    }

    /// Chunk and embed already-parsed documents.
    pub async fn process_documents(
        &self,
        documents: Vec<(String, PdfDocument)>,
    ) -> ProcessedBatch {
        let mut pending = Vec::new();
        let mut outcomes = Vec::new();
        let mut ordinal = 0;

        for (filename, document) in documents {
            match prepare_chunks(&self.chunker, &filename, &document, &mut ordinal) {
                Ok(chunks) => {
                    tracing::debug!(
                        target: "ingest",
                        "{filename}: {} chunks prepared",
                        chunks.len()
                    );
                    pending.extend(chunks);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", "skipping {filename}: {e}");
                    outcomes.push(FileOutcome {
                        filename,
                        status: FileStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        let embedded = embed_pending(self.embedder.as_ref(), pending, self.batch_size).await;

        // Tally per file: persisted chunks vs. ones dropped by a failed batch.
        let mut stored: HashMap<String, usize> = HashMap::new();
        let mut skipped: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut chunks = Vec::new();

        for chunk in embedded {
            if !order.contains(&chunk.source_filename) {
                order.push(chunk.source_filename.clone());
            }
            if chunk.embedding.is_some() {
                *stored.entry(chunk.source_filename.clone()).or_default() += 1;
                if let Some(chunk) = chunk.into_chunk() {
                    chunks.push(chunk);
                }
            } else {
                *skipped.entry(chunk.source_filename.clone()).or_default() += 1;
            }
        }

        for filename in order {
            let status = FileStatus::Ingested {
                chunks: stored.get(&filename).copied().unwrap_or(0),
                skipped: skipped.get(&filename).copied().unwrap_or(0),
            };
            outcomes.push(FileOutcome { filename, status });
        }

        ProcessedBatch { chunks, outcomes }
    }

    /// Append a processed batch to the store and build the report.
    pub async fn store(&self, batch: ProcessedBatch) -> Result<IngestReport, DataStoreError> {
        let chunks_stored = batch.chunks.len();
        self.datastore.add(&batch.chunks).await?;

        tracing::info!(
            target: "ingest",
            "stored {chunks_stored} chunks from {} files",
            batch.outcomes.len()
        );
        Ok(IngestReport {
            files: batch.outcomes,
            chunks_stored,
        })
    }
}

/// Classify one document, extract metadata along the matching path, and chunk
/// its text.
fn prepare_chunks(
    chunker: &TextChunker,
    filename: &str,
    document: &PdfDocument,
    ordinal: &mut usize,
) -> Result<Vec<PendingChunk>, IngestError> {
    let first_page = document.first_page_text();

    let (title, authors, publication_date) = match DocumentType::classify(first_page) {
        DocumentType::Patent => {
            let meta = extract_patent_metadata(first_page);
            let title = if meta.title == crate::documents::NOT_FOUND {
                filename.trim_end_matches(".pdf").to_string()
            } else {
                meta.title
            };
            // Patents have no author field; inventors and assignee stand in.
            let authors = format!(
                "Inventors: {}; Assignee: {}",
                meta.inventors, meta.assignee
            );
            (title, authors, meta.publication_date)
        }
        DocumentType::Paper => {
            let meta = extract_paper_metadata(document.properties(), filename);
            (meta.title, meta.authors, meta.publication_date)
        }
    };

    let text = document.full_text();
    if text.trim().is_empty() {
        return Err(IngestError::EmptyDocument {
            filename: filename.to_string(),
        });
    }

    let chunks = chunker
        .split(&text)
        .into_iter()
        .map(|content| {
            let chunk = PendingChunk {
                ordinal: *ordinal,
                source_filename: filename.to_string(),
                title: title.clone(),
                authors: authors.clone(),
                publication_date: publication_date.clone(),
                content,
                embedding: None,
            };
            *ordinal += 1;
            chunk
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{PdfProperties, UNKNOWN_AUTHORS};

    fn chunker() -> TextChunker {
        TextChunker::new(200, 20)
    }

    fn patent_doc() -> PdfDocument {
        let first_page = "\
(12) United States Patent\n\
(10) Patent No.: US 9,876,543\n\
(45) Date of Patent: Mar. 14, 2023\n\
(54) SIGNAL PROCESSING DEVICE\n\
(72) Inventors: Jane Doe, Austin, TX (US)\n\
(73) Assignee: Widget Works LLC\n"
            .to_string();
        let body = "The invention relates to signal processing. ".repeat(12);
        PdfDocument::from_pages(vec![first_page, body], PdfProperties::default())
    }

    fn paper_doc() -> PdfDocument {
        let properties = PdfProperties {
            title: Some("A Study of Things".to_string()),
            author: None,
            creation_date: Some("D:20220601".to_string()),
        };
        let body = "We analyze things at length. ".repeat(20);
        PdfDocument::from_pages(vec!["Abstract. We study things.".to_string(), body], properties)
    }

    #[test]
    fn test_patent_path_combines_inventors_and_assignee() {
        let mut ordinal = 0;
        let chunks = prepare_chunks(&chunker(), "pat.pdf", &patent_doc(), &mut ordinal).unwrap();

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].title, "SIGNAL PROCESSING DEVICE");
        assert_eq!(
            chunks[0].authors,
            "Inventors: Jane Doe, Austin, TX (US); Assignee: Widget Works LLC"
        );
        assert_eq!(chunks[0].publication_date, "Mar. 14, 2023");
    }

    #[test]
    fn test_paper_path_uses_properties_and_fallbacks() {
        let mut ordinal = 0;
        let chunks = prepare_chunks(&chunker(), "study.pdf", &paper_doc(), &mut ordinal).unwrap();

        assert_eq!(chunks[0].title, "A Study of Things");
        assert_eq!(chunks[0].authors, UNKNOWN_AUTHORS);
        assert_eq!(chunks[0].publication_date, "2022-06-01");
    }

    #[test]
    fn test_ordinals_are_contiguous_across_documents() {
        let mut ordinal = 0;
        let a = prepare_chunks(&chunker(), "a.pdf", &patent_doc(), &mut ordinal).unwrap();
        let b = prepare_chunks(&chunker(), "b.pdf", &paper_doc(), &mut ordinal).unwrap();

        let ordinals: Vec<usize> = a.iter().chain(b.iter()).map(|c| c.ordinal).collect();
        let expected: Vec<usize> = (0..ordinals.len()).collect();
        assert_eq!(ordinals, expected);
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let mut ordinal = 0;
        let doc = PdfDocument::from_pages(vec!["  \n ".to_string()], PdfProperties::default());
        let err = prepare_chunks(&chunker(), "empty.pdf", &doc, &mut ordinal).unwrap_err();
        assert!(matches!(err, IngestError::EmptyDocument { .. }));
    }
}
