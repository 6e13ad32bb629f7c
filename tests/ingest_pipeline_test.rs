//! End-to-end ingestion scenario with stub capabilities.
//!
//! One patent-formatted document and one research paper go through the full
//! pipeline: both metadata-extraction paths run, every persisted chunk
//! carries an embedding of the configured dimensionality, and the report
//! names both files. A corrupt file is skipped and reported without aborting
//! the batch.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use sara::config::{ChunkingConfig, EmbeddingConfig};
use sara::datastore::{DataStore, DataStoreError, ScoredChunk};
use sara::documents::{DocumentChunk, PdfDocument, PdfProperties};
use sara::embedding::{Embedder, EmbeddingError};
use sara::ingest::{FileStatus, IngestPipeline, NamedFile};

const DIM: usize = 8;

struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![0.5; DIM])
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32; DIM])
            .collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<DocumentChunk>>,
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn initialize(&self, chunks: &[DocumentChunk]) -> Result<(), DataStoreError> {
        *self.rows.lock().unwrap() = chunks.to_vec();
        Ok(())
    }

    async fn add(&self, chunks: &[DocumentChunk]) -> Result<(), DataStoreError> {
        self.rows.lock().unwrap().extend_from_slice(chunks);
        Ok(())
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, DataStoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .take(top_k)
            .map(|c| ScoredChunk {
                source_filename: c.source_filename.clone(),
                title: c.title.clone(),
                authors: c.authors.clone(),
                publication_date: c.publication_date.clone(),
                content: c.content.clone(),
                similarity: 1.0,
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, DataStoreError> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }

    async fn close(&self) {}
}

fn pipeline(store: Arc<MemoryStore>) -> IngestPipeline {
    let chunking = ChunkingConfig {
        chunk_size: 300,
        overlap: 30,
    };
    let embedding = EmbeddingConfig {
        model: "stub".to_string(),
        dimension: DIM,
        batch_size: 5,
    };
    IngestPipeline::new(&chunking, &embedding, Arc::new(StubEmbedder), store)
}

fn patent_document() -> PdfDocument {
    let first_page = "\
(12) United States Patent\n\
(10) Patent No.: US 10,555,123\n\
(45) Date of Patent: Jan. 9, 2024\n\
(54) DISTRIBUTED CACHE WARMING\n\
(72) Inventors: Maria Chen, Seattle, WA (US)\n\
(73) Assignee: CacheCo, Inc.\n"
        .to_string();
    let body = "The cache warming subsystem predicts access patterns. ".repeat(20);
    PdfDocument::from_pages(vec![first_page, body], PdfProperties::default())
}

fn paper_document() -> PdfDocument {
    let properties = PdfProperties {
        title: Some("Cache Warming Strategies".to_string()),
        author: Some("M. Chen, L. Okafor".to_string()),
        creation_date: Some("D:20230310120000Z".to_string()),
    };
    let body = "We evaluate several strategies for pre-populating caches. ".repeat(20);
    PdfDocument::from_pages(
        vec!["Abstract. Caches benefit from warming.".to_string(), body],
        properties,
    )
}

#[tokio::test]
async fn ingests_patent_and_paper_through_distinct_paths() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(store.clone());

    let batch = pipeline
        .process_documents(vec![
            ("patent.pdf".to_string(), patent_document()),
            ("paper.pdf".to_string(), paper_document()),
        ])
        .await;
    let report = pipeline.store(batch).await.unwrap();

    // Both files are named in the report, both as successes.
    assert_eq!(report.files.len(), 2);
    let names: Vec<&str> = report.files.iter().map(|f| f.filename.as_str()).collect();
    assert!(names.contains(&"patent.pdf"));
    assert!(names.contains(&"paper.pdf"));
    for outcome in &report.files {
        assert!(matches!(
            outcome.status,
            FileStatus::Ingested { chunks, skipped: 0 } if chunks > 0
        ));
    }

    let rows = store.rows.lock().unwrap();
    assert_eq!(rows.len(), report.chunks_stored);
    assert!(!rows.is_empty());

    // Every persisted chunk has a fixed-dimensionality embedding.
    for row in rows.iter() {
        assert_eq!(row.embedding.len(), DIM);
        assert!(!row.content.is_empty());
    }

    // The patent path combined inventors and assignee; the paper path used
    // container properties.
    let patent_row = rows
        .iter()
        .find(|r| r.source_filename == "patent.pdf")
        .unwrap();
    assert_eq!(patent_row.title, "DISTRIBUTED CACHE WARMING");
    assert_eq!(
        patent_row.authors,
        "Inventors: Maria Chen, Seattle, WA (US); Assignee: CacheCo, Inc."
    );
    assert_eq!(patent_row.publication_date, "Jan. 9, 2024");

    let paper_row = rows
        .iter()
        .find(|r| r.source_filename == "paper.pdf")
        .unwrap();
    assert_eq!(paper_row.title, "Cache Warming Strategies");
    assert_eq!(paper_row.authors, "M. Chen, L. Okafor");
    assert_eq!(paper_row.publication_date, "2023-03-10");
}

#[tokio::test]
async fn corrupt_file_is_reported_without_aborting_the_batch() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(store.clone());

    let report = pipeline
        .ingest_files(vec![NamedFile {
            name: "broken.pdf".to_string(),
            bytes: b"this is not a pdf at all".to_vec(),
        }])
        .await
        .unwrap();

    assert_eq!(report.chunks_stored, 0);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].filename, "broken.pdf");
    assert!(matches!(
        report.files[0].status,
        FileStatus::Failed { .. }
    ));
}

#[tokio::test]
async fn chunks_from_one_document_preserve_source_order() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(store.clone());

    let batch = pipeline
        .process_documents(vec![("paper.pdf".to_string(), paper_document())])
        .await;
    pipeline.store(batch).await.unwrap();

    // Adjacent stored chunks overlap by the configured amount, in order.
    let rows = store.rows.lock().unwrap();
    assert!(rows.len() > 1);
    for pair in rows.windows(2) {
        let tail: String = pair[0]
            .content
            .chars()
            .skip(pair[0].content.chars().count() - 30)
            .collect();
        let head: String = pair[1].content.chars().take(30).collect();
        assert_eq!(tail, head);
    }
}
