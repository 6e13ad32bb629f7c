//! Document ingestion and similarity retrieval for research papers and patents.
//!
//! The pipeline ingests PDF files, classifies them (patent vs. paper), extracts
//! metadata, splits the text into overlapping chunks, embeds each chunk, and
//! stores the result in a relational store with vector-similarity search.
//! Queries are answered by embedding the query, ranking stored chunks by cosine
//! similarity, and optionally synthesizing an answer with a generative model.

pub mod config;
pub mod context;
pub mod datastore;
pub mod documents;
pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod objectstore;
pub mod retrieve;
pub mod server;

pub use config::Settings;
pub use context::AppContext;
pub use datastore::{DataStore, ScoredChunk};
pub use documents::{DocumentChunk, DocumentType, PendingChunk, TextChunker};
pub use embedding::Embedder;
pub use generation::Generator;
pub use ingest::{IngestPipeline, IngestReport};
pub use retrieve::QueryEngine;
