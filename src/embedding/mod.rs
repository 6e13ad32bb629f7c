//! Embedding capability.
//!
//! The pipeline depends on an [`Embedder`] that turns text into fixed-length
//! vectors; the concrete implementation runs a local ONNX model. Batch calls
//! return vectors positionally aligned with their inputs, which the batch
//! orchestrator pins back onto chunks by ordinal.

pub mod batch;
pub mod local;

pub use batch::embed_pending;
pub use local::FastEmbedEmbedder;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("failed to generate embedding: {0}")]
    Backend(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Text-to-vector capability.
///
/// `embed_documents` must return one vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a batch of document texts. The result is positionally aligned
    /// with the input.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Vector dimensionality this embedder produces.
    fn dimension(&self) -> usize;
}
