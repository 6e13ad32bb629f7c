//! Datastore capability: initialize/add/search over stored chunks.
//!
//! The interface is polymorphic over backend; the concrete backend targets a
//! relational store with vector-similarity ordering. Backend selection is an
//! explicit match on the configured `kind` — an unknown kind fails fast at
//! construction, never silently falling back to a default.

pub mod postgres;

pub use postgres::PgVectorStore;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::documents::DocumentChunk;

#[derive(Debug, Error)]
pub enum DataStoreError {
    #[error("unknown datastore kind '{0}'")]
    UnknownKind(String),

    #[error("datastore configuration error: {0}")]
    Config(String),

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("embedding dimension mismatch: store holds vector({expected}), got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type DataStoreResult<T> = Result<T, DataStoreError>;

/// A stored chunk returned from a similarity search, with its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub source_filename: String,
    pub title: String,
    pub authors: String,
    pub publication_date: String,
    pub content: String,

    /// Cosine similarity to the query vector, `1 - cosine_distance`.
    pub similarity: f64,
}

/// Storage capability for document chunks.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Replace the entire table contents with `chunks`. Destructive; used for
    /// full reloads. Callers are responsible for not running this concurrently
    /// with `add` or `search`.
    async fn initialize(&self, chunks: &[DocumentChunk]) -> DataStoreResult<()>;

    /// Append chunks without affecting prior rows. Safe under concurrent
    /// callers.
    async fn add(&self, chunks: &[DocumentChunk]) -> DataStoreResult<()>;

    /// Return the `top_k` stored chunks ranked by descending cosine
    /// similarity to `query_embedding`, ties broken by storage order. Fewer
    /// rows than `top_k` yield fewer results.
    async fn search(&self, query_embedding: &[f32], top_k: usize)
    -> DataStoreResult<Vec<ScoredChunk>>;

    /// Number of stored chunks.
    async fn count(&self) -> DataStoreResult<u64>;

    /// Release pooled connection resources. Idempotent.
    async fn close(&self);
}

/// Construct the backend named by `config.kind`.
pub async fn connect(
    config: &DatabaseConfig,
    dimension: usize,
) -> DataStoreResult<Arc<dyn DataStore>> {
    match config.kind.as_str() {
        postgres::KIND => Ok(Arc::new(PgVectorStore::connect(config, dimension).await?)),
        other => Err(DataStoreError::UnknownKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_kind_fails_fast() {
        let config = DatabaseConfig {
            kind: "sqlite".to_string(),
            url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
        };
        let err = connect(&config, 384).await.unwrap_err();
        assert!(matches!(err, DataStoreError::UnknownKind(kind) if kind == "sqlite"));
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let config = DatabaseConfig {
            kind: "postgres".to_string(),
            url: None,
            max_connections: 1,
        };
        let err = connect(&config, 384).await.unwrap_err();
        assert!(matches!(err, DataStoreError::Config(_)));
    }
}
