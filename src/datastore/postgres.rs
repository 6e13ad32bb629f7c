//! PostgreSQL backend with pgvector similarity search.
//!
//! The application owns the schema: the vector extension and the chunk table
//! are created at construction, sized to the deployment's embedding
//! dimensionality. `initialize` truncates and reinserts inside a single
//! transaction rather than dropping the table, so the HNSW index survives
//! full reloads.

use pgvector::Vector;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};

use super::{DataStore, DataStoreError, DataStoreResult, ScoredChunk};
use crate::config::DatabaseConfig;
use crate::documents::DocumentChunk;
use async_trait::async_trait;

pub const KIND: &str = "postgres";

/// Rows per INSERT statement. Six columns per row keeps this comfortably
/// under the postgres bind-parameter limit.
const INSERT_BATCH_ROWS: usize = 500;

pub struct PgVectorStore {
    pool: PgPool,
    dimension: usize,
}

impl PgVectorStore {
    /// Connect, then make sure the extension, table, and index exist.
    pub async fn connect(config: &DatabaseConfig, dimension: usize) -> DataStoreResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DataStoreError::Config("database.url is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        let store = Self { pool, dimension };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> DataStoreResult<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS document_chunks (
                id BIGSERIAL PRIMARY KEY,
                source_filename TEXT NOT NULL,
                title TEXT NOT NULL,
                authors TEXT NOT NULL,
                publication_date TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding vector({}) NOT NULL
            )",
            self.dimension
        );
        sqlx::query(&create_table).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS document_chunks_embedding_idx
             ON document_chunks USING hnsw (embedding vector_cosine_ops)",
        )
        .execute(&self.pool)
        .await?;

        tracing::debug!(target: "datastore", "schema ready, vector({})", self.dimension);
        Ok(())
    }

    /// Reject any chunk whose embedding does not match the store's
    /// dimensionality before touching the database.
    fn check_dimensions(&self, chunks: &[DocumentChunk]) -> DataStoreResult<()> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dimension {
                return Err(DataStoreError::Dimension {
                    expected: self.dimension,
                    actual: chunk.embedding.len(),
                });
            }
        }
        Ok(())
    }

    async fn insert_chunks(
        tx: &mut Transaction<'_, Postgres>,
        chunks: &[DocumentChunk],
    ) -> DataStoreResult<()> {
        for batch in chunks.chunks(INSERT_BATCH_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO document_chunks \
                 (source_filename, title, authors, publication_date, content, embedding) ",
            );
            builder.push_values(batch, |mut row, chunk| {
                row.push_bind(&chunk.source_filename)
                    .push_bind(&chunk.title)
                    .push_bind(&chunk.authors)
                    .push_bind(&chunk.publication_date)
                    .push_bind(&chunk.content)
                    .push_bind(Vector::from(chunk.embedding.clone()));
            });
            builder.build().execute(&mut **tx).await?;
        }
        Ok(())
    }
}

fn scored_chunk(row: &PgRow) -> Result<ScoredChunk, sqlx::Error> {
    Ok(ScoredChunk {
        source_filename: row.try_get("source_filename")?,
        title: row.try_get("title")?,
        authors: row.try_get("authors")?,
        publication_date: row.try_get("publication_date")?,
        content: row.try_get("content")?,
        similarity: row.try_get("similarity")?,
    })
}

#[async_trait]
impl DataStore for PgVectorStore {
    async fn initialize(&self, chunks: &[DocumentChunk]) -> DataStoreResult<()> {
        self.check_dimensions(chunks)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("TRUNCATE TABLE document_chunks RESTART IDENTITY")
            .execute(&mut *tx)
            .await?;
        Self::insert_chunks(&mut tx, chunks).await?;
        tx.commit().await?;

        tracing::info!(target: "datastore", "initialized with {} chunks", chunks.len());
        Ok(())
    }

    async fn add(&self, chunks: &[DocumentChunk]) -> DataStoreResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.check_dimensions(chunks)?;

        let mut tx = self.pool.begin().await?;
        Self::insert_chunks(&mut tx, chunks).await?;
        tx.commit().await?;

        tracing::debug!(target: "datastore", "added {} chunks", chunks.len());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> DataStoreResult<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(DataStoreError::InvalidTopK);
        }
        if query_embedding.len() != self.dimension {
            return Err(DataStoreError::Dimension {
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }

        let rows = sqlx::query(
            "SELECT source_filename, title, authors, publication_date, content, \
                    1 - (embedding <=> $1) AS similarity \
             FROM document_chunks \
             ORDER BY embedding <=> $1, id \
             LIMIT $2",
        )
        .bind(Vector::from(query_embedding.to_vec()))
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| scored_chunk(row).map_err(DataStoreError::from))
            .collect()
    }

    async fn count(&self) -> DataStoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
