//! Retrieval and answer orchestration.
//!
//! Two response modes: raw ranked results, and a generative answer grounded in
//! the retrieved context. With no results the generative mode returns a fixed
//! no-information message without ever invoking the generative capability.

use std::sync::Arc;
use thiserror::Error;

use crate::datastore::{DataStore, DataStoreError, ScoredChunk};
use crate::embedding::{Embedder, EmbeddingError};
use crate::generation::{GenerationError, Generator};

/// Fixed response when the store has nothing relevant. The prompt also
/// instructs the model to emit exactly this phrase when the context does not
/// contain the answer.
pub const NO_INFORMATION_ANSWER: &str =
    "I could not find relevant information in the document library.";

/// Visible separator between retrieved chunks in the context block.
const CONTEXT_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    DataStore(#[from] DataStoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Query-side orchestrator over the datastore, embedder, and optional
/// generator capabilities.
pub struct QueryEngine {
    datastore: Arc<dyn DataStore>,
    embedder: Arc<dyn Embedder>,
    generator: Option<Arc<dyn Generator>>,
}

impl QueryEngine {
    pub fn new(datastore: Arc<dyn DataStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            datastore,
            embedder,
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Raw-results mode: embed the query and return ranked chunks.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrieveError> {
        let query_embedding = self.embedder.embed_query(query).await?;
        Ok(self.datastore.search(&query_embedding, top_k).await?)
    }

    /// Generative mode: retrieve context and ask the generator to answer
    /// strictly from it.
    pub async fn answer(&self, query: &str, top_k: usize) -> Result<String, RetrieveError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or(GenerationError::Disabled)?;

        let results = self.search(query, top_k).await?;
        if results.is_empty() {
            return Ok(NO_INFORMATION_ANSWER.to_string());
        }

        let context = results
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let answer = generator.generate(&build_prompt(query, &context)).await?;
        Ok(answer)
    }
}

fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a research assistant. Answer the question using only the \
         context below.\n\
         If the context does not contain the answer, reply exactly: \
         \"{NO_INFORMATION_ANSWER}\"\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\
         Answer:"
    )
}
