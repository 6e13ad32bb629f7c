//! Local embedding via fastembed ONNX models.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use super::{Embedder, EmbeddingError};
use async_trait::async_trait;

/// Embedder backed by a local fastembed model.
///
/// The model requires exclusive access per call, so it sits behind a mutex and
/// every call runs on the blocking thread pool.
pub struct FastEmbedEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl FastEmbedEmbedder {
    /// Load the named model and probe its dimensionality.
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        let model = parse_model(model_name)?;
        let mut text_model =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))
                .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        // Probe dimensions with a throwaway embedding.
        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;
        let dimension = probe
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ModelInit("model returned no embedding".to_string()))?
            .len();

        Ok(Self {
            model: Arc::new(Mutex::new(text_model)),
            dimension,
        })
    }
}

fn parse_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(EmbeddingError::ModelInit(format!(
            "unknown embedding model '{other}'"
        ))),
    }
}

#[async_trait]
impl Embedder for FastEmbedEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Backend("model returned no embedding".to_string()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let expected = self.dimension;

        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| EmbeddingError::Backend("embedding model lock poisoned".to_string()))?;
            guard
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::Backend(format!("embedding task failed: {e}")))??;

        for vector in &vectors {
            if vector.len() != expected {
                return Err(EmbeddingError::Dimension {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
