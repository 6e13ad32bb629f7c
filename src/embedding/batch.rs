//! Batched embedding of pending chunks.
//!
//! Texts go to the embedding capability in fixed-size batches, sequentially
//! and in input order. Within a batch the returned vectors are positionally
//! aligned with the inputs; each vector is written onto the chunk it belongs
//! to directly, keyed by the chunk's slot in its batch, so no index arithmetic
//! spans batch boundaries. A failed batch leaves all of its chunks without an
//! embedding; those chunks are reported and excluded from persistence, and the
//! run continues with the next batch.

use super::{Embedder, EmbeddingError};
use crate::documents::PendingChunk;

/// Attach embeddings to `chunks` in batches of `batch_size`.
///
/// Returns the same chunks; ones from failed batches keep `embedding: None`.
pub async fn embed_pending(
    embedder: &dyn Embedder,
    mut chunks: Vec<PendingChunk>,
    batch_size: usize,
) -> Vec<PendingChunk> {
    let batch_size = batch_size.max(1);
    let expected = embedder.dimension();

    for batch in chunks.chunks_mut(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

        match embedder.embed_documents(&texts).await {
            Ok(vectors) => {
                if let Err(e) = attach(batch, vectors, expected) {
                    tracing::warn!(
                        target: "embedding",
                        "discarding batch starting at chunk {}: {e}",
                        batch[0].ordinal
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    target: "embedding",
                    "embedding batch starting at chunk {} failed: {e}",
                    batch[0].ordinal
                );
            }
        }
    }

    chunks
}

/// Write one vector onto each chunk of the batch. The whole batch is rejected
/// when the backend breaks the alignment or dimensionality contract.
fn attach(
    batch: &mut [PendingChunk],
    vectors: Vec<Vec<f32>>,
    expected: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != batch.len() {
        return Err(EmbeddingError::Backend(format!(
            "expected {} vectors, got {}",
            batch.len(),
            vectors.len()
        )));
    }

    for vector in &vectors {
        if vector.len() != expected {
            return Err(EmbeddingError::Dimension {
                expected,
                actual: vector.len(),
            });
        }
    }

    for (chunk, vector) in batch.iter_mut().zip(vectors) {
        chunk.embedding = Some(vector);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIM: usize = 4;

    /// Embeds each text as `[n; DIM]` where `n` is the numeric suffix of the
    /// text, making alignment checkable per input.
    struct IndexEmbedder {
        calls: AtomicUsize,
    }

    impl IndexEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for IndexEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(stub_vector(text))
        }

        async fn embed_documents(
            &self,
            texts: &[String],
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.iter().any(|t| t.contains("poison")) {
                return Err(EmbeddingError::Backend("stub failure".to_string()));
            }
            Ok(texts.iter().map(|t| stub_vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    fn stub_vector(text: &str) -> Vec<f32> {
        let n: f32 = text
            .rsplit(' ')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(-1.0);
        vec![n; DIM]
    }

    fn make_chunks(n: usize) -> Vec<PendingChunk> {
        (0..n)
            .map(|i| PendingChunk {
                ordinal: i,
                source_filename: "doc.pdf".to_string(),
                title: "t".to_string(),
                authors: "a".to_string(),
                publication_date: "d".to_string(),
                content: format!("chunk {i}"),
                embedding: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_alignment_across_batch_sizes() {
        for batch_size in [1, 2, 3, 5, 7, 100] {
            let embedder = IndexEmbedder::new();
            let chunks = embed_pending(&embedder, make_chunks(11), batch_size).await;

            assert_eq!(chunks.len(), 11);
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(
                    chunk.embedding.as_deref(),
                    Some(vec![i as f32; DIM].as_slice()),
                    "chunk {i} misaligned at batch_size {batch_size}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_batches_are_bounded() {
        let embedder = IndexEmbedder::new();
        embed_pending(&embedder, make_chunks(12), 5).await;
        // 12 chunks at batch size 5: three calls.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_is_skipped_not_fatal() {
        let embedder = IndexEmbedder::new();
        let mut chunks = make_chunks(6);
        // Batch of size 2 holding chunks 2 and 3 fails.
        chunks[2].content = "poison 2".to_string();

        let chunks = embed_pending(&embedder, chunks, 2).await;

        assert!(chunks[0].embedding.is_some());
        assert!(chunks[1].embedding.is_some());
        assert!(chunks[2].embedding.is_none());
        assert!(chunks[3].embedding.is_none());
        assert!(chunks[4].embedding.is_some());
        assert!(chunks[5].embedding.is_some());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let embedder = IndexEmbedder::new();
        let chunks = embed_pending(&embedder, Vec::new(), 5).await;
        assert!(chunks.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_attach_rejects_misaligned_result() {
        let mut batch = make_chunks(3);
        let err = attach(&mut batch, vec![vec![0.0; DIM]; 2], DIM);
        assert!(err.is_err());
        assert!(batch.iter().all(|c| c.embedding.is_none()));
    }

    #[test]
    fn test_attach_rejects_wrong_dimension() {
        let mut batch = make_chunks(1);
        let err = attach(&mut batch, vec![vec![0.0; DIM + 1]], DIM);
        assert!(matches!(err, Err(EmbeddingError::Dimension { .. })));
        assert!(batch[0].embedding.is_none());
    }
}
