//! Process composition root.
//!
//! All capability handles (datastore pool, embedding model, generator,
//! upload signer) are constructed here once, owned by the context, and shared
//! by reference for the life of the process. Nothing is lazily created per
//! request.

use anyhow::{Context as _, bail};
use std::sync::Arc;

use crate::config::Settings;
use crate::datastore::{self, DataStore};
use crate::embedding::{Embedder, FastEmbedEmbedder};
use crate::generation::{Generator, HttpGenerator};
use crate::ingest::IngestPipeline;
use crate::objectstore::{SigV4Signer, UploadSigner};
use crate::retrieve::QueryEngine;

pub struct AppContext {
    pub settings: Settings,
    pub datastore: Arc<dyn DataStore>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Option<Arc<dyn Generator>>,
    pub signer: Option<Arc<dyn UploadSigner>>,
}

impl AppContext {
    /// Construct every capability from settings. Configuration problems are
    /// fatal here, before the server starts taking requests.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        settings
            .chunking
            .validate()
            .map_err(|e| anyhow::anyhow!(e))?;
        if settings.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be at least 1");
        }

        // Model load is CPU- and IO-heavy; keep it off the async runtime.
        let model_name = settings.embedding.model.clone();
        let embedder = tokio::task::spawn_blocking(move || FastEmbedEmbedder::new(&model_name))
            .await
            .context("embedding model load task failed")??;

        if embedder.dimension() != settings.embedding.dimension {
            bail!(
                "embedding.dimension is {} but model '{}' produces {}-dimensional vectors",
                settings.embedding.dimension,
                settings.embedding.model,
                embedder.dimension()
            );
        }
        let embedder: Arc<dyn Embedder> = Arc::new(embedder);

        let datastore =
            datastore::connect(&settings.database, settings.embedding.dimension).await?;

        let generator: Option<Arc<dyn Generator>> = settings
            .generation
            .enabled
            .then(|| Arc::new(HttpGenerator::new(&settings.generation)) as Arc<dyn Generator>);

        // An untouched uploads section means the feature is off; a partially
        // filled one is a configuration error.
        let signer: Option<Arc<dyn UploadSigner>> = if settings.uploads.is_unset() {
            None
        } else {
            Some(Arc::new(SigV4Signer::from_config(&settings.uploads)?))
        };

        Ok(Self {
            settings,
            datastore,
            embedder,
            generator,
            signer,
        })
    }

    /// Assemble a context from pre-built capabilities. Used by tests.
    pub fn from_parts(
        settings: Settings,
        datastore: Arc<dyn DataStore>,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn Generator>>,
        signer: Option<Arc<dyn UploadSigner>>,
    ) -> Self {
        Self {
            settings,
            datastore,
            embedder,
            generator,
            signer,
        }
    }

    /// Query-side orchestrator over this context's capabilities.
    pub fn query_engine(&self) -> QueryEngine {
        let engine = QueryEngine::new(Arc::clone(&self.datastore), Arc::clone(&self.embedder));
        match &self.generator {
            Some(generator) => engine.with_generator(Arc::clone(generator)),
            None => engine,
        }
    }

    /// Ingestion pipeline over this context's capabilities.
    pub fn ingest_pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(
            &self.settings.chunking,
            &self.settings.embedding,
            Arc::clone(&self.embedder),
            Arc::clone(&self.datastore),
        )
    }

    /// Release pooled resources. Idempotent.
    pub async fn shutdown(&self) {
        self.datastore.close().await;
    }
}
