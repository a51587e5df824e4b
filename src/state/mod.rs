use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, Settings};
use crate::llm::{Embedder, Generator, OpenAiCompatProvider};
use crate::rag::{
    load_section_index, EmbeddingCache, Pipeline, PipelineConfig, Retriever, RetrieverConfig,
    SectionStore, VectorIndex,
};

pub mod error;

pub use error::InitializationError;

/// Process-wide state shared by every route.
///
/// Everything here is built once at startup and read-only afterwards, apart
/// from the caches inside the pipeline.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub pipeline: Arc<Pipeline>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Loads the index pair and connects the model clients.
    ///
    /// Missing or malformed index files are fatal.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        settings: Settings,
    ) -> Result<Arc<Self>, InitializationError> {
        let index_path = paths.resolve(&settings.index.vector_index_path);
        let meta_path = paths.resolve(&settings.index.meta_path);
        let (index, sections) = load_section_index(&index_path, &meta_path)?;

        let models = &settings.models;
        let request_timeout = Duration::from_secs(models.request_timeout_secs);
        let embedder = OpenAiCompatProvider::new(
            models.embedder_base_url(),
            &models.embedder,
            models.api_key.as_deref(),
            request_timeout,
        )?;
        let generator = OpenAiCompatProvider::new(
            &models.base_url,
            &models.generator,
            models.api_key.as_deref(),
            request_timeout,
        )?;
        tracing::info!(
            "Embedder {} at {}, generator {} at {}",
            models.embedder,
            models.embedder_base_url(),
            models.generator,
            models.base_url
        );

        Ok(Self::from_parts(
            paths,
            settings,
            Arc::new(embedder),
            Arc::new(generator),
            Arc::new(index),
            sections,
        ))
    }

    /// Assembles state from already-built components.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        index: Arc<dyn VectorIndex>,
        sections: SectionStore,
    ) -> Arc<Self> {
        let cache = Arc::new(EmbeddingCache::new(settings.retrieval.query_embed_cache_size));
        let retriever = Retriever::new(
            embedder,
            cache,
            index,
            Arc::new(sections),
            RetrieverConfig::from(&settings.retrieval),
        );
        let pipeline = Pipeline::new(retriever, generator, PipelineConfig::from(&settings));

        Arc::new(AppState {
            paths,
            settings: Arc::new(settings),
            pipeline: Arc::new(pipeline),
            started_at: Utc::now(),
        })
    }
}
