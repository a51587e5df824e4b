use std::collections::HashSet;
use std::sync::Arc;

use super::cache::EmbeddingCache;
use super::error::RagError;
use super::index::{SectionStore, VectorIndex};
use super::types::RetrievalResult;
use crate::core::config::RetrievalSettings;
use crate::llm::Embedder;
use crate::vector_math::l2_normalize;

/// Appended to display text that was cut to the character budget.
pub const TRUNCATION_MARKER: &str = "...\n[truncated]";

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub top_k: usize,
    pub retrieve_multiplier: usize,
    /// Inclusive lower bound on cosine similarity.
    pub similarity_threshold: f32,
    pub max_section_chars: usize,
}

impl From<&RetrievalSettings> for RetrieverConfig {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            top_k: settings.top_k,
            retrieve_multiplier: settings.retrieve_multiplier,
            similarity_threshold: settings.similarity_threshold,
            max_section_chars: settings.max_section_chars,
        }
    }
}

impl RetrieverConfig {
    /// Number of raw candidates requested from the index, leaving headroom
    /// for score filtering.
    pub fn search_breadth(&self) -> usize {
        self.retrieve_multiplier
            .saturating_mul(self.top_k)
            .max(self.top_k + 1)
    }
}

/// Embeds queries (through the cache) and turns index hits into
/// [`RetrievalResult`]s.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    cache: Arc<EmbeddingCache>,
    index: Arc<dyn VectorIndex>,
    sections: Arc<SectionStore>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        cache: Arc<EmbeddingCache>,
        index: Arc<dyn VectorIndex>,
        sections: Arc<SectionStore>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            embedder,
            cache,
            index,
            sections,
            config,
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Unit-length embedding for `query`, served from the cache when possible.
    pub async fn encode_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let embedder = self.embedder.clone();
        self.cache
            .get_or_compute(query, |key| async move {
                let mut vectors = embedder
                    .embed(std::slice::from_ref(&key))
                    .await
                    .map_err(RagError::Embedding)?;
                let mut vector = vectors.pop().ok_or(RagError::EmptyEmbedding)?;
                if vector.is_empty() {
                    return Err(RagError::EmptyEmbedding);
                }
                l2_normalize(&mut vector);
                Ok(vector)
            })
            .await
    }

    /// Ranked sections for `query`: at most `top_k`, all at or above the
    /// similarity threshold, unique ids, index rank order.
    ///
    /// Blank queries return an empty list without touching the embedder or
    /// the index.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalResult>, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.encode_query(query).await?;
        let breadth = self.config.search_breadth();
        let neighbors = self.index.search(&embedding, breadth)?;
        tracing::debug!(
            "Index returned {} of {} requested candidates",
            neighbors.len(),
            breadth
        );

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(self.config.top_k);
        for neighbor in neighbors {
            let Some(section) = self.sections.get(neighbor.position) else {
                tracing::debug!("Skipping index position {} with no metadata", neighbor.position);
                continue;
            };
            if neighbor.score.is_nan() || neighbor.score < self.config.similarity_threshold {
                continue;
            }
            if !seen.insert(section.id) {
                continue;
            }

            results.push(RetrievalResult {
                id: section.id,
                display_text: truncate_for_display(&section.text, self.config.max_section_chars),
                full_text: section.text.clone(),
                score: neighbor.score,
            });
            if results.len() >= self.config.top_k {
                break;
            }
        }

        Ok(results)
    }
}

/// Cuts `text` to `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// when anything was removed.
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// First `max_chars` characters of `text`.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
