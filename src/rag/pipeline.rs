use std::sync::Arc;
use std::time::Duration;

use super::cache::LruStore;
use super::error::RagError;
use super::extractor::extract_with_strategy;
use super::retriever::{char_prefix, Retriever};
use super::types::{section_title, AggregateAnswer, ExplanationRecord, SectionAnswer};
use crate::core::config::Settings;
use crate::llm::{ChatRequest, Generator};

pub const GENERATION_ERROR_SENTINEL: &str = "[Error generating explanation]";
pub const SUMMARY_WITH_RESULTS: &str = "Answer based on retrieved IPC sections.";
pub const SUMMARY_NO_RESULTS: &str = "No relevant sections found";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_section_chars: usize,
    pub max_generation_tokens: u32,
    pub generation_timeout: Duration,
    pub explanation_cache_size: usize,
}

impl From<&Settings> for PipelineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            max_section_chars: settings.retrieval.max_section_chars,
            max_generation_tokens: settings.models.max_generation_tokens,
            generation_timeout: Duration::from_secs(settings.models.generation_timeout_secs),
            explanation_cache_size: settings.retrieval.explanation_cache_size,
        }
    }
}

/// Retrieval, per-section generation and aggregation for one query.
pub struct Pipeline {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    config: PipelineConfig,
    explanations: LruStore<usize, ExplanationRecord>,
}

impl Pipeline {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>, config: PipelineConfig) -> Self {
        let explanations = LruStore::new(config.explanation_cache_size);
        Self {
            retriever,
            generator,
            config,
            explanations,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn explanation_cache_len(&self) -> usize {
        self.explanations.len().await
    }

    /// Answers `query` from the retrieved sections.
    ///
    /// Only retrieval errors are returned; a failed or timed-out generation
    /// becomes a sentinel explanation for that section alone.
    pub async fn answer(&self, query: &str) -> Result<AggregateAnswer, RagError> {
        if query.trim().is_empty() {
            return Ok(empty_answer(query));
        }

        let retrieved = self.retriever.retrieve(query).await?;
        if retrieved.is_empty() {
            tracing::info!("No sections passed retrieval for query");
            return Ok(empty_answer(query));
        }

        let mut sections = Vec::with_capacity(retrieved.len());
        for result in retrieved {
            let explanation = self.explain(result.id, &result.full_text).await;
            sections.push(SectionAnswer {
                id: result.id,
                title: section_title(result.id),
                legal_text: result.display_text,
                layman_explanation: explanation.layman_explanation,
                example: explanation.example,
            });
        }

        let final_answer = sections
            .iter()
            .map(|section| {
                format!(
                    "📘 {}:\nLayman: {}\nExample: {}\n",
                    section.title, section.layman_explanation, section.example
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(AggregateAnswer {
            query: query.to_string(),
            summary_plain: SUMMARY_WITH_RESULTS.to_string(),
            sections,
            final_answer,
        })
    }

    async fn explain(&self, section_id: usize, section_text: &str) -> ExplanationRecord {
        if let Some(cached) = self.explanations.get(&section_id).await {
            tracing::debug!("Explanation cache hit for section {}", section_id);
            return cached;
        }

        let prompt = build_prompt(section_id, char_prefix(section_text, self.config.max_section_chars));
        let request = ChatRequest::greedy(prompt, self.config.max_generation_tokens);

        let raw = match tokio::time::timeout(
            self.config.generation_timeout,
            self.generator.generate(request),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                tracing::error!(
                    "Error generating layman explanation for section {}: {}",
                    section_id,
                    err
                );
                return sentinel();
            }
            Err(_) => {
                tracing::error!(
                    "Generation for section {} timed out after {:?}",
                    section_id,
                    self.config.generation_timeout
                );
                return sentinel();
            }
        };

        let (record, strategy) = extract_with_strategy(&raw);
        tracing::debug!("Section {} explanation parsed via {:?}", section_id, strategy);
        if record.layman_explanation.trim().is_empty() {
            tracing::error!(
                "Generation for section {} produced no explanation ({} chars of output)",
                section_id,
                raw.chars().count()
            );
            return sentinel();
        }
        self.explanations.put(section_id, record.clone()).await;
        record
    }
}

pub fn build_prompt(section_id: usize, snippet: &str) -> String {
    format!(
        "You are a legal assistant. Explain the following legal section in plain English \
         for a layperson and provide a short example.\n\n\
         Respond ONLY in valid JSON with two keys: 'layman_explanation' and 'example'.\n\n\
         Legal Section (ID: {}):\n{}",
        section_id, snippet
    )
}

fn sentinel() -> ExplanationRecord {
    ExplanationRecord {
        layman_explanation: GENERATION_ERROR_SENTINEL.to_string(),
        example: String::new(),
    }
}

fn empty_answer(query: &str) -> AggregateAnswer {
    AggregateAnswer {
        query: query.to_string(),
        summary_plain: SUMMARY_NO_RESULTS.to_string(),
        sections: Vec::new(),
        final_answer: String::new(),
    }
}
