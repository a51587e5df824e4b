use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Typed view of the merged configuration (defaults < config.yml < env).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub models: ModelSettings,
    pub retrieval: RetrievalSettings,
    pub index: IndexSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub embedder: String,
    pub generator: String,
    /// OpenAI-compatible endpoint root, e.g. `http://127.0.0.1:8080/v1`.
    pub base_url: String,
    /// Separate endpoint for embeddings; falls back to `base_url`.
    pub embedder_base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_generation_tokens: u32,
    pub generation_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedder: defaults::EMBEDDER_MODEL.to_string(),
            generator: defaults::GENERATOR_MODEL.to_string(),
            base_url: defaults::LLM_BASE_URL.to_string(),
            embedder_base_url: None,
            api_key: None,
            max_generation_tokens: defaults::MAX_GENERATION_TOKENS,
            generation_timeout_secs: defaults::GENERATION_TIMEOUT_SECS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ModelSettings {
    pub fn embedder_base_url(&self) -> &str {
        self.embedder_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.base_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub retrieve_multiplier: usize,
    /// Inclusive lower bound on cosine similarity.
    pub similarity_threshold: f32,
    pub max_section_chars: usize,
    pub query_embed_cache_size: usize,
    pub explanation_cache_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: defaults::TOP_K,
            retrieve_multiplier: defaults::RETRIEVE_MULTIPLIER,
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            max_section_chars: defaults::MAX_SECTION_CHARS,
            query_embed_cache_size: defaults::QUERY_EMBED_CACHE_SIZE,
            explanation_cache_size: defaults::EXPLANATION_CACHE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexSettings {
    pub vector_index_path: PathBuf,
    pub meta_path: PathBuf,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            vector_index_path: PathBuf::from(defaults::VECTOR_INDEX_PATH),
            meta_path: PathBuf::from(defaults::META_PATH),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            cors_origins: vec![defaults::CORS_ORIGINS.to_string()],
        }
    }
}
