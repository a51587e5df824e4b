use thiserror::Error;

use crate::core::config::ConfigError;
use crate::llm::LlmError;
use crate::rag::RagError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load section index: {0}")]
    Index(#[from] RagError),

    #[error("Failed to initialize model clients: {0}")]
    Models(#[from] LlmError),
}
