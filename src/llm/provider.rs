use async_trait::async_trait;

use super::types::{ChatRequest, LlmError};

/// Turns text into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// model identifier, used in logs
    fn model(&self) -> &str;

    /// one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// Produces free-form text for a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// model identifier, used in logs
    fn model(&self) -> &str;

    /// chat completion (non-streaming)
    async fn generate(&self, request: ChatRequest) -> Result<String, LlmError>;
}
