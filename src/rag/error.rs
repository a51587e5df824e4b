use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("required file not found: {0} (run the indexer first)")]
    MissingFile(PathBuf),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed vector index: {0}")]
    MalformedIndex(String),
    #[error("malformed section metadata: {0}")]
    MalformedMetadata(String),
    #[error("query embedding has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding failed: {0}")]
    Embedding(#[source] LlmError),
    #[error("embedder returned no vector for the query")]
    EmptyEmbedding,
}
