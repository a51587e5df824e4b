//! Retrieval-augmented answering over statute sections.
//!
//! - `EmbeddingCache`: bounded LRU of query embeddings
//! - `FlatIndex` / `SectionStore`: the persisted vector index and its texts
//! - `Retriever`: query → ranked, filtered, deduplicated sections
//! - `extractor`: generation output → `ExplanationRecord`
//! - `Pipeline`: the end-to-end `answer(query)` operation

pub mod cache;
mod error;
pub mod extractor;
pub mod index;
pub mod pipeline;
pub mod retriever;
mod types;

pub use cache::{EmbeddingCache, LruStore};
pub use error::RagError;
pub use extractor::{extract_explanation, ExtractionStrategy};
pub use index::{load_section_index, FlatIndex, Neighbor, SectionStore, VectorIndex};
pub use pipeline::{Pipeline, PipelineConfig};
pub use retriever::{Retriever, RetrieverConfig};
pub use types::{
    section_title, AggregateAnswer, ExplanationRecord, RetrievalResult, Section, SectionAnswer,
};
