use serde::{Deserialize, Serialize};

/// One statute section from the metadata store. `id` is its row position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: usize,
    pub text: String,
}

/// A retrieved candidate that passed score filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub id: usize,
    /// Text cut to the display budget, with a marker when cut.
    pub display_text: String,
    pub full_text: String,
    /// Cosine similarity to the query (higher is closer).
    pub score: f32,
}

/// Structured fields recovered from generation output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExplanationRecord {
    pub layman_explanation: String,
    pub example: String,
}

/// Per-section entry of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionAnswer {
    pub id: usize,
    pub title: String,
    pub legal_text: String,
    pub layman_explanation: String,
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateAnswer {
    pub query: String,
    pub summary_plain: String,
    pub sections: Vec<SectionAnswer>,
    pub final_answer: String,
}

pub fn section_title(id: usize) -> String {
    format!("Section {}", id)
}
