//! Default values for every recognized setting.

pub const EMBEDDER_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const GENERATOR_MODEL: &str = "google/flan-t5-large";
pub const LLM_BASE_URL: &str = "http://127.0.0.1:8080/v1";

pub const VECTOR_INDEX_PATH: &str = "data/sections.index";
pub const META_PATH: &str = "data/meta.json";

pub const TOP_K: usize = 3;
pub const MAX_SECTION_CHARS: usize = 1500;
pub const RETRIEVE_MULTIPLIER: usize = 5;
pub const SIMILARITY_THRESHOLD: f32 = 0.2;
pub const MAX_GENERATION_TOKENS: u32 = 256;
pub const GENERATION_TIMEOUT_SECS: u64 = 60;
pub const REQUEST_TIMEOUT_SECS: u64 = 120;
pub const QUERY_EMBED_CACHE_SIZE: usize = 512;
pub const EXPLANATION_CACHE_SIZE: usize = 0;

pub const HOST: &str = "0.0.0.0";
pub const PORT: u16 = 5000;
pub const CORS_ORIGINS: &str = "*";
