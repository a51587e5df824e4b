use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub async fn home() -> impl IntoResponse {
    Json(json!({ "message": "✅ Indian Law Chatbot API running" }))
}

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let retriever = state.pipeline.retriever();
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0);

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sections": retriever.section_count(),
        "data_dir": state.paths.data_dir.display().to_string(),
        "query_cache": {
            "size": retriever.cache().len().await,
            "capacity": retriever.cache().capacity(),
        },
        "explanation_cache": {
            "size": state.pipeline.explanation_cache_len().await,
            "capacity": state.settings.retrieval.explanation_cache_size,
        },
        "uptime_secs": uptime,
    }))
}
