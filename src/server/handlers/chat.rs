use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// `POST /chat` with `{"query": "..."}`.
///
/// Unparseable bodies and non-string queries are treated as a missing query.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = payload
        .ok()
        .and_then(|Json(body)| body.get("query").and_then(Value::as_str).map(str::to_string))
        .map(|query| query.trim().to_string())
        .unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);
    async move {
        tracing::info!("Answering query ({} chars)", query.chars().count());
        let response = state
            .pipeline
            .answer(&query)
            .await
            .map_err(ApiError::internal)?;
        tracing::info!("Answered with {} sections", response.sections.len());

        Ok::<_, ApiError>(Json(json!({
            "query": query,
            "response": response,
        })))
    }
    .instrument(span)
    .await
}
