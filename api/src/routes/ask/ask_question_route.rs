//! POST /ask — one-shot question without a session.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::ask::ask_request::{AskRequest, AskResponse},
};

/// Handler: POST /ask
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/ask \
///   -H 'content-type: application/json' \
///   -d '{"question":"What are your hours?"}'
/// ```
#[instrument(skip_all)]
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskRequest>,
) -> AppResult<Json<AskResponse>> {
    let question = body.question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("question must not be empty".into()));
    }

    let started = std::time::Instant::now();
    let answer = state.resolver.resolve(question).await;
    info!(
        latency_ms = started.elapsed().as_millis() as u64,
        "ask answered"
    );

    Ok(Json(AskResponse { answer }))
}
