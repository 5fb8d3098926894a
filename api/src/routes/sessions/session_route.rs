//! Chat sessions: create, inspect, post a message.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use faq_resolver::ConversationSession;
use tracing::{info, instrument};

use crate::{
    core::{app_state::AppState, session_registry::SessionRegistry},
    error_handler::{AppError, AppResult},
    routes::sessions::session_dto::{PostMessageRequest, PostMessageResponse, SessionView},
};

fn view(session: &ConversationSession) -> SessionView {
    SessionView {
        session_id: session.id().to_string(),
        busy: session.is_busy(),
        messages: session.messages().to_vec(),
    }
}

/// Handler: POST /sessions
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/sessions
/// ```
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionView>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(view(&session)))
}

/// Handler: GET /sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<SessionView>> {
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or(AppError::SessionNotFound(id))?;
    let session = session.lock().await;
    Ok(Json(view(&session)))
}

/// Handler: POST /sessions/{id}/messages
///
/// Blank text → 400, a submission already in flight → 409.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/sessions/<id>/messages \
///   -H 'content-type: application/json' \
///   -d '{"text":"Do you ship internationally?"}'
/// ```
#[instrument(skip_all, fields(session = %id))]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> AppResult<Json<PostMessageResponse>> {
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(id.clone()))?;

    let started = std::time::Instant::now();
    let (user_message, reply) = SessionRegistry::submit(session, &state.resolver, &body.text).await?;
    info!(
        reply = %reply.id,
        latency_ms = started.elapsed().as_millis() as u64,
        "message answered"
    );

    Ok(Json(PostMessageResponse {
        user_message,
        reply,
    }))
}
