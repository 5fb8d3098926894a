//! GET /health — liveness plus the current answering mode.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

pub const REMOTE_MODE_HINT: &str = "Powered by OpenAI • Ask me anything about our business";
pub const FAQ_ONLY_MODE_HINT: &str =
    "Limited to FAQ answers • Set API key for full AI capability";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub faq_entries: usize,
    pub remote_enabled: bool,
    /// Footer line a chat UI can show under the input box.
    pub mode_hint: &'static str,
}

/// Handler: GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let remote_enabled = state.resolver.has_credential();
    Json(HealthResponse {
        status: "ok",
        faq_entries: state.resolver.knowledge_base().len(),
        remote_enabled,
        mode_hint: if remote_enabled {
            REMOTE_MODE_HINT
        } else {
            FAQ_ONLY_MODE_HINT
        },
    })
}
