//! GET/PUT /credential — presence check and update of the provider key.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::info;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::credential::credential_request::{CredentialStatus, SetCredentialRequest},
};

/// Handler: GET /credential
pub async fn get_credential(State(state): State<Arc<AppState>>) -> Json<CredentialStatus> {
    Json(CredentialStatus {
        has_credential: state.resolver.has_credential(),
    })
}

/// Handler: PUT /credential
///
/// Stores the trimmed key, rebinds the remote client and, when `session_id`
/// names a live session, appends the system notice to it.
///
/// # Example
/// ```bash
/// curl -X PUT http://127.0.0.1:8080/credential \
///   -H 'content-type: application/json' \
///   -d '{"value":"sk-...","session_id":"<id>"}'
/// ```
pub async fn set_credential(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetCredentialRequest>,
) -> AppResult<Json<CredentialStatus>> {
    let value = body.value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest("credential must not be empty".into()));
    }

    // Resolve the session first so an unknown id leaves the store untouched.
    let session = match body.session_id.as_deref() {
        Some(id) => Some(
            state
                .sessions
                .get(id)
                .await
                .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?,
        ),
        None => None,
    };

    state.resolver.set_credential(value).await;
    info!(key_len = value.len(), "credential replaced via API");

    if let Some(session) = session {
        session.lock().await.note_credential_set();
    }

    Ok(Json(CredentialStatus {
        has_credential: state.resolver.has_credential(),
    }))
}
