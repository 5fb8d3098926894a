//! HTTP surface of the FAQ assistant.
//!
//! | route                          | handler |
//! |--------------------------------|---------|
//! | `GET  /health`                 | [`routes::health_route::health`] |
//! | `POST /ask`                    | [`routes::ask::ask_question_route::ask_question`] |
//! | `GET/PUT /credential`          | [`routes::credential::credential_route`] |
//! | `POST /sessions`               | [`routes::sessions::session_route::create_session`] |
//! | `GET  /sessions/{id}`          | [`routes::sessions::session_route::get_session`] |
//! | `POST /sessions/{id}/messages` | [`routes::sessions::session_route::post_message`] |

use std::sync::Arc;

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

pub use crate::core::app_state::{AppState, ConfigError};
pub use crate::error_handler::{AppError, AppResult};

use crate::{
    core::app_state::api_address_from_env,
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        ask::ask_question_route::ask_question,
        credential::credential_route::{get_credential, set_credential},
        health_route::health,
        sessions::session_route::{create_session, get_session, post_message},
    },
};

/// Builds the application router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask_question))
        .route("/credential", get(get_credential).put(set_credential))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/messages", post(post_message))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(Arc::new(state))
}

/// Loads state from the environment and serves until Ctrl+C.
pub async fn start() -> AppResult<()> {
    let addr = api_address_from_env()?;
    let state = AppState::from_env()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::Bind)?;
    info!(%addr, "FAQ assistant API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal; shutting down");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Json;
    use completion_client::{CONNECTION_TROUBLE_REPLY, CompletionConfig};
    use faq_resolver::{
        CredentialStore, FAQ_ONLY_FALLBACK, InMemoryCredentialStore, KnowledgeBase,
        ResponseResolver,
        session::{CREDENTIAL_SET_NOTICE, WELCOME_MESSAGE},
    };
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::routes::health_route::{FAQ_ONLY_MODE_HINT, REMOTE_MODE_HINT};

    struct TestApp {
        base: String,
        http: reqwest::Client,
        store: Arc<InMemoryCredentialStore>,
    }

    impl TestApp {
        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }

        async fn new_session(&self) -> String {
            let body: Value = self
                .http
                .post(self.url("/sessions"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            body["session_id"].as_str().unwrap().to_string()
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Provider that answers every completion with `text` after `delay`.
    async fn fake_provider(status: StatusCode, text: &'static str, delay: Duration) -> String {
        let provider = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(_): Json<Value>| async move {
                tokio::time::sleep(delay).await;
                let status = axum::http::StatusCode::from_u16(status.as_u16()).unwrap();
                (status, Json(json!({ "choices": [ { "message": { "content": text } } ] })))
            }),
        );
        serve(provider).await
    }

    async fn spawn_app(provider: &str, store: InMemoryCredentialStore) -> TestApp {
        let store = Arc::new(store);
        let resolver = ResponseResolver::new(
            KnowledgeBase::builtin(),
            store.clone(),
            CompletionConfig {
                endpoint: provider.to_string(),
                timeout: Duration::from_secs(5),
                ..CompletionConfig::default()
            },
        );
        TestApp {
            base: serve(router(AppState::new(resolver))).await,
            http: reqwest::Client::new(),
            store,
        }
    }

    #[tokio::test]
    async fn health_reports_mode() {
        let app = spawn_app("http://127.0.0.1:1", InMemoryCredentialStore::new()).await;

        let body: Value = app
            .http
            .get(app.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["faq_entries"], 7);
        assert_eq!(body["remote_enabled"], false);
        assert_eq!(body["mode_hint"], FAQ_ONLY_MODE_HINT);

        app.store.set("sk-abc");
        let body: Value = app
            .http
            .get(app.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["remote_enabled"], true);
        assert_eq!(body["mode_hint"], REMOTE_MODE_HINT);
    }

    #[tokio::test]
    async fn ask_answers_from_faq_then_fallback() {
        let app = spawn_app("http://127.0.0.1:1", InMemoryCredentialStore::new()).await;

        let res = app
            .http
            .post(app.url("/ask"))
            .json(&json!({ "question": "What are your hours" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["answer"], KnowledgeBase::builtin().entries()[0].answer);

        let body: Value = app
            .http
            .post(app.url("/ask"))
            .json(&json!({ "question": "what is the meaning of life" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["answer"], FAQ_ONLY_FALLBACK);
    }

    #[tokio::test]
    async fn ask_rejects_blank_and_malformed_bodies() {
        let app = spawn_app("http://127.0.0.1:1", InMemoryCredentialStore::new()).await;

        let res = app
            .http
            .post(app.url("/ask"))
            .json(&json!({ "question": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "BAD_REQUEST");

        // Extractor failure is rewritten into the envelope.
        let res = app
            .http
            .post(app.url("/ask"))
            .json(&json!({ "q": "hours" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(res.headers().contains_key("x-request-id"));
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
        assert_eq!(body["error"]["details"][0]["path"], "question");
    }

    #[tokio::test]
    async fn ask_uses_remote_when_credential_present() {
        let provider = fake_provider(StatusCode::OK, "We sell gift cards.", Duration::ZERO).await;
        let app = spawn_app(&provider, InMemoryCredentialStore::with_credential("sk-abc")).await;

        let body: Value = app
            .http
            .post(app.url("/ask"))
            .json(&json!({ "question": "gift cards?" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["answer"], "We sell gift cards.");

        let failing =
            fake_provider(StatusCode::TOO_MANY_REQUESTS, "ignored", Duration::ZERO).await;
        let app = spawn_app(&failing, InMemoryCredentialStore::with_credential("sk-abc")).await;
        let body: Value = app
            .http
            .post(app.url("/ask"))
            .json(&json!({ "question": "gift cards?" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["answer"], CONNECTION_TROUBLE_REPLY);
    }

    #[tokio::test]
    async fn credential_is_trimmed_stored_and_announced() {
        let app = spawn_app("http://127.0.0.1:1", InMemoryCredentialStore::new()).await;
        let session_id = app.new_session().await;

        let body: Value = app
            .http
            .get(app.url("/credential"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["has_credential"], false);

        let res = app
            .http
            .put(app.url("/credential"))
            .json(&json!({ "value": "  \t " }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.store.get(), None);

        let res = app
            .http
            .put(app.url("/credential"))
            .json(&json!({ "value": "sk-x", "session_id": "missing" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.store.get(), None);

        let res = app
            .http
            .put(app.url("/credential"))
            .json(&json!({ "value": "  sk-abc  ", "session_id": session_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["has_credential"], true);
        assert!(body.get("value").is_none());
        assert_eq!(app.store.get().as_deref(), Some("sk-abc"));

        let session: Value = app
            .http
            .get(app.url(&format!("/sessions/{session_id}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let messages = session["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["text"], CREDENTIAL_SET_NOTICE);
        assert_eq!(messages[1]["is_user"], false);
    }

    #[tokio::test]
    async fn session_round_trip() {
        let app = spawn_app("http://127.0.0.1:1", InMemoryCredentialStore::new()).await;

        let res = app.http.post(app.url("/sessions")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = res.json().await.unwrap();
        let id = created["session_id"].as_str().unwrap();
        assert_eq!(created["messages"][0]["id"], "welcome");
        assert_eq!(created["messages"][0]["text"], WELCOME_MESSAGE);

        let res = app
            .http
            .post(app.url(&format!("/sessions/{id}/messages")))
            .json(&json!({ "text": "refund policy" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["user_message"]["text"], "refund policy");
        assert_eq!(body["user_message"]["is_user"], true);
        assert_eq!(
            body["reply"]["text"],
            KnowledgeBase::builtin().entries()[1].answer
        );

        let res = app
            .http
            .post(app.url(&format!("/sessions/{id}/messages")))
            .json(&json!({ "text": "  " }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let view: Value = app
            .http
            .get(app.url(&format!("/sessions/{id}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view["busy"], false);
        assert_eq!(view["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let app = spawn_app("http://127.0.0.1:1", InMemoryCredentialStore::new()).await;

        let res = app.http.get(app.url("/sessions/nope")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "SESSION_NOT_FOUND");

        let res = app
            .http
            .post(app.url("/sessions/nope/messages"))
            .json(&json!({ "text": "hi" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overlapping_submission_is_409() {
        let provider = fake_provider(StatusCode::OK, "Slow answer.", Duration::from_millis(800)).await;
        let app = spawn_app(&provider, InMemoryCredentialStore::with_credential("sk-abc")).await;
        let id = app.new_session().await;
        let messages_url = app.url(&format!("/sessions/{id}/messages"));

        let first = {
            let http = app.http.clone();
            let url = messages_url.clone();
            tokio::spawn(async move {
                http.post(url)
                    .json(&json!({ "text": "gift cards?" }))
                    .send()
                    .await
                    .unwrap()
            })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;

        let view: Value = app
            .http
            .get(app.url(&format!("/sessions/{id}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view["busy"], true);

        let second = app
            .http
            .post(&messages_url)
            .json(&json!({ "text": "another one" }))
            .send()
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let first = first.await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let body: Value = first.json().await.unwrap();
        assert_eq!(body["reply"]["text"], "Slow answer.");

        let view: Value = app
            .http
            .get(app.url(&format!("/sessions/{id}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view["busy"], false);
        assert_eq!(view["messages"].as_array().unwrap().len(), 3);
    }
}
