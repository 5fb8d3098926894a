//! Credential-bound wrapper around [`OpenAiService`].
//!
//! [`RemoteCompletionClient`] is a plain owned value: whoever holds it decides
//! when to [`configure`](RemoteCompletionClient::configure) it. It is either
//! unconfigured (no credential) or bound to exactly one credential.
//! [`complete`](RemoteCompletionClient::complete) never surfaces provider
//! failures; they are logged and replaced by [`CONNECTION_TROUBLE_REPLY`].

use std::{fmt, sync::Arc};

use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::completion_config::CompletionConfig,
    error_handler::{CompletionError, Result},
    services::open_ai_service::OpenAiService,
};

/// Reply used when the provider answered without any text.
pub const NO_ANSWER_REPLY: &str =
    "I'm not sure how to answer that. Please contact our customer service for assistance.";

/// Reply used when the provider could not be reached or refused the request.
pub const CONNECTION_TROUBLE_REPLY: &str = "I'm having trouble connecting to my knowledge base. \
Please try again later or contact our customer service directly.";

/// Remote completion client bound to at most one credential.
///
/// Cloning is cheap: the underlying HTTP service is shared.
#[derive(Debug, Clone)]
pub struct RemoteCompletionClient {
    config: CompletionConfig,
    binding: Option<Binding>,
}

#[derive(Clone)]
struct Binding {
    credential: String,
    /// `None` when the service could not be built for this credential.
    service: Option<Arc<OpenAiService>>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("credential", &"<redacted>")
            .field("service_ready", &self.service.is_some())
            .finish()
    }
}

impl RemoteCompletionClient {
    /// Creates an unconfigured client. Any `api_key` in `config` is ignored.
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            config: CompletionConfig {
                api_key: None,
                ..config
            },
            binding: None,
        }
    }

    /// Rebinds the client to `credential`.
    ///
    /// - `None` tears the client down.
    /// - The credential already bound keeps the existing service.
    /// - Any other credential builds a fresh service.
    pub fn configure(&mut self, credential: Option<&str>) {
        let Some(key) = credential else {
            if self.binding.take().is_some() {
                info!("remote completion client torn down (no credential)");
            }
            return;
        };

        if self
            .binding
            .as_ref()
            .is_some_and(|b| b.credential == key)
        {
            debug!("remote completion client already bound to current credential");
            return;
        }

        let service = match OpenAiService::new(self.config.with_api_key(key)) {
            Ok(svc) => Some(Arc::new(svc)),
            Err(e) => {
                error!(error = %e, "failed to build completion service for the stored credential");
                None
            }
        };

        info!(
            service_ready = service.is_some(),
            "remote completion client bound to new credential"
        );
        self.binding = Some(Binding {
            credential: key.to_string(),
            service,
        });
    }

    /// `true` when a credential is bound.
    pub fn is_configured(&self) -> bool {
        self.binding.is_some()
    }

    /// `true` when `configure(credential)` would be a no-op.
    pub fn is_bound_to(&self, credential: Option<&str>) -> bool {
        match (&self.binding, credential) {
            (None, None) => true,
            (Some(b), Some(key)) => b.credential == key,
            _ => false,
        }
    }

    /// Config shared by every service this client builds.
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Asks the provider for a single-turn answer to `question`.
    ///
    /// Returns the model's text, [`NO_ANSWER_REPLY`] for an empty reply, or
    /// [`CONNECTION_TROUBLE_REPLY`] for any transport/auth/rate-limit/timeout
    /// failure. No retries.
    ///
    /// # Errors
    /// [`CompletionError::NotConfigured`] if called without a bound credential.
    #[instrument(skip_all, fields(question_len = question.len()))]
    pub async fn complete(&self, question: &str) -> Result<String> {
        let binding = self.binding.as_ref().ok_or(CompletionError::NotConfigured)?;

        let Some(service) = binding.service.as_ref() else {
            warn!("completion service unavailable for the bound credential");
            return Ok(CONNECTION_TROUBLE_REPLY.to_string());
        };

        let timeout = self.config.timeout;
        let outcome = match tokio::time::timeout(
            timeout,
            service.generate(question, Some(&self.config.system_prompt)),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(CompletionError::Timeout(timeout)),
        };

        match outcome {
            Ok(Some(text)) => Ok(text),
            Ok(None) => {
                warn!("provider replied without content");
                Ok(NO_ANSWER_REPLY.to_string())
            }
            Err(e) => {
                error!(
                    error = %e,
                    auth_failure = e.is_auth_failure(),
                    rate_limited = e.is_rate_limited(),
                    "remote completion failed"
                );
                Ok(CONNECTION_TROUBLE_REPLY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        routing::post,
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::config::completion_config::SYSTEM_PROMPT;

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    /// Starts a fake provider that answers every completion with `status` + `reply`
    /// after `delay`, recording the auth header and request body.
    async fn fake_provider(status: StatusCode, reply: Value, delay: Duration) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let sink = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = sink.clone();
                let reply = reply.clone();
                async move {
                    let auth = headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    sink.lock().unwrap().push((auth, body));
                    tokio::time::sleep(delay).await;
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn client_for(endpoint: &str) -> RemoteCompletionClient {
        RemoteCompletionClient::new(CompletionConfig {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_millis(500),
            ..CompletionConfig::default()
        })
    }

    fn reply_with(content: Value) -> Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[test]
    fn configure_tracks_latest_credential() {
        let mut client = client_for("http://127.0.0.1:1");
        assert!(!client.is_configured());
        assert!(client.is_bound_to(None));

        client.configure(Some("abc"));
        assert!(client.is_configured());
        assert!(client.is_bound_to(Some("abc")));
        assert!(!client.is_bound_to(Some("abd")));
        assert!(!client.is_bound_to(None));

        client.configure(Some("abc"));
        assert!(client.is_configured());

        client.configure(Some("def"));
        assert_eq!(client.binding.as_ref().unwrap().credential, "def");

        client.configure(None);
        assert!(!client.is_configured());
    }

    #[test]
    fn reconfiguring_same_credential_keeps_service() {
        let mut client = client_for("http://127.0.0.1:1");
        client.configure(Some("abc"));
        let first = client.binding.as_ref().unwrap().service.clone().unwrap();
        client.configure(Some("abc"));
        let second = client.binding.as_ref().unwrap().service.clone().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn complete_without_credential_is_caller_error() {
        let client = client_for("http://127.0.0.1:1");
        assert!(matches!(
            client.complete("hello").await,
            Err(CompletionError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn complete_returns_model_text_verbatim() {
        let (url, seen) = fake_provider(
            StatusCode::OK,
            reply_with(json!("42, obviously.")),
            Duration::ZERO,
        )
        .await;
        let mut client = client_for(&url);
        client.configure(Some("sk-abc"));

        let answer = client.complete("what is the meaning of life").await.unwrap();
        assert_eq!(answer, "42, obviously.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-abc"));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["content"], "what is the meaning of life");
    }

    #[tokio::test]
    async fn empty_content_yields_no_answer_reply() {
        for content in [Value::Null, json!("")] {
            let (url, _) =
                fake_provider(StatusCode::OK, reply_with(content), Duration::ZERO).await;
            let mut client = client_for(&url);
            client.configure(Some("sk-abc"));
            assert_eq!(client.complete("hmm").await.unwrap(), NO_ANSWER_REPLY);
        }
    }

    #[tokio::test]
    async fn provider_failures_yield_connection_trouble_reply() {
        let cases = [
            (StatusCode::UNAUTHORIZED, json!({ "error": { "message": "bad key" } })),
            (StatusCode::TOO_MANY_REQUESTS, json!({ "error": { "message": "slow down" } })),
            (StatusCode::OK, json!({ "choices": [] })),
            (StatusCode::OK, json!({ "unexpected": true })),
        ];
        for (status, body) in cases {
            let (url, seen) = fake_provider(status, body, Duration::ZERO).await;
            let mut client = client_for(&url);
            client.configure(Some("sk-abc"));
            assert_eq!(
                client.complete("anything").await.unwrap(),
                CONNECTION_TROUBLE_REPLY
            );
            assert_eq!(seen.lock().unwrap().len(), 1, "no retries for {status}");
        }
    }

    #[tokio::test]
    async fn unreachable_provider_yields_connection_trouble_reply() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut client = client_for(&format!("http://{addr}"));
        client.configure(Some("sk-abc"));
        assert_eq!(
            client.complete("anything").await.unwrap(),
            CONNECTION_TROUBLE_REPLY
        );
    }

    #[tokio::test]
    async fn slow_provider_is_cut_off_by_timeout() {
        let (url, _) = fake_provider(
            StatusCode::OK,
            reply_with(json!("too late")),
            Duration::from_secs(3),
        )
        .await;
        let mut client = client_for(&url);
        client.configure(Some("sk-abc"));

        let started = std::time::Instant::now();
        let answer = client.complete("anything").await.unwrap();
        assert_eq!(answer, CONNECTION_TROUBLE_REPLY);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn unusable_credential_yields_connection_trouble_reply() {
        let mut client = client_for("http://127.0.0.1:1");
        client.configure(Some("sk-\nbroken"));
        assert!(client.is_configured());
        assert_eq!(
            client.complete("anything").await.unwrap(),
            CONNECTION_TROUBLE_REPLY
        );
    }
}
