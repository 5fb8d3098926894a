//! OpenAI-compatible chat completion service.
//!
//! Minimal, non-streaming client around the REST API. The endpoint is derived
//! from `CompletionConfig::endpoint`:
//! - POST {endpoint}/v1/chat/completions — chat completion (non-streaming)
//!
//! Constructor validation:
//! - `cfg.api_key` must be present and usable as a header value
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via [`CompletionError`].

use std::time::Instant;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::completion_config::CompletionConfig,
    error_handler::{CompletionError, Result, make_snippet},
};

/// Thin client for a chat-completion provider.
///
/// Constructed from a complete [`CompletionConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers,
/// including the bearer credential).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: CompletionConfig,
    url_chat: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`CompletionError::MissingApiKey`] if `cfg.api_key` is `None` or blank
    /// - [`CompletionError::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`CompletionError::InvalidApiKeyHeader`] if the key has non-header characters
    /// - [`CompletionError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: CompletionConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CompletionError::MissingApiKey)?;

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(CompletionError::InvalidEndpoint(cfg.endpoint.clone()));
        }

        let mut auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| CompletionError::InvalidApiKeyHeader(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()?;

        let url_chat = format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'));

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_ms = cfg.timeout.as_millis(),
            key_len = api_key.len(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Performs a **non-streaming** chat completion request.
    ///
    /// `messages` holds the optional system message and the user `prompt`.
    /// Model, temperature and `max_tokens` come from the config.
    ///
    /// Returns `Ok(None)` when the first choice carries no (or empty) text.
    ///
    /// # Errors
    /// - [`CompletionError::HttpStatus`] for non-2xx responses
    /// - [`CompletionError::HttpTransport`] for client/network failures
    /// - [`CompletionError::Decode`] if the JSON cannot be parsed
    /// - [`CompletionError::EmptyChoices`] if no choices are returned
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Option<String>> {
        let started = Instant::now();
        let body = ChatCompletionRequest::from_cfg(&self.cfg, prompt, system);

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            has_system = system.is_some(),
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "chat completion returned non-success status"
            );

            return Err(CompletionError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: ChatCompletionResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode chat completion response"
                );
                return Err(CompletionError::Decode(format!(
                    "serde error: {e}; expected `choices[0].message.content`"
                )));
            }
        };

        let first = out
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyChoices)?;
        let content = first.message.content.filter(|c| !c.is_empty());

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            has_content = content.is_some(),
            "chat completion completed"
        );

        Ok(content)
    }

    /// Config this service was built from.
    pub fn config(&self) -> &CompletionConfig {
        &self.cfg
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Minimal request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(cfg: &'a CompletionConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        Self {
            model: &cfg.model,
            messages,
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}
