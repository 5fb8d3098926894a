use std::fmt;
use std::time::Duration;

use crate::error_handler::{Result, validate_http_endpoint, validate_range_f32};

/// Base URL of the public OpenAI API.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

/// Model used for every remote completion.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature sent with every request.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Upper bound on the length of a remote answer, in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Upper bound on a single remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Instruction sent as the system message of every request.
pub const SYSTEM_PROMPT: &str = "You are a helpful customer service chatbot for a business. \
Answer questions concisely and professionally. \
If you don't know the answer, suggest contacting customer service.";

/// Configuration for a remote chat-completion invocation.
///
/// # Fields
///
/// - `model`: model identifier (e.g. `"gpt-4o-mini"`).
/// - `endpoint`: API base URL; `/v1/chat/completions` is appended.
/// - `api_key`: bearer credential, `None` until a credential is bound.
/// - `max_tokens`: maximum number of tokens to generate.
/// - `temperature`: sampling temperature.
/// - `system_prompt`: fixed instruction for the assistant persona.
/// - `timeout`: bound on the whole request (connect + response).
///
/// `Debug` never prints the credential.
///
/// # Examples
///
/// ```
/// use completion_client::CompletionConfig;
///
/// let cfg = CompletionConfig::default().with_api_key("sk-test");
/// assert_eq!(cfg.max_tokens, Some(150));
/// assert!(cfg.api_key.is_some());
/// ```
#[derive(Clone, PartialEq)]
pub struct CompletionConfig {
    /// Model identifier string.
    pub model: String,

    /// API base URL (scheme + host, optional path prefix).
    pub endpoint: String,

    /// Bearer credential for the provider.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature (controls creativity).
    pub temperature: Option<f32>,

    /// System instruction prepended to every request.
    pub system_prompt: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl CompletionConfig {
    /// Returns a copy of this config bound to `api_key`.
    pub fn with_api_key(&self, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..self.clone()
        }
    }

    /// Checks endpoint scheme, model name and sampling range.
    ///
    /// # Errors
    /// Returns a [`crate::ConfigError`] wrapped in [`crate::CompletionError::Config`].
    pub fn validate(&self) -> Result<()> {
        validate_http_endpoint("OPENAI_URL", self.endpoint.trim())?;
        if self.model.trim().is_empty() {
            return Err(crate::error_handler::ConfigError::EmptyModel.into());
        }
        if let Some(t) = self.temperature {
            validate_range_f32("temperature", t, 0.0, 2.0)?;
        }
        Ok(())
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            temperature: Some(DEFAULT_TEMPERATURE),
            system_prompt: SYSTEM_PROMPT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}
