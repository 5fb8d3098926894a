//! Unified error handling for `completion-client`.
//!
//! This module exposes a single top-level error type [`CompletionError`] for the
//! whole library and groups configuration problems in [`ConfigError`]. Small
//! helpers for parsing/validating configuration values return the unified
//! [`Result<T>`] alias.
//!
//! All messages include the suffix `[Completion Client]` to simplify attribution in logs.
//! None of them ever contain the credential.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, CompletionError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `completion-client` crate.
///
/// Callers of [`crate::RemoteCompletionClient::complete`] only ever see
/// [`CompletionError::NotConfigured`]; everything else is logged and turned
/// into a canned reply at that boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Configuration/validation errors (startup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `complete` was called before a credential was bound.
    #[error("[Completion Client] client is not configured with a credential")]
    NotConfigured,

    /// The service was constructed without an API key.
    #[error("[Completion Client] missing API key")]
    MissingApiKey,

    /// The endpoint is empty or does not start with http/https.
    #[error("[Completion Client] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The credential cannot be carried in an HTTP header.
    #[error("[Completion Client] invalid API key header: {0}")]
    InvalidApiKeyHeader(String),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[Completion Client] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Upstream returned a non-successful HTTP status.
    #[error("[Completion Client] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[Completion Client] decode error: {0}")]
    Decode(String),

    /// The provider answered without any choice.
    #[error("[Completion Client] response contained no choices")]
    EmptyChoices,

    /// Operation exceeded the configured timeout.
    #[error("[Completion Client] operation timed out after {0:?}")]
    Timeout(Duration),
}

impl CompletionError {
    /// `true` for 401/403 answers (bad or revoked credential).
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CompletionError::HttpStatus { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    /// `true` for 429 answers.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            CompletionError::HttpStatus { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS
        )
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A number failed to parse (like timeouts).
    #[error("[Completion Client] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `COMPLETION_TIMEOUT_SECS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[Completion Client] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `OPENAI_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[Completion Client] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g., `temperature`).
        field: &'static str,
        /// Description of the expected range.
        detail: &'static str,
    },

    /// Model name was empty.
    #[error("[Completion Client] model name must not be empty")]
    EmptyModel,
}

/* ------------------------------------------------------------------------- */
/* Parse helpers                                                             */
/* ------------------------------------------------------------------------- */

/// Parses an optional `u64` (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`CompletionError::Config`] with [`ConfigError::InvalidNumber`] if the
/// value is set but not a valid `u64`.
pub fn parse_opt_u64(var: &'static str, raw: Option<String>) -> Result<Option<u64>> {
    match raw {
        Some(v) if !v.trim().is_empty() => v.trim().parse::<u64>().map(Some).map_err(|_| {
            CompletionError::from(ConfigError::InvalidNumber {
                var,
                reason: "expected u64",
            })
        }),
        _ => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`CompletionError::Config`] with [`ConfigError::InvalidFormat`] when
/// the string does not start with a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// Validates that a floating-point value lies within an inclusive range.
///
/// # Errors
/// Returns [`CompletionError::Config`] with [`ConfigError::OutOfRange`] if `value`
/// is outside `[min, max]`.
pub fn validate_range_f32(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            detail: "expected value in inclusive range",
        }
        .into())
    }
}

/// Trims a response body down to a short, single-line snippet for logs.
pub fn make_snippet(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX_CHARS {
        let head: String = flat.chars().take(MAX_CHARS).collect();
        format!("{head}…")
    } else {
        flat
    }
}
