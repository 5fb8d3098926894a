//! Completion config loaded from environment variables.
//!
//! Everything has a default, so an empty environment yields the fixed request
//! shape (`gpt-4o-mini`, temperature `0.7`, `max_tokens = 150`). Only the
//! transport knobs can be overridden:
//!
//! - `OPENAI_URL`              = API base URL (default `https://api.openai.com`)
//! - `OPENAI_MODEL`            = model identifier (default `gpt-4o-mini`)
//! - `COMPLETION_TIMEOUT_SECS` = per-call timeout in seconds (default `30`)
//!
//! The credential is never read from the environment; it comes from the
//! credential store at resolution time.

use std::time::Duration;

use crate::{
    config::completion_config::CompletionConfig,
    error_handler::{ConfigError, Result, parse_opt_u64},
};

/// Builds the completion config from a variable lookup (usually
/// `std::env::var`). Blank values are treated as unset.
///
/// # Errors
/// - [`ConfigError::InvalidNumber`] if `COMPLETION_TIMEOUT_SECS` is not a `u64` or is `0`
/// - [`ConfigError::InvalidFormat`] if `OPENAI_URL` is not http/https
/// - [`ConfigError::EmptyModel`] if `OPENAI_MODEL` is blank
pub fn config_from_lookup<F>(lookup: F) -> Result<CompletionConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let mut cfg = CompletionConfig::default();

    if let Some(url) = non_blank("OPENAI_URL") {
        cfg.endpoint = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(model) = lookup("OPENAI_MODEL") {
        cfg.model = model.trim().to_string();
    }
    match parse_opt_u64("COMPLETION_TIMEOUT_SECS", lookup("COMPLETION_TIMEOUT_SECS"))? {
        Some(0) => {
            return Err(ConfigError::InvalidNumber {
                var: "COMPLETION_TIMEOUT_SECS",
                reason: "must be greater than zero",
            }
            .into());
        }
        Some(secs) => cfg.timeout = Duration::from_secs(secs),
        None => {}
    }

    cfg.validate()?;
    Ok(cfg)
}
