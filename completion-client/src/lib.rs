//! Remote completion client for the FAQ assistant.
//!
//! Wraps a single OpenAI-compatible `/v1/chat/completions` call behind
//! [`RemoteCompletionClient`], which is bound to (or torn down from) the
//! current credential and converts every provider failure into a fixed,
//! user-presentable reply.

pub mod config;
pub mod error_handler;
pub mod remote_client;
pub mod services;

pub use config::completion_config::CompletionConfig;
pub use config::default_config::config_from_lookup;
pub use error_handler::{CompletionError, ConfigError, Result};
pub use remote_client::{CONNECTION_TROUBLE_REPLY, NO_ANSWER_REPLY, RemoteCompletionClient};
pub use services::open_ai_service::OpenAiService;
