//! Typed errors for the faq-resolver crate.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolverError>;

#[derive(Debug, Error)]
pub enum ResolverError {
    /// FAQ file could not be read.
    #[error("failed to read FAQ file {path}: {source}")]
    FaqIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// FAQ content is not a JSON array of `{question, answer}` objects.
    #[error("invalid FAQ data: {0}")]
    FaqFormat(#[source] serde_json::Error),

    /// An entry would match every question or answer with nothing.
    #[error("FAQ entry #{index} is invalid: {reason}")]
    InvalidFaq { index: usize, reason: &'static str },

    /// Credential bucket could not be read or written.
    #[error("credential storage I/O error at {path}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Credential bucket exists but is not a JSON object of strings.
    #[error("credential storage at {path} is corrupt: {source}")]
    StorageFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Startup configuration problem.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Rejections from [`crate::ConversationSession`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyInput,

    #[error("a previous question is still being answered")]
    Busy,

    #[error("no question is awaiting an answer")]
    NotAwaiting,
}
