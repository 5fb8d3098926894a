use std::{net::SocketAddr, time::Duration};

use completion_client::{CompletionConfig, config_from_lookup};
use faq_resolver::{
    CredentialStoreRef, KnowledgeBase, ResolverError, ResponseResolver, credential_store,
};
use thiserror::Error;

use crate::core::session_registry::{SessionLimits, SessionRegistry};

pub const DEFAULT_API_ADDRESS: &str = "127.0.0.1:8080";

/// Startup configuration failures. Never produced while serving.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API_ADDRESS `{value}`: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("invalid number in {var}: {reason}")]
    InvalidNumber { var: &'static str, reason: String },

    #[error(transparent)]
    Completion(#[from] completion_client::CompletionError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// FAQ → remote → fallback pipeline; clones share everything.
    pub resolver: ResponseResolver,
    /// Live chat sessions, in memory only.
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(resolver: ResponseResolver) -> Self {
        Self::with_limits(resolver, SessionLimits::default())
    }

    pub fn with_limits(resolver: ResponseResolver, limits: SessionLimits) -> Self {
        Self {
            resolver,
            sessions: SessionRegistry::new(limits),
        }
    }

    /// Builds the resolver from `FAQ_PATH`, `CREDENTIAL_STORE*` and the
    /// `OPENAI_*` / `COMPLETION_TIMEOUT_SECS` variables, and the session
    /// registry from `MAX_SESSIONS` / `SESSION_IDLE_TTL_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let completion: CompletionConfig = config_from_lookup(&lookup)?;
        let credentials: CredentialStoreRef = credential_store::store_from_lookup(&lookup)?;
        let knowledge_base = KnowledgeBase::from_lookup(&lookup)?;
        let limits = session_limits_from_lookup(&lookup)?;

        Ok(Self::with_limits(
            ResponseResolver::new(knowledge_base, credentials, completion),
            limits,
        ))
    }
}

/// `MAX_SESSIONS` and `SESSION_IDLE_TTL_SECS`; both must be positive.
pub fn session_limits_from_lookup<F>(lookup: F) -> Result<SessionLimits, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let positive = |var: &'static str| -> Result<Option<u64>, ConfigError> {
        let Some(raw) = lookup(var).filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(0) => Err(ConfigError::InvalidNumber {
                var,
                reason: "must be greater than zero".into(),
            }),
            Ok(n) => Ok(Some(n)),
            Err(e) => Err(ConfigError::InvalidNumber {
                var,
                reason: e.to_string(),
            }),
        }
    };

    let mut limits = SessionLimits::default();
    if let Some(max) = positive("MAX_SESSIONS")? {
        limits.max_sessions = usize::try_from(max).unwrap_or(usize::MAX);
    }
    if let Some(secs) = positive("SESSION_IDLE_TTL_SECS")? {
        limits.idle_ttl = Duration::from_secs(secs);
    }
    Ok(limits)
}

/// `API_ADDRESS`, defaulting to [`DEFAULT_API_ADDRESS`].
pub fn api_address_from_env() -> Result<SocketAddr, ConfigError> {
    api_address_from_lookup(|name| std::env::var(name).ok())
}

pub fn api_address_from_lookup<F>(lookup: F) -> Result<SocketAddr, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup("API_ADDRESS")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_ADDRESS.to_string());

    value.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidAddress {
        reason: e.to_string(),
        value,
    })
}
