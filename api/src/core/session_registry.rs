//! In-memory registry of live chat sessions.
//!
//! Each session sits behind its own async mutex so a long remote call in one
//! chat never blocks another. The lock is only held to begin or complete a
//! submission, never across resolution; the session's own state machine is
//! what rejects overlapping submissions.
//!
//! Idle sessions are evicted when a new one is created: first every session
//! idle for longer than [`SessionLimits::idle_ttl`], then, while the registry
//! is still full, the longest-idle one. Busy sessions are never evicted.

use std::{collections::HashMap, sync::Arc, time::Duration};

use faq_resolver::{ConversationSession, Message, ResponseResolver};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error_handler::{AppError, AppResult};

pub type SharedSession = Arc<Mutex<ConversationSession>>;

pub const DEFAULT_MAX_SESSIONS: usize = 1_000;
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Registry size at which the longest-idle session makes room.
    pub max_sessions: usize,
    /// Sessions idle for longer than this are dropped.
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: DEFAULT_SESSION_IDLE_TTL,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SharedSession>>>,
    limits: SessionLimits,
}

impl SessionRegistry {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::default(),
            limits,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Creates and registers a fresh session; returns a snapshot of it.
    pub async fn create(&self) -> ConversationSession {
        let session = ConversationSession::new();
        let snapshot = session.clone();
        let mut sessions = self.sessions.write().await;
        self.evict(&mut sessions);
        sessions.insert(session.id().to_string(), Arc::new(Mutex::new(session)));
        info!(session = %snapshot.id(), live = sessions.len(), "session created");
        snapshot
    }

    /// Drops expired idle sessions, then the longest-idle ones until there
    /// is room for one more. Sessions locked by a request are left alone.
    fn evict(&self, sessions: &mut HashMap<String, SharedSession>) {
        let before = sessions.len();
        let ttl = self.limits.idle_ttl;
        sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => s.is_busy() || s.idle_for() <= ttl,
            Err(_) => true,
        });

        while sessions.len() >= self.limits.max_sessions {
            let longest_idle = sessions
                .iter()
                .filter_map(|(id, session)| {
                    let s = session.try_lock().ok()?;
                    (!s.is_busy()).then(|| (s.idle_for(), id.clone()))
                })
                .max_by_key(|(idle, _)| *idle);

            match longest_idle {
                Some((_, id)) => {
                    sessions.remove(&id);
                }
                None => {
                    warn!(
                        live = sessions.len(),
                        max = self.limits.max_sessions,
                        "session limit reached but every session is busy"
                    );
                    break;
                }
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, live = sessions.len(), "idle sessions evicted");
        }
    }

    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Records `text`, resolves it and records the reply.
    ///
    /// Resolution and completion run on a detached task: if the caller is
    /// dropped mid-flight the session still returns to idle. A panic inside
    /// the resolver is turned into the generic processing-error message.
    ///
    /// Returns `(user_message, reply)`.
    pub async fn submit(
        session: SharedSession,
        resolver: &ResponseResolver,
        text: &str,
    ) -> AppResult<(Message, Message)> {
        let user_message = session.lock().await.begin_submission(text)?;
        debug!(message = %user_message.id, "submission accepted");

        let question = user_message.text.clone();
        let resolver = resolver.clone();
        let worker = tokio::spawn(async move {
            let outcome = tokio::spawn(async move { resolver.resolve(&question).await }).await;
            session.lock().await.complete_submission(outcome)
        });

        let reply = worker
            .await
            .map_err(|e| AppError::Internal(format!("session worker failed: {e}")))??;
        Ok((user_message, reply))
    }
}
