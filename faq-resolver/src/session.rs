//! Conversation session: ordered message history plus a busy flag.
//!
//! A session is a two-state machine. `Idle` accepts a submission and moves to
//! `AwaitingResponse`; completing the submission appends the reply and moves
//! back to `Idle`. Submissions arriving while `AwaitingResponse` are rejected
//! with [`SessionError::Busy`], never queued.

use std::{fmt::Display, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{errors::SessionError, resolver::ResponseResolver};

/// First message of every session.
pub const WELCOME_MESSAGE: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// Notice appended after a credential is stored.
pub const CREDENTIAL_SET_NOTICE: &str =
    "OpenAI API key has been set. You can now ask me anything!";

/// Reply used when resolution itself failed unexpectedly.
pub const PROCESSING_ERROR_REPLY: &str =
    "Sorry, I'm having trouble processing your request. Please try again later.";

/// One chat message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_prefix(prefix: &str, text: impl Into<String>, is_user: bool) -> Self {
        Self {
            id: format!("{prefix}-{}", Uuid::new_v4()),
            text: text.into(),
            is_user,
            timestamp: Utc::now(),
        }
    }

    fn welcome() -> Self {
        Self {
            id: "welcome".to_string(),
            text: WELCOME_MESSAGE.to_string(),
            is_user: false,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    messages: Vec<Message>,
    state: SessionState,
}

/// Completes the in-flight submission with [`PROCESSING_ERROR_REPLY`] if
/// [`ConversationSession::submit`] is dropped before its answer arrives.
struct PendingSubmission<'a> {
    session: &'a mut ConversationSession,
    settled: bool,
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self
                .session
                .complete_submission::<&str>(Err("submission dropped before the answer arrived"));
        }
    }
}

impl ConversationSession {
    /// New idle session with a random id and the welcome message.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            messages: vec![Message::welcome()],
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last recorded message.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// How long the session has gone without a new message.
    pub fn idle_for(&self) -> Duration {
        (Utc::now() - self.updated_at).to_std().unwrap_or_default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SessionState::AwaitingResponse
    }

    /// Records the user's message and marks the session busy.
    ///
    /// `text` is trimmed; the returned message carries the trimmed text,
    /// which is what should be resolved.
    ///
    /// # Errors
    /// - [`SessionError::EmptyInput`] for blank text (nothing is recorded)
    /// - [`SessionError::Busy`] while a previous submission is in flight
    pub fn begin_submission(&mut self, text: &str) -> Result<Message, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        if self.is_busy() {
            debug!(session = %self.id, "submission rejected: session busy");
            return Err(SessionError::Busy);
        }

        let message = Message::with_prefix("user", text, true);
        self.record(message.clone());
        self.state = SessionState::AwaitingResponse;
        Ok(message)
    }

    /// Appends the reply for the in-flight submission and returns to idle.
    ///
    /// An `Err` outcome is logged and replaced by [`PROCESSING_ERROR_REPLY`].
    ///
    /// # Errors
    /// [`SessionError::NotAwaiting`] if no submission is in flight.
    pub fn complete_submission<E: Display>(
        &mut self,
        outcome: Result<String, E>,
    ) -> Result<Message, SessionError> {
        if !self.is_busy() {
            return Err(SessionError::NotAwaiting);
        }

        let message = match outcome {
            Ok(text) => Message::with_prefix("ai", text, false),
            Err(e) => {
                error!(session = %self.id, error = %e, "resolution failed unexpectedly");
                Message::with_prefix("error", PROCESSING_ERROR_REPLY, false)
            }
        };
        self.record(message.clone());
        self.state = SessionState::Idle;
        Ok(message)
    }

    /// Full round-trip for a single owner: record, resolve, record the reply.
    ///
    /// Resolution runs on its own task, so a panic inside it surfaces as a
    /// join error and is answered with [`PROCESSING_ERROR_REPLY`]. Dropping
    /// the returned future cancels the wait: the session records
    /// [`PROCESSING_ERROR_REPLY`] and goes back to idle.
    pub async fn submit(
        &mut self,
        resolver: &ResponseResolver,
        text: &str,
    ) -> Result<Message, SessionError> {
        let question = self.begin_submission(text)?.text;
        let mut pending = PendingSubmission {
            session: self,
            settled: false,
        };

        let resolver = resolver.clone();
        let outcome = tokio::spawn(async move { resolver.resolve(&question).await }).await;

        pending.settled = true;
        pending.session.complete_submission(outcome)
    }

    /// Appends the "credential set" system notice.
    pub fn note_credential_set(&mut self) -> Message {
        let message = Message::with_prefix("system", CREDENTIAL_SET_NOTICE, false);
        self.record(message.clone());
        message
    }

    fn record(&mut self, message: Message) {
        self.updated_at = message.timestamp;
        self.messages.push(message);
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}
