//! FAQ → remote completion → fallback decision.

use std::sync::Arc;

use completion_client::{
    CONNECTION_TROUBLE_REPLY, CompletionConfig, CompletionError, RemoteCompletionClient,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::{
    credential_store::CredentialStoreRef,
    knowledge_base::{FaqEntry, KnowledgeBase},
    matcher::{FaqMatcher, SubstringMatcher},
};

/// Answer when no FAQ matches and no credential is stored.
pub const FAQ_ONLY_FALLBACK: &str = "To enable AI-powered responses for custom questions, \
please set your OpenAI API key using the 'Set API Key' button in the top right. \
For now, I can only answer questions from our FAQ database. \
If your question isn't covered, please contact our customer service team for assistance.";

/// Decides, per question, between an FAQ answer, a remote completion and
/// the FAQ-only fallback.
///
/// Cheap to clone; clones share the knowledge base, the credential store and
/// the remote client.
#[derive(Clone)]
pub struct ResponseResolver {
    knowledge_base: Arc<KnowledgeBase>,
    matcher: Arc<dyn FaqMatcher>,
    credentials: CredentialStoreRef,
    remote: Arc<RwLock<RemoteCompletionClient>>,
}

impl ResponseResolver {
    /// Builds a resolver with the [`SubstringMatcher`] and configures the
    /// remote client from the currently stored credential.
    pub fn new(
        knowledge_base: KnowledgeBase,
        credentials: CredentialStoreRef,
        completion: CompletionConfig,
    ) -> Self {
        let mut remote = RemoteCompletionClient::new(completion);
        remote.configure(credentials.get().as_deref());

        info!(
            faq_entries = knowledge_base.len(),
            remote_configured = remote.is_configured(),
            "response resolver ready"
        );

        Self {
            knowledge_base: Arc::new(knowledge_base),
            matcher: Arc::new(SubstringMatcher),
            credentials,
            remote: Arc::new(RwLock::new(remote)),
        }
    }

    /// Replaces the FAQ matching strategy.
    pub fn with_matcher(mut self, matcher: Arc<dyn FaqMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Produces the answer text for `question`. Never fails.
    ///
    /// 1. re-binds the remote client to the stored credential
    /// 2. first FAQ entry accepted by the matcher
    /// 3. remote completion, returned untouched (including its canned failures)
    /// 4. [`FAQ_ONLY_FALLBACK`]
    #[instrument(skip_all, fields(question_len = question.len()))]
    pub async fn resolve(&self, question: &str) -> String {
        let remote = self.refresh_remote().await;

        if let Some(entry) = self.match_faq(question) {
            debug!(faq = %entry.question, "answered from FAQ");
            return entry.answer.clone();
        }

        if !remote.is_configured() {
            debug!("no FAQ match and no remote client; FAQ-only fallback");
            return FAQ_ONLY_FALLBACK.to_string();
        }
        remote_reply(remote.complete(question).await)
    }

    /// FAQ lookup only (no remote call, no reconfiguration).
    pub fn match_faq(&self, question: &str) -> Option<&FaqEntry> {
        self.matcher.find(&self.knowledge_base, question)
    }

    /// Persists `value` and re-binds the remote client to it.
    ///
    /// The value is stored verbatim; callers trim and reject empty input.
    pub async fn set_credential(&self, value: &str) {
        self.credentials.set(value);
        let remote = self.refresh_remote().await;
        info!(
            remote_configured = remote.is_configured(),
            "credential updated"
        );
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.has_credential()
    }

    /// Whether the remote client is currently bound to a credential.
    pub async fn is_remote_configured(&self) -> bool {
        self.remote.read().await.is_configured()
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// Aligns the shared client with the stored credential and returns a
    /// snapshot so no lock is held across the network call.
    async fn refresh_remote(&self) -> RemoteCompletionClient {
        let credential = self.credentials.get();
        {
            let current = self.remote.read().await;
            if current.is_bound_to(credential.as_deref()) {
                return current.clone();
            }
        }
        let mut w = self.remote.write().await;
        w.configure(credential.as_deref());
        w.clone()
    }
}

/// Maps the remote outcome for a configured client to the user-facing text.
///
/// A client unbound between the snapshot and the call yields the FAQ-only
/// fallback; any other error is the connection-trouble apology.
fn remote_reply(outcome: completion_client::Result<String>) -> String {
    match outcome {
        Ok(answer) => answer,
        Err(CompletionError::NotConfigured) => FAQ_ONLY_FALLBACK.to_string(),
        Err(e) => {
            error!(error = %e, "remote completion failed past the client boundary");
            CONNECTION_TROUBLE_REPLY.to_string()
        }
    }
}
