//! FAQ-first response resolution.
//!
//! Public API: [`ResponseResolver::resolve`]. It answers from the static
//! [`KnowledgeBase`] when a [`FaqMatcher`] finds an entry, otherwise delegates
//! to the remote completion client bound to the stored credential, otherwise
//! returns [`FAQ_ONLY_FALLBACK`]. [`ConversationSession`] keeps the message
//! history of one chat and guards against overlapping submissions.

pub mod credential_store;
pub mod errors;
pub mod knowledge_base;
pub mod matcher;
pub mod resolver;
pub mod session;

pub use credential_store::{
    CREDENTIAL_KEY, CredentialStore, CredentialStoreRef, FileCredentialStore,
    InMemoryCredentialStore,
};
pub use errors::{ResolverError, Result, SessionError};
pub use knowledge_base::{FaqEntry, KnowledgeBase};
pub use matcher::{FaqMatcher, SubstringMatcher};
pub use resolver::{FAQ_ONLY_FALLBACK, ResponseResolver};
pub use session::{ConversationSession, Message, SessionState};
