//! FAQ matching strategies.
//!
//! The resolver only depends on [`FaqMatcher`]; [`SubstringMatcher`] is the
//! shipped strategy (case-insensitive containment, first entry in list order
//! wins, no scoring).

use crate::knowledge_base::{FaqEntry, KnowledgeBase};

/// Picks the entry that answers `question`, if any.
pub trait FaqMatcher: Send + Sync {
    fn find<'kb>(&self, kb: &'kb KnowledgeBase, question: &str) -> Option<&'kb FaqEntry>;
}

/// Case-insensitive substring containment in both directions.
///
/// An entry matches when either
/// - the entry's question contains the user's question, or
/// - the user's question contains the entry's question cut at its first `?`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringMatcher;

impl SubstringMatcher {
    /// Both arguments must already be lowercased.
    pub fn matches(entry_question: &str, user_question: &str) -> bool {
        if entry_question.contains(user_question) {
            return true;
        }
        let head = entry_question.split('?').next().unwrap_or(entry_question);
        user_question.contains(head)
    }
}

impl FaqMatcher for SubstringMatcher {
    fn find<'kb>(&self, kb: &'kb KnowledgeBase, question: &str) -> Option<&'kb FaqEntry> {
        let needle = question.to_lowercase();
        kb.iter()
            .find(|entry| Self::matches(&entry.question.to_lowercase(), &needle))
    }
}
