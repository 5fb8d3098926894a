//! Static FAQ knowledge base.
//!
//! Loaded once at startup, either from the built-in set or from a JSON file
//! (`FAQ_PATH`) shaped as `[{"question": "...", "answer": "..."}, ...]`.
//! Entry order is significant: it is the tie-break when several entries match.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{ResolverError, Result};

/// A single question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Ordered, immutable list of [`FaqEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    entries: Vec<FaqEntry>,
}

impl KnowledgeBase {
    /// Wraps `entries` as-is.
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    /// The built-in business FAQ set.
    pub fn builtin() -> Self {
        Self::new(vec![
            FaqEntry::new(
                "What are your hours of operation (business hours)?",
                "Our standard business hours are Monday through Friday, 9:00 AM to 6:00 PM Eastern Time. \
We are closed on weekends and major holidays.",
            ),
            FaqEntry::new(
                "What is your refund policy? Do you offer refunds?",
                "Yes, we offer a 30-day money-back guarantee on all our products. \
If you're not satisfied with your purchase, please contact our customer service team to process your refund.",
            ),
            FaqEntry::new(
                "How can I track my order?",
                "You can track your order by logging into your account on our website and viewing your order history. \
Alternatively, you can use the tracking number provided in your order confirmation email.",
            ),
            FaqEntry::new(
                "What payment methods do you accept?",
                "We accept all major credit cards (Visa, MasterCard, American Express, Discover), PayPal, and Apple Pay. \
For larger orders, we also offer wire transfers and purchase orders.",
            ),
            FaqEntry::new(
                "Do you ship internationally?",
                "Yes, we ship to over 100 countries worldwide. International shipping rates and delivery times vary by location. \
You can calculate shipping costs during checkout before completing your purchase.",
            ),
            FaqEntry::new(
                "How do I change or cancel my order?",
                "To change or cancel an order, please contact our customer service team as soon as possible. \
We can usually accommodate changes if the order hasn't been processed yet. \
Once an order has shipped, it cannot be changed or canceled.",
            ),
            FaqEntry::new(
                "What is your privacy policy?",
                "Our privacy policy outlines how we collect, use, and protect your personal information. \
We are committed to maintaining the confidentiality of your data and never share your information with third parties without your consent. \
You can find our complete privacy policy on our website.",
            ),
        ])
    }

    /// Parses and validates a JSON array of entries.
    ///
    /// # Errors
    /// - [`ResolverError::FaqFormat`] for malformed JSON
    /// - [`ResolverError::InvalidFaq`] for an entry that would match every
    ///   question (blank text before the first `?`) or has a blank answer
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let entries: Vec<FaqEntry> = serde_json::from_str(raw).map_err(ResolverError::FaqFormat)?;
        for (index, entry) in entries.iter().enumerate() {
            let head = entry.question.split('?').next().unwrap_or_default();
            if head.trim().is_empty() {
                return Err(ResolverError::InvalidFaq {
                    index,
                    reason: "question has no text before its first '?'",
                });
            }
            if entry.answer.trim().is_empty() {
                return Err(ResolverError::InvalidFaq {
                    index,
                    reason: "answer is blank",
                });
            }
        }
        Ok(Self::new(entries))
    }

    /// Reads a FAQ file (see [`KnowledgeBase::from_json_str`]).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ResolverError::FaqIo {
            path: path.to_path_buf(),
            source,
        })?;
        let kb = Self::from_json_str(&raw)?;
        info!(path = %path.display(), entries = kb.len(), "FAQ knowledge base loaded");
        Ok(kb)
    }

    /// The file named by `FAQ_PATH` if set, otherwise the built-in set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("FAQ_PATH") {
            Some(p) if !p.trim().is_empty() => Self::load(Path::new(p.trim())),
            _ => {
                let kb = Self::builtin();
                info!(entries = kb.len(), "using built-in FAQ knowledge base");
                Ok(kb)
            }
        }
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FaqEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}
