//! User-taught terminology

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::entity::{next_use_timestamp, normalize_phrase, push_unique, KnowledgeEntity, UsageTracked};

/// A human-taught synonym for one or more actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTerm {
    pub id: String,
    /// Normalized lower-case term
    pub user_term: String,
    /// Action phrases the term stands for, in order
    pub expands_to: Vec<String>,
    /// Alternative spellings of the term
    pub synonyms: BTreeSet<String>,
    /// Free-text note on where the term applies
    pub context: String,
    pub confidence: f32,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl UserTerm {
    /// Create a term; the term and synonyms are normalized
    pub fn new<I, S>(id: impl Into<String>, term: &str, expands_to: Vec<String>, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            id: id.into(),
            user_term: normalize_phrase(term),
            expands_to,
            synonyms: synonyms
                .into_iter()
                .map(|s| normalize_phrase(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
            context: String::new(),
            confidence: 1.0,
            usage_count: 0,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Set the context note
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Fold a re-teaching of the same term into this entry
    pub fn absorb(&mut self, other: UserTerm) {
        for action in other.expands_to {
            push_unique(&mut self.expands_to, action);
        }
        self.synonyms.extend(other.synonyms);
        if !other.context.is_empty() {
            self.context = other.context;
        }
        self.confidence = self.confidence.max(other.confidence);
    }
}

impl KnowledgeEntity for UserTerm {
    const COLLECTION: &'static str = "user_terminology";

    fn id(&self) -> &str {
        &self.id
    }

    fn document_text(&self) -> String {
        let mut parts = vec![self.user_term.clone()];
        parts.extend(self.synonyms.iter().cloned());
        parts.join(" ")
    }

    fn match_phrases(&self) -> Vec<String> {
        std::iter::once(self.user_term.clone())
            .chain(self.synonyms.iter().cloned())
            .collect()
    }
}

impl UsageTracked for UserTerm {
    fn usage_count(&self) -> u64 {
        self.usage_count
    }

    fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    fn record_usage(&mut self, now: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_used_at = Some(next_use_timestamp(self.last_used_at, now));
    }
}
