//! Learned phrase-to-action patterns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::entity::{next_use_timestamp, KnowledgeEntity, UsageTracked};
use super::platform::{Brand, Platform};

/// Where a learned pattern came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    /// Derived from an AI step decomposition
    #[default]
    AiLearned,
    /// Derived from previously executed tests
    Historical,
    /// Entered by a user
    UserTaught,
}

impl PatternSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternSource::AiLearned => "ai_learned",
            PatternSource::Historical => "historical",
            PatternSource::UserTaught => "user_taught",
        }
    }
}

impl fmt::Display for PatternSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable phrase-to-action pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub id: String,
    /// Verb, e.g. `click`
    pub action: String,
    /// Object of the verb, e.g. `play button`
    pub target: String,
    pub details: Option<String>,
    pub screen: Option<String>,
    pub platform: Platform,
    pub brand: Brand,
    /// Natural-language variants that should hit this pattern
    pub phrases: BTreeSet<String>,
    pub usage_count: u64,
    pub source: PatternSource,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl LearnedPattern {
    /// Create a pattern without generated phrases
    pub fn new(id: impl Into<String>, action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: action.into().trim().to_lowercase(),
            target: target.into().trim().to_lowercase(),
            details: None,
            screen: None,
            platform: Platform::None,
            brand: Brand::None,
            phrases: BTreeSet::new(),
            usage_count: 0,
            source: PatternSource::AiLearned,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Canonical phrase, e.g. `click play button`
    pub fn canonical_phrase(&self) -> String {
        format!("{} {}", self.action, self.target).trim().to_string()
    }

    /// Snake-case action phrase, e.g. `click_play_button`
    pub fn action_phrase(&self) -> String {
        self.canonical_phrase().split_whitespace().collect::<Vec<_>>().join("_")
    }
}

impl KnowledgeEntity for LearnedPattern {
    const COLLECTION: &'static str = "learned_patterns";

    fn id(&self) -> &str {
        &self.id
    }

    fn document_text(&self) -> String {
        let mut parts = vec![self.canonical_phrase()];
        parts.extend(self.phrases.iter().cloned());
        if let Some(details) = &self.details {
            parts.push(details.clone());
        }
        if let Some(screen) = &self.screen {
            parts.push(screen.clone());
        }
        if self.platform.is_known() {
            parts.push(self.platform.to_string());
        }
        if self.brand.is_known() {
            parts.push(self.brand.to_string());
        }
        parts.join(" ")
    }

    /// Every phrase variant, bare and followed by the pattern's platform, brand and screen
    fn match_phrases(&self) -> Vec<String> {
        let mut qualifiers = Vec::new();
        if self.platform.is_known() {
            qualifiers.push(self.platform.to_string());
        }
        if self.brand.is_known() {
            qualifiers.push(self.brand.to_string());
        }
        if let Some(screen) = &self.screen {
            qualifiers.push(screen.clone());
        }
        let suffix = qualifiers.join(" ");

        let canonical = self.canonical_phrase();
        let mut variants: Vec<String> = self.phrases.iter().filter(|p| **p != canonical).cloned().collect();
        variants.insert(0, canonical);

        let mut phrases = Vec::with_capacity(variants.len() * 2);
        for variant in variants {
            if !suffix.is_empty() {
                phrases.push(format!("{} {}", variant, suffix));
            }
            phrases.push(variant);
        }
        phrases
    }
}

impl UsageTracked for LearnedPattern {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases() {
        let pattern = LearnedPattern::new("p1", "Click", " Play Button ");
        assert_eq!(pattern.canonical_phrase(), "click play button");
        assert_eq!(pattern.action_phrase(), "click_play_button");
    }

    #[test]
    fn test_match_phrases_qualify_every_variant() {
        let mut pattern = LearnedPattern::new("p1", "click", "play button");
        pattern.phrases = ["click play button", "tap play button"].iter().map(|p| p.to_string()).collect();
        assert_eq!(pattern.match_phrases(), vec!["click play button", "tap play button"]);

        pattern.screen = Some("player".into());
        let phrases = pattern.match_phrases();
        assert_eq!(phrases.len(), 4);
        assert!(phrases.contains(&"tap play button player".to_string()));
    }

    #[test]
    fn test_source_serializes_snake_case() {
        let value = serde_json::to_value(PatternSource::AiLearned).unwrap();
        assert_eq!(value, "ai_learned");
    }
}
