//! Atomic actions
//!
//! One atomic action is one callable page-object method, e.g.
//! "click play button" → `PlayerScreen.clickPlayButton()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::entity::{next_use_timestamp, KnowledgeEntity, UsageTracked};
use super::platform::{Brand, Platform};

/// Default confidence for actions mined from source
pub const DEFAULT_MINED_CONFIDENCE: f32 = 0.8;

/// A single resolvable method call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicAction {
    /// Unique id within the atomic collection
    pub id: String,
    /// Canonical verb_noun phrase, e.g. `click_play_button`
    pub action_name: String,
    /// Method identifier in source
    pub method_name: String,
    /// Declaring class
    pub class_name: String,
    /// Absolute path of the declaring file
    pub file_path: String,
    /// Path relative to the mined root
    pub relative_path: String,
    pub platform: Platform,
    pub brand: Brand,
    pub return_type: String,
    /// Parameter declarations in source order
    pub parameters: Vec<String>,
    /// Search keywords
    pub keywords: BTreeSet<String>,
    /// Screen the action operates on, e.g. `player`
    pub target_screen: Option<String>,
    /// Prior confidence in this mapping (0.0 - 1.0)
    pub confidence: f32,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AtomicAction {
    /// Create an atomic action with default classification
    pub fn new(
        id: impl Into<String>,
        action_name: impl Into<String>,
        method_name: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            action_name: action_name.into(),
            method_name: method_name.into(),
            class_name: class_name.into(),
            file_path: String::new(),
            relative_path: String::new(),
            platform: Platform::None,
            brand: Brand::None,
            return_type: "void".to_string(),
            parameters: Vec::new(),
            keywords: BTreeSet::new(),
            target_screen: None,
            confidence: DEFAULT_MINED_CONFIDENCE,
            usage_count: 0,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Set the keyword set
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set platform and brand
    pub fn with_classification(mut self, platform: Platform, brand: Brand) -> Self {
        self.platform = platform;
        self.brand = brand;
        self
    }

    /// Set the target screen
    pub fn with_target_screen(mut self, screen: impl Into<String>) -> Self {
        self.target_screen = Some(screen.into());
        self
    }

    /// Set the source location
    pub fn with_location(mut self, file_path: impl Into<String>, relative_path: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self.relative_path = relative_path.into();
        self
    }

    /// Set the method signature details
    pub fn with_signature(mut self, return_type: impl Into<String>, parameters: Vec<String>) -> Self {
        self.return_type = return_type.into();
        self.parameters = parameters;
        self
    }

    /// Set the confidence, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Merge additional keywords, returning how many were new
    pub fn merge_keywords<I, S>(&mut self, keywords: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.keywords.len();
        self.keywords.extend(
            keywords
                .into_iter()
                .map(|k| k.into().trim().to_lowercase())
                .filter(|k| !k.is_empty()),
        );
        self.keywords.len() - before
    }

    /// Human readable call reference, e.g. `PlayerScreen.clickPlayButton()`
    pub fn call_reference(&self) -> String {
        format!("{}.{}({})", self.class_name, self.method_name, self.parameters.join(", "))
    }
}

impl KnowledgeEntity for AtomicAction {
    const COLLECTION: &'static str = "atomic_actions";

    fn id(&self) -> &str {
        &self.id
    }

    fn document_text(&self) -> String {
        let mut parts = vec![
            self.action_name.replace('_', " "),
            self.method_name.clone(),
            self.class_name.clone(),
        ];
        parts.extend(self.keywords.iter().cloned());
        if let Some(screen) = &self.target_screen {
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

    fn match_phrases(&self) -> Vec<String> {
        let phrase = self.action_name.replace('_', " ");
        let mut qualified = vec![phrase.clone()];
        if self.platform.is_known() {
            qualified.push(self.platform.to_string());
        }
        if self.brand.is_known() {
            qualified.push(self.brand.to_string());
        }
        if let Some(screen) = &self.target_screen {
            qualified.push(screen.clone());
        }

        let qualified = qualified.join(" ");
        if qualified == phrase {
            vec![phrase]
        } else {
            vec![phrase, qualified]
        }
    }
}

impl UsageTracked for AtomicAction {
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

    fn play_button() -> AtomicAction {
        AtomicAction::new("a1", "click_play_button", "clickPlayButton", "PlayerScreen")
            .with_keywords(["click", "play", "button"])
    }

    #[test]
    fn test_document_text_contains_phrase_and_keywords() {
        let action = play_button()
            .with_target_screen("player")
            .with_classification(Platform::Ctv, Brand::Pplus);
        let text = action.document_text();

        assert!(text.starts_with("click play button"));
        assert!(text.contains("PlayerScreen"));
        assert!(text.contains("player"));
        assert!(text.contains("ctv"));
        assert!(text.contains("pplus"));
    }

    #[test]
    fn test_match_phrases_leave_out_keywords() {
        assert_eq!(play_button().match_phrases(), vec!["click play button"]);

        let action = play_button()
            .with_target_screen("player")
            .with_classification(Platform::Ctv, Brand::Pplus);
        assert_eq!(
            action.match_phrases(),
            vec!["click play button", "click play button ctv pplus player"]
        );
    }

    #[test]
    fn test_keywords_deduplicated() {
        let mut action = play_button();
        let added = action.merge_keywords(["Click", "tap", " "]);
        assert_eq!(added, 1);
        assert_eq!(action.keywords.len(), 4);
    }

    #[test]
    fn test_record_usage() {
        let mut action = play_button();
        let now = Utc::now();
        action.record_usage(now);
        let first = action.last_used_at.unwrap();
        action.record_usage(now);

        assert_eq!(action.usage_count, 2);
        assert!(action.last_used_at.unwrap() > first);
    }

    #[test]
    fn test_metadata_is_typed_json() {
        let value = serde_json::to_value(play_button()).unwrap();
        assert!(value["keywords"].is_array());
        assert!(value["parameters"].is_array());
        assert_eq!(value["platform"], "none");
    }

    #[test]
    fn test_call_reference() {
        let action = play_button().with_signature("void", vec!["int times".into()]);
        assert_eq!(action.call_reference(), "PlayerScreen.clickPlayButton(int times)");
    }
}
