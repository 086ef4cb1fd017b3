//! Shared capability of every knowledge base entity
//!
//! Each of the four collections stores exactly one entity type. The entity
//! knows its id, its collection, and how to render itself as searchable text.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An identifiable, queryable knowledge base entry
pub trait KnowledgeEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection holding this entity type
    const COLLECTION: &'static str;

    /// Unique id within the collection
    fn id(&self) -> &str;

    /// Text that is embedded and matched against queries
    fn document_text(&self) -> String;

    /// Short phrases naming this entity, scored for word overlap with a query
    ///
    /// Keyword bags and free-form notes stay out so that a query sharing one
    /// word with a long document does not count as an exact hit.
    fn match_phrases(&self) -> Vec<String>;
}

/// Entities that count how often they have been used
pub trait UsageTracked {
    /// Number of recorded uses
    fn usage_count(&self) -> u64;

    /// Timestamp of the latest recorded use
    fn last_used_at(&self) -> Option<DateTime<Utc>>;

    /// Record one use at `now`
    fn record_usage(&mut self, now: DateTime<Utc>);
}

/// Timestamp for a new use that is strictly later than `previous`
///
/// Wall clocks can repeat a value for back-to-back calls, so the result is
/// bumped by one microsecond past `previous` when needed.
pub fn next_use_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Lower-case, whitespace-collapsed form of a phrase
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append `value` unless an equal entry already exists
pub(crate) fn push_unique(items: &mut Vec<String>, value: impl Into<String>) {
    let value = value.into();
    if !value.is_empty() && !items.contains(&value) {
        items.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_next_use_timestamp_strictly_later() {
        let now = Utc::now();
        assert_eq!(next_use_timestamp(None, now), now);
        assert!(next_use_timestamp(Some(now), now) > now);

        let earlier = now - Duration::seconds(5);
        assert_eq!(next_use_timestamp(Some(earlier), now), now);
    }

    #[test]
    fn test_normalize_phrase() {
        assert_eq!(normalize_phrase("  Skip   the INTRO "), "skip the intro");
        assert_eq!(normalize_phrase(""), "");
    }

    #[test]
    fn test_push_unique() {
        let mut items = vec!["click".to_string()];
        push_unique(&mut items, "click");
        push_unique(&mut items, "tap");
        push_unique(&mut items, "");
        assert_eq!(items, vec!["click", "tap"]);
    }

    proptest! {
        #[test]
        fn usage_timestamps_always_advance(offset_us in -5_000_000i64..5_000_000) {
            let prev = Utc::now();
            let now = prev + Duration::microseconds(offset_us);
            prop_assert!(next_use_timestamp(Some(prev), now) > prev);
        }

        #[test]
        fn normalize_phrase_is_idempotent(phrase in "[ a-zA-Z]{0,24}") {
            let once = normalize_phrase(&phrase);
            prop_assert_eq!(normalize_phrase(&once), once.clone());
        }
    }
}
