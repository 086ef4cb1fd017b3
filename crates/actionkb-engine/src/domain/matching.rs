//! Matching & Ranking Engine
//!
//! Turns a free-text query plus optional platform/brand/screen filters into a
//! confidence-ordered candidate list. Each lookup keeps two signals apart:
//! the raw best candidate, and whether that candidate clears the acceptance
//! threshold for its collection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use actionkb_common::{
    AtomicAction, Brand, CompositeAction, LearnedPattern, Platform, Result, WhereFilter,
};

use super::collection::ScoredEntity;
use super::knowledge_base::KnowledgeBase;
use crate::config::MatchingConfig;

/// Metadata field holding the screen on atomic actions
pub const ATOMIC_SCREEN_FIELD: &str = "target_screen";
/// Metadata field holding the screen on learned patterns
pub const PATTERN_SCREEN_FIELD: &str = "screen";

/// Optional structured constraints on a lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFilters {
    pub platform: Option<Platform>,
    pub brand: Option<Brand>,
    pub target_screen: Option<String>,
}

impl ActionFilters {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn brand(mut self, brand: Brand) -> Self {
        self.brand = Some(brand);
        self
    }

    pub fn screen(mut self, screen: impl Into<String>) -> Self {
        self.target_screen = Some(screen.into());
        self
    }

    fn screen_value(&self) -> Option<String> {
        self.target_screen
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }

    /// AND of equality predicates over the supplied fields
    pub fn to_where(&self, screen_field: &str) -> Option<WhereFilter> {
        let mut predicates = Vec::new();
        if let Some(platform) = self.platform {
            predicates.push(WhereFilter::eq("platform", platform.as_str()));
        }
        if let Some(brand) = self.brand {
            predicates.push(WhereFilter::eq("brand", brand.as_str()));
        }
        if let Some(screen) = self.screen_value() {
            predicates.push(WhereFilter::eq(screen_field, screen));
        }
        WhereFilter::all(predicates)
    }

    /// `query` followed by whichever filter values are present
    pub fn decorate(&self, query: &str) -> String {
        let mut parts = vec![query.trim().to_string()];
        if let Some(platform) = self.platform {
            parts.push(platform.to_string());
        }
        if let Some(brand) = self.brand {
            parts.push(brand.to_string());
        }
        if let Some(screen) = self.screen_value() {
            parts.push(screen);
        }
        parts.retain(|p| !p.is_empty());
        parts.join(" ")
    }
}

/// Ranked lookup result
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult<T> {
    pub query: String,
    /// Best candidate cleared the acceptance threshold
    pub found: bool,
    /// Candidates, best first
    pub candidates: Vec<ScoredEntity<T>>,
}

impl<T> MatchResult<T> {
    fn new(query: &str, candidates: Vec<ScoredEntity<T>>, accept: impl Fn(&ScoredEntity<T>) -> bool) -> Self {
        let found = candidates.first().is_some_and(accept);
        Self {
            query: query.to_string(),
            found,
            candidates,
        }
    }

    /// Closest candidate regardless of threshold
    pub fn best_candidate(&self) -> Option<&ScoredEntity<T>> {
        self.candidates.first()
    }

    /// Closest candidate when it was accepted
    pub fn best_match(&self) -> Option<&ScoredEntity<T>> {
        self.candidates.first().filter(|_| self.found)
    }

    /// Accepted entity, consuming the result
    pub fn into_match(self) -> Option<ScoredEntity<T>> {
        if self.found {
            self.candidates.into_iter().next()
        } else {
            None
        }
    }
}

/// Where a translation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationSource {
    LearnedTerminology,
    AtomicActionMatch,
}

impl TranslationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LearnedTerminology => "learned_terminology",
            Self::AtomicActionMatch => "atomic_action_match",
        }
    }
}

/// Result of translating user wording into action phrases
#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub input: String,
    pub found: bool,
    /// Action phrases the input stands for, in order
    pub expands_to: Vec<String>,
    pub source: Option<TranslationSource>,
    pub confidence: f32,
    /// Id of the term or atomic action that produced the translation
    pub matched_id: Option<String>,
    /// Hint for the caller when nothing matched
    pub suggestion: Option<String>,
}

impl Translation {
    fn not_found(input: &str, confidence: f32) -> Self {
        Self {
            input: input.to_string(),
            found: false,
            expands_to: Vec::new(),
            source: None,
            confidence,
            matched_id: None,
            suggestion: Some(format!(
                "'{}' is not known yet; teach it with the action phrases it stands for",
                input.trim()
            )),
        }
    }
}

/// Query-side engine over a shared knowledge base
#[derive(Clone)]
pub struct MatchingEngine {
    kb: Arc<KnowledgeBase>,
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(kb: Arc<KnowledgeBase>, config: MatchingConfig) -> Self {
        Self { kb, config }
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    fn top_k(&self, requested: Option<usize>) -> usize {
        requested.filter(|k| *k > 0).unwrap_or(self.config.default_top_k)
    }

    /// Find the atomic action a phrase refers to
    ///
    /// Accepted when the best confidence exceeds `atomic_threshold`.
    #[instrument(skip(self, filters))]
    pub async fn find_atomic_action(
        &self,
        query: &str,
        filters: &ActionFilters,
        top_k: Option<usize>,
    ) -> Result<MatchResult<AtomicAction>> {
        let text = filters.decorate(query);
        let filter = filters.to_where(ATOMIC_SCREEN_FIELD);

        let candidates = self
            .kb
            .atomic_actions()
            .query(&text, self.top_k(top_k), filter.as_ref())
            .await?;

        let threshold = self.config.atomic_threshold;
        let result = MatchResult::new(query, candidates, |c| c.confidence > threshold);
        debug!(
            found = result.found,
            best = result.best_candidate().map(|c| c.entity.id.as_str()),
            confidence = result.best_candidate().map(|c| c.confidence),
            "atomic lookup"
        );
        Ok(result)
    }

    /// Find a composite action by description
    ///
    /// Accepted only when the best distance is below `composite_max_distance`;
    /// the closest candidate is still returned when rejected.
    #[instrument(skip(self))]
    pub async fn find_composite_action(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<MatchResult<CompositeAction>> {
        let candidates = self
            .kb
            .composite_actions()
            .query(query, self.top_k(top_k), None)
            .await?;

        let max_distance = self.config.composite_max_distance;
        let result = MatchResult::new(query, candidates, |c| c.distance < max_distance);
        debug!(
            found = result.found,
            distance = result.best_candidate().map(|c| c.distance),
            "composite lookup"
        );
        Ok(result)
    }

    /// Translate user wording into action phrases
    ///
    /// 1. Taught terminology, accepted below `terminology_max_distance`
    /// 2. Atomic action lookup
    /// 3. Not found, with a suggestion to teach the term
    #[instrument(skip(self))]
    pub async fn translate_user_term(&self, input: &str) -> Result<Translation> {
        let terms = self.kb.user_terms().query(input, 1, None).await?;

        if let Some(best) = terms.into_iter().next() {
            if best.distance < self.config.terminology_max_distance {
                let term = self.kb.record_term_usage(&best.entity.id).await?;
                info!(term = %term.user_term, "translated via taught terminology");
                return Ok(Translation {
                    input: input.to_string(),
                    found: true,
                    expands_to: term.expands_to,
                    source: Some(TranslationSource::LearnedTerminology),
                    confidence: best.confidence,
                    matched_id: Some(term.id),
                    suggestion: None,
                });
            }
            debug!(distance = best.distance, "closest term rejected");
        }

        let atomic = self.find_atomic_action(input, &ActionFilters::none(), Some(1)).await?;
        let confidence = atomic.best_candidate().map_or(0.0, |c| c.confidence);
        match atomic.into_match() {
            Some(hit) => Ok(Translation {
                input: input.to_string(),
                found: true,
                expands_to: vec![hit.entity.action_name],
                source: Some(TranslationSource::AtomicActionMatch),
                confidence: hit.confidence,
                matched_id: Some(hit.entity.id),
                suggestion: None,
            }),
            None => Ok(Translation::not_found(input, confidence)),
        }
    }

    /// Find a learned pattern for an AI-style phrase
    ///
    /// Accepted when the best confidence exceeds `pattern_threshold`; the
    /// accepted pattern has its usage recorded.
    #[instrument(skip(self, filters))]
    pub async fn find_learned_pattern(
        &self,
        phrase: &str,
        filters: &ActionFilters,
        top_k: Option<usize>,
    ) -> Result<MatchResult<LearnedPattern>> {
        let text = filters.decorate(phrase);
        let filter = filters.to_where(PATTERN_SCREEN_FIELD);

        let candidates = self
            .kb
            .learned_patterns()
            .query(&text, self.top_k(top_k), filter.as_ref())
            .await?;

        let threshold = self.config.pattern_threshold;
        let mut result = MatchResult::new(phrase, candidates, |c| c.confidence > threshold);

        if result.found {
            if let Some(best) = result.candidates.first_mut() {
                best.entity = self.kb.record_pattern_usage(&best.entity.id).await?;
            }
        }
        debug!(found = result.found, "learned pattern lookup");
        Ok(result)
    }
}
