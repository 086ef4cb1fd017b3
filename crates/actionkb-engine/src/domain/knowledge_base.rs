//! Knowledge Base
//!
//! The explicit context object holding the four collections. It is built once
//! and shared by `Arc` with the matching engine, the composite resolver and
//! the repository miner.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use actionkb_common::{
    normalize_phrase, AtomicAction, Brand, CompositeAction, KbError, KnowledgeEntity,
    LearnedPattern, PatternSource, Platform, Result, UsageTracked, UserTerm,
};

use super::collection::{KnowledgeCollection, Upserted};
use super::synonyms::SynonymTable;
use crate::config::KbConfig;
use crate::infra::embedding::EmbeddingProvider;
use crate::infra::vector_store::{InMemoryVectorStore, VectorStore};

/// Stable id derived from a natural key
pub(crate) fn stable_id(prefix: &str, key: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
}

/// One step of an AI-produced decomposition of a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposedStep {
    /// Verb, e.g. `tap`
    pub action: String,
    /// Object, e.g. `play button`
    pub target: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub screen: Option<String>,
}

impl DecomposedStep {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            details: None,
            screen: None,
        }
    }

    pub fn on_screen(mut self, screen: impl Into<String>) -> Self {
        self.screen = Some(screen.into());
        self
    }
}

/// Outcome of a batch of pattern learning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningReport {
    /// Ids of newly created patterns
    pub created: Vec<String>,
    /// Ids of existing patterns that absorbed new phrases
    pub updated: Vec<String>,
    /// Step index and error message for every failed step
    pub errors: Vec<(usize, String)>,
}

/// Entity counts per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KbStats {
    pub atomic_actions: usize,
    pub composite_actions: usize,
    pub user_terms: usize,
    pub learned_patterns: usize,
}

/// The four-layer action knowledge base
pub struct KnowledgeBase {
    atomic: KnowledgeCollection<AtomicAction>,
    composite: KnowledgeCollection<CompositeAction>,
    terminology: KnowledgeCollection<UserTerm>,
    patterns: KnowledgeCollection<LearnedPattern>,
    synonyms: Arc<SynonymTable>,
}

impl KnowledgeBase {
    /// Open the four collections on `store`
    pub async fn open(store: Arc<dyn VectorStore>, synonyms: SynonymTable) -> Result<Self> {
        let synonyms = Arc::new(synonyms);
        Ok(Self {
            atomic: KnowledgeCollection::open(Arc::clone(&store), Arc::clone(&synonyms)).await?,
            composite: KnowledgeCollection::open(Arc::clone(&store), Arc::clone(&synonyms)).await?,
            terminology: KnowledgeCollection::open(Arc::clone(&store), Arc::clone(&synonyms)).await?,
            patterns: KnowledgeCollection::open(store, Arc::clone(&synonyms)).await?,
            synonyms,
        })
    }

    /// Knowledge base on an in-process store with the configured embedder
    pub async fn in_memory(config: &KbConfig) -> Result<Self> {
        let embedder = Arc::new(EmbeddingProvider::from_settings(&config.embedding));
        info!(
            primary = embedder.has_primary(),
            dimension = embedder.dimension(),
            "Opening in-memory knowledge base"
        );
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(embedder));
        Self::open(store, SynonymTable::default()).await
    }

    pub fn atomic_actions(&self) -> &KnowledgeCollection<AtomicAction> {
        &self.atomic
    }

    pub fn composite_actions(&self) -> &KnowledgeCollection<CompositeAction> {
        &self.composite
    }

    pub fn user_terms(&self) -> &KnowledgeCollection<UserTerm> {
        &self.terminology
    }

    pub fn learned_patterns(&self) -> &KnowledgeCollection<LearnedPattern> {
        &self.patterns
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Add or replace an atomic action
    #[instrument(skip(self, action), fields(id = %action.id))]
    pub async fn add_atomic_action(&self, action: &AtomicAction) -> Result<Upserted> {
        let outcome = self.atomic.add(action).await?;
        debug!(?outcome, "atomic action stored");
        Ok(outcome)
    }

    /// Add a composite action; re-adding an existing id is a no-op
    ///
    /// Returns `Upserted::Updated` when the id already existed and nothing
    /// was written.
    #[instrument(skip(self, composite), fields(id = %composite.id))]
    pub async fn add_composite_action(&self, composite: &CompositeAction) -> Result<Upserted> {
        let outcome = self.composite.insert_new(composite).await?;
        if outcome == Upserted::Updated {
            debug!("composite action already exists, left unchanged");
        }
        Ok(outcome)
    }

    /// Merge keywords into an existing atomic action
    pub async fn enrich_keywords<I, S>(&self, id: &str, keywords: I) -> Result<AtomicAction>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut action = self.atomic.get_one(id).await?;
        let added = action.merge_keywords(keywords);
        if added > 0 {
            self.atomic.update(&action).await?;
        }
        debug!(id, added, "keywords enriched");
        Ok(action)
    }

    /// Teach a term that stands for one or more actions
    ///
    /// Teaching the same term again merges actions and synonyms into the
    /// existing entry.
    #[instrument(skip(self, expands_to, synonyms, context))]
    pub async fn learn_from_user(
        &self,
        term: &str,
        expands_to: Vec<String>,
        synonyms: Vec<String>,
        context: &str,
    ) -> Result<UserTerm> {
        let normalized = normalize_phrase(term);
        if normalized.is_empty() {
            return Err(KbError::InvalidId(term.to_string()));
        }

        let id = stable_id("term", &normalized);
        let taught = UserTerm::new(id, &normalized, expands_to, synonyms).with_context(context);

        match self.terminology.insert_new(&taught).await? {
            Upserted::Created => {
                info!(term = %taught.user_term, "learned new term");
                Ok(taught)
            }
            Upserted::Updated => {
                let mut existing = self.terminology.get_one(&taught.id).await?;
                existing.absorb(taught);
                self.terminology.update(&existing).await?;
                info!(term = %existing.user_term, "extended existing term");
                Ok(existing)
            }
        }
    }

    /// Store one learned pattern, merging phrases into an existing one
    pub async fn learn_pattern(&self, pattern: LearnedPattern) -> Result<(Upserted, LearnedPattern)> {
        match self.patterns.insert_new(&pattern).await? {
            Upserted::Created => Ok((Upserted::Created, pattern)),
            Upserted::Updated => {
                let mut existing = self.patterns.get_one(&pattern.id).await?;
                existing.phrases.extend(pattern.phrases);
                if existing.details.is_none() {
                    existing.details = pattern.details;
                }
                self.patterns.update(&existing).await?;
                Ok((Upserted::Updated, existing))
            }
        }
    }

    /// Turn an AI step decomposition into learned patterns
    ///
    /// Each step becomes a pattern with generated phrase variants. A failing
    /// step is recorded in the report and the rest of the batch continues.
    #[instrument(skip(self, steps), fields(steps = steps.len()))]
    pub async fn learn_from_decomposition(
        &self,
        steps: &[DecomposedStep],
        platform: Platform,
        brand: Brand,
        source: PatternSource,
    ) -> LearningReport {
        let mut report = LearningReport::default();

        for (index, step) in steps.iter().enumerate() {
            match self.pattern_from_step(step, platform, brand, source) {
                Ok(pattern) => match self.learn_pattern(pattern).await {
                    Ok((Upserted::Created, p)) => report.created.push(p.id),
                    Ok((Upserted::Updated, p)) => report.updated.push(p.id),
                    Err(e) => {
                        warn!(index, "failed to store learned pattern: {}", e);
                        report.errors.push((index, e.to_string()));
                    }
                },
                Err(e) => report.errors.push((index, e.to_string())),
            }
        }

        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            errors = report.errors.len(),
            "decomposition learned"
        );
        report
    }

    fn pattern_from_step(
        &self,
        step: &DecomposedStep,
        platform: Platform,
        brand: Brand,
        source: PatternSource,
    ) -> Result<LearnedPattern> {
        let verb = normalize_phrase(&step.action);
        let target = normalize_phrase(&step.target);
        if verb.is_empty() {
            return Err(KbError::Internal("decomposed step has no action".into()));
        }

        let canonical_verb = self
            .synonyms
            .canonical_of(&verb)
            .map(str::to_string)
            .unwrap_or_else(|| verb.clone());
        let screen = step.screen.as_deref().map(normalize_phrase);

        let key = format!(
            "{}|{}|{}|{}|{}",
            canonical_verb,
            target,
            screen.as_deref().unwrap_or(""),
            platform,
            brand
        );

        let mut pattern = LearnedPattern::new(stable_id("pattern", &key), canonical_verb, target.clone());
        pattern.details = step.details.clone();
        pattern.screen = screen;
        pattern.platform = platform;
        pattern.brand = brand;
        pattern.source = source;
        pattern.phrases = self.synonyms.phrase_variants(&verb, &target);
        Ok(pattern)
    }

    /// Record one use of an atomic action
    pub async fn record_atomic_usage(&self, id: &str) -> Result<AtomicAction> {
        record_usage(&self.atomic, id).await
    }

    /// Record one use of a composite action
    pub async fn record_composite_usage(&self, id: &str) -> Result<CompositeAction> {
        record_usage(&self.composite, id).await
    }

    /// Record one use of a taught term
    pub async fn record_term_usage(&self, id: &str) -> Result<UserTerm> {
        record_usage(&self.terminology, id).await
    }

    /// Record one use of a learned pattern
    pub async fn record_pattern_usage(&self, id: &str) -> Result<LearnedPattern> {
        record_usage(&self.patterns, id).await
    }

    /// Entity counts per collection
    pub async fn stats(&self) -> Result<KbStats> {
        Ok(KbStats {
            atomic_actions: self.atomic.count().await?,
            composite_actions: self.composite.count().await?,
            user_terms: self.terminology.count().await?,
            learned_patterns: self.patterns.count().await?,
        })
    }

    /// Drop every entity in every collection
    pub async fn clear_all(&self) -> Result<()> {
        self.atomic.clear().await?;
        self.composite.clear().await?;
        self.terminology.clear().await?;
        self.patterns.clear().await?;
        warn!("knowledge base cleared");
        Ok(())
    }
}

/// Bump usage on a stored entity and write it back
async fn record_usage<T>(collection: &KnowledgeCollection<T>, id: &str) -> Result<T>
where
    T: KnowledgeEntity + UsageTracked,
{
    let mut entity = collection.get_one(id).await?;
    entity.record_usage(Utc::now());
    collection.update(&entity).await?;
    Ok(entity)
}
