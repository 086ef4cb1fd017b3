//! Composite Resolver
//!
//! Expands a composite action into atomic actions by re-matching every step
//! phrase against the atomic collection. A step that does not resolve becomes
//! an unmapped placeholder and never blocks the steps after it.

use serde::Serialize;
use tracing::{info, instrument, warn};

use actionkb_common::{AtomicAction, Result};

use super::matching::{ActionFilters, MatchingEngine};

/// One expanded step, in composite list order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpandedStep {
    Resolved {
        /// Step phrase as written in the composite
        phrase: String,
        action: AtomicAction,
        /// Step parameters, which take precedence over the action's own
        parameters: Vec<String>,
        order: u32,
        conditional: bool,
        confidence: f32,
    },
    Unmapped {
        phrase: String,
        order: u32,
        parameters: Vec<String>,
    },
}

impl ExpandedStep {
    pub fn is_unmapped(&self) -> bool {
        matches!(self, Self::Unmapped { .. })
    }

    pub fn phrase(&self) -> &str {
        match self {
            Self::Resolved { phrase, .. } | Self::Unmapped { phrase, .. } => phrase,
        }
    }

    pub fn order(&self) -> u32 {
        match self {
            Self::Resolved { order, .. } | Self::Unmapped { order, .. } => *order,
        }
    }
}

/// A composite with every step resolved or flagged
#[derive(Debug, Clone, Serialize)]
pub struct ExpandedComposite {
    pub composite_id: String,
    pub action_name: String,
    pub prerequisites: Vec<String>,
    pub steps: Vec<ExpandedStep>,
    /// True iff at least one step is unmapped
    pub has_unmapped_steps: bool,
}

impl ExpandedComposite {
    /// Steps that need a human or a new atomic action
    pub fn unmapped(&self) -> impl Iterator<Item = &ExpandedStep> {
        self.steps.iter().filter(|s| s.is_unmapped())
    }
}

/// Resolves composite actions through the matching engine
#[derive(Clone)]
pub struct CompositeResolver {
    matcher: MatchingEngine,
}

impl CompositeResolver {
    pub fn new(matcher: MatchingEngine) -> Self {
        Self { matcher }
    }

    /// Expand the composite `composite_id` into its atomic steps
    ///
    /// Fails with `NotFound` when the composite does not exist. A step with a
    /// screen is matched on that screen only; a step without one is matched
    /// across all screens.
    #[instrument(skip(self))]
    pub async fn expand_composite_action(&self, composite_id: &str) -> Result<ExpandedComposite> {
        let kb = self.matcher.knowledge_base();
        let composite = kb.composite_actions().get_one(composite_id).await?;

        let mut steps = Vec::with_capacity(composite.steps.len());
        for step in &composite.steps {
            let filters = ActionFilters {
                target_screen: step.target_screen.clone(),
                ..ActionFilters::none()
            };

            let phrase = step.atomic_action.phrase();
            let result = self.matcher.find_atomic_action(phrase, &filters, Some(1)).await?;

            let expanded = match result.into_match() {
                Some(hit) => {
                    let mut action = hit.entity;
                    if !step.parameters.is_empty() {
                        action.parameters = step.parameters.clone();
                    }
                    ExpandedStep::Resolved {
                        phrase: phrase.to_string(),
                        parameters: action.parameters.clone(),
                        action,
                        order: step.order,
                        conditional: step.conditional,
                        confidence: hit.confidence,
                    }
                }
                None => {
                    warn!(composite = composite_id, step = phrase, "step did not resolve");
                    ExpandedStep::Unmapped {
                        phrase: phrase.to_string(),
                        order: step.order,
                        parameters: step.parameters.clone(),
                    }
                }
            };
            steps.push(expanded);
        }

        kb.record_composite_usage(composite_id).await?;

        let has_unmapped_steps = steps.iter().any(ExpandedStep::is_unmapped);
        info!(
            composite = composite_id,
            steps = steps.len(),
            has_unmapped_steps,
            "composite expanded"
        );

        Ok(ExpandedComposite {
            composite_id: composite.id,
            action_name: composite.action_name,
            prerequisites: composite.prerequisites,
            steps,
            has_unmapped_steps,
        })
    }
}
