//! Composite actions
//!
//! A composite action is a named chain of atomic-action phrases. Steps refer
//! to atomic actions by phrase, and the phrase is re-matched every time the
//! composite is expanded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{next_use_timestamp, KnowledgeEntity, UsageTracked};

/// Unresolved reference from a composite step to an atomic action
///
/// This is a search phrase, not a foreign key. It is resolved against the
/// atomic collection at expansion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionRef(String);

impl ActionRef {
    /// Create a reference from an action phrase
    pub fn new(phrase: impl Into<String>) -> Self {
        Self(phrase.into())
    }

    /// The phrase to search for
    pub fn phrase(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionRef {
    fn from(phrase: &str) -> Self {
        Self::new(phrase)
    }
}

impl From<String> for ActionRef {
    fn from(phrase: String) -> Self {
        Self(phrase)
    }
}

/// One step of a composite action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeStep {
    /// Phrase naming the atomic action to run
    pub atomic_action: ActionRef,
    /// Step-level arguments
    pub parameters: Vec<String>,
    /// Documentation ordinal; execution order is list order
    pub order: u32,
    /// Step only runs when its precondition holds
    pub conditional: bool,
    /// Screen to resolve this step on; `None` searches every screen
    #[serde(default)]
    pub target_screen: Option<String>,
}

impl CompositeStep {
    /// Create an unconditional step without parameters
    pub fn new(atomic_action: impl Into<ActionRef>, order: u32) -> Self {
        Self {
            atomic_action: atomic_action.into(),
            parameters: Vec::new(),
            order,
            conditional: false,
            target_screen: None,
        }
    }

    /// Set the step parameters
    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Mark the step conditional
    pub fn conditional(mut self) -> Self {
        self.conditional = true;
        self
    }

    /// Resolve this step on a specific screen
    pub fn on_screen(mut self, screen: impl Into<String>) -> Self {
        self.target_screen = Some(screen.into());
        self
    }
}

/// A named, ordered chain of atomic-action references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeAction {
    pub id: String,
    pub action_name: String,
    pub description: String,
    /// Steps in execution order
    pub steps: Vec<CompositeStep>,
    /// Action phrases that must hold before the first step
    pub prerequisites: Vec<String>,
    pub target_screen: Option<String>,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CompositeAction {
    /// Create an empty composite action
    pub fn new(
        id: impl Into<String>,
        action_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            action_name: action_name.into(),
            description: description.into(),
            steps: Vec::new(),
            prerequisites: Vec::new(),
            target_screen: None,
            usage_count: 0,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Append a step; its order is its position
    pub fn push_step(mut self, atomic_action: impl Into<ActionRef>) -> Self {
        let order = self.steps.len() as u32 + 1;
        self.steps.push(CompositeStep::new(atomic_action, order));
        self
    }

    /// Append a fully specified step
    pub fn with_step(mut self, step: CompositeStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the target screen
    pub fn with_target_screen(mut self, screen: impl Into<String>) -> Self {
        self.target_screen = Some(screen.into());
        self
    }

    /// Set the prerequisites
    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }
}

impl KnowledgeEntity for CompositeAction {
    const COLLECTION: &'static str = "composite_actions";

    fn id(&self) -> &str {
        &self.id
    }

    fn document_text(&self) -> String {
        let mut text = format!("{} {}", self.action_name.replace('_', " "), self.description);
        if let Some(screen) = &self.target_screen {
            text.push(' ');
            text.push_str(screen);
        }
        text
    }

    fn match_phrases(&self) -> Vec<String> {
        let mut phrases = vec![self.action_name.replace('_', " ")];
        if !self.description.trim().is_empty() {
            phrases.push(self.description.clone());
        }
        phrases
    }
}

impl UsageTracked for CompositeAction {
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
