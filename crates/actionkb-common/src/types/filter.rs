//! Metadata filters for store queries
//!
//! A filter is either an equality predicate on one metadata field or a
//! conjunction of filters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata predicate evaluated by a vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhereFilter {
    /// `metadata[field] == value`
    Eq { field: String, value: Value },
    /// All inner filters must hold
    And(Vec<WhereFilter>),
}

impl WhereFilter {
    /// Equality predicate on a single field
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Combine predicates; `None` when there is nothing to filter on
    pub fn all(mut filters: Vec<WhereFilter>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Self::And(filters)),
        }
    }

    /// Evaluate against an entity's metadata object
    pub fn matches(&self, metadata: &Value) -> bool {
        match self {
            Self::Eq { field, value } => metadata.get(field) == Some(value),
            Self::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }

    /// Number of equality predicates
    pub fn predicate_count(&self) -> usize {
        match self {
            Self::Eq { .. } => 1,
            Self::And(filters) => filters.iter().map(Self::predicate_count).sum(),
        }
    }
}
