//! # ActionKB Common
//!
//! Shared entity types and errors for the action knowledge base.
//!
//! ## Core Types
//!
//! - [`AtomicAction`]: one resolvable page-object method call
//! - [`CompositeAction`]: an ordered chain of [`ActionRef`] phrases
//! - [`UserTerm`]: a human-taught synonym for one or more actions
//! - [`LearnedPattern`]: a phrase-to-action pattern from AI or historical decompositions
//! - [`WhereFilter`]: equality / conjunction metadata filter for store queries
//!
//! All four entity types implement [`KnowledgeEntity`], which is all a
//! collection needs to store, embed and filter them.

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{validate_id, KbError, Result};
pub use types::{
    atomic::{AtomicAction, DEFAULT_MINED_CONFIDENCE},
    composite::{ActionRef, CompositeAction, CompositeStep},
    entity::{next_use_timestamp, normalize_phrase, KnowledgeEntity, UsageTracked},
    filter::WhereFilter,
    pattern::{LearnedPattern, PatternSource},
    platform::{Brand, Platform},
    terminology::UserTerm,
};

/// ActionKB version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dimension of every embedding vector
pub const EMBEDDING_DIMENSION: usize = 384;

/// Minimum confidence to accept an atomic-action match
pub const DEFAULT_ATOMIC_THRESHOLD: f32 = 0.4;

/// Minimum confidence to accept a learned-pattern match
pub const DEFAULT_PATTERN_THRESHOLD: f32 = 0.4;

/// Maximum distance to accept a composite-action match
pub const DEFAULT_COMPOSITE_MAX_DISTANCE: f32 = 0.3;

/// Maximum distance to accept a terminology match
pub const DEFAULT_TERMINOLOGY_MAX_DISTANCE: f32 = 0.2;

/// Default number of candidates returned by a query
pub const DEFAULT_TOP_K: usize = 5;
