//! # ActionKB Engine
//!
//! Semantic action knowledge base: maps free-text test steps ("tap play",
//! "skip the intro") onto page-object methods, and keeps improving the mapping
//! from usage, user teaching and AI step decompositions.
//!
//! ## Key Concepts
//!
//! - **Atomic action**: one page-object method, e.g. `PlayerScreen.clickPlayButton()`
//! - **Composite action**: an ordered chain of atomic-action phrases, resolved late
//! - **User term**: a taught synonym that expands to one or more actions
//! - **Learned pattern**: a verb/target pattern with generated phrase variants
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  RepositoryMiner        MatchingEngine    CompositeResolver
//! │  (walk, extract,        (synonyms,        (late-bound step
//! │   classify, upsert)      thresholds)       resolution)  │
//! │         │                     │                 │       │
//! │  ┌──────┴─────────────────────┴─────────────────┴──┐    │
//! │  │                 KnowledgeBase                    │    │
//! │  │  atomic | composite | terminology | patterns     │    │
//! │  └──────────────────────┬──────────────────────────┘    │
//! │                         │                               │
//! │  ┌──────────────────────┴──────────────────────────┐    │
//! │  │   VectorStore  ←  EmbeddingProvider (fallback)   │    │
//! │  └─────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod domain;
pub mod infra;
pub mod mining;

// Re-export core types
pub use config::{EmbeddingSettings, KbConfig, MatchingConfig, MiningSettings};
pub use domain::collection::{confidence_from_distance, KnowledgeCollection, ScoredEntity, Upserted};
pub use domain::composite::{CompositeResolver, ExpandedComposite, ExpandedStep};
pub use domain::knowledge_base::{DecomposedStep, KbStats, KnowledgeBase, LearningReport};
pub use domain::matching::{
    ActionFilters, MatchResult, MatchingEngine, Translation, TranslationSource,
};
pub use domain::synonyms::SynonymTable;

// Re-export infrastructure
pub use infra::embedding::{EmbeddingProvider, EmbeddingService, HashEmbedding};
pub use infra::vector_store::{InMemoryVectorStore, QueryResult, StoreError, StoreRecord, VectorStore};

pub use mining::{MiningError, MiningStats, RepositoryMiner};

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
