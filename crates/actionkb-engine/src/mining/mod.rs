//! Repository mining
//!
//! Bootstraps the atomic-action collection from a tree of page-object sources.

pub mod extractor;
pub mod path_rules;
pub mod pipeline;
pub mod scanner;

pub use pipeline::{MiningError, MiningStats, RepositoryMiner};
