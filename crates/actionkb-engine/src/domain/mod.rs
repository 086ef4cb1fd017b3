//! Knowledge base domain logic
//!
//! Typed collections, the synonym table, matching, and composite expansion.

pub mod collection;
pub mod composite;
pub mod knowledge_base;
pub mod matching;
pub mod synonyms;
pub mod text;
