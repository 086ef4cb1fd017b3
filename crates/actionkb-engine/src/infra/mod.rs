//! Infrastructure adapters
//!
//! The embedding service and vector store boundaries, with their in-process
//! implementations.

pub mod embedding;
pub mod vector_store;
