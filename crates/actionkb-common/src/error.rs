//! Error types for the action knowledge base
//!
//! Provides a unified error type shared by the store, matching and mining layers.

use thiserror::Error;

/// Result type alias using KbError
pub type Result<T> = std::result::Result<T, KbError>;

/// Unified error type for knowledge base operations
#[derive(Debug, Error)]
pub enum KbError {
    /// Referenced id does not exist in the collection
    #[error("{collection} entry not found: {id}")]
    NotFound { collection: String, id: String },

    /// Raw store rejected an add because the id already exists
    #[error("Duplicate id in {collection}: {id}")]
    DuplicateId { collection: String, id: String },

    /// Ids must be non-empty and free of control characters
    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    // Embedding errors never leave the embedding provider; kept for the service layer
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    // Backend connectivity errors
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Filesystem errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KbError {
    /// Create a not-found error for a collection
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Check whether this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check whether this error is a duplicate-id rejection
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateId { .. })
    }
}

/// Validate an entity id before it reaches a store
pub fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() || id.chars().any(char::is_control) {
        return Err(KbError::InvalidId(id.to_string()));
    }
    Ok(())
}

// Implement From for common external error types
impl From<serde_json::Error> for KbError {
    fn from(err: serde_json::Error) -> Self {
        KbError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for KbError {
    fn from(err: std::io::Error) -> Self {
        KbError::Io(err.to_string())
    }
}

impl From<anyhow::Error> for KbError {
    fn from(err: anyhow::Error) -> Self {
        KbError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KbError::not_found("atomic_actions", "a1");
        assert!(err.to_string().contains("a1"));
        assert!(err.to_string().contains("atomic_actions"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("a1").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("   ").is_err());
        assert!(validate_id("bad\nid").is_err());
    }

    #[test]
    fn test_serde_conversion() {
        let err: KbError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, KbError::Serialization(_)));
    }
}
