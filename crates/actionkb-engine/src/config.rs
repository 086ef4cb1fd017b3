//! ActionKB configuration
//!
//! Layered as: built-in defaults, then an optional `actionkb.toml` (or the file
//! named by `ACTIONKB_CONFIG`), then `ACTIONKB__SECTION__KEY` environment
//! variables, e.g. `ACTIONKB__MATCHING__ATOMIC_THRESHOLD=0.5`.

use actionkb_common::{KbError, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// Acceptance thresholds for the matching engine
    pub matching: MatchingConfig,
    /// Embedding configuration
    pub embedding: EmbeddingSettings,
    /// Repository mining configuration
    pub mining: MiningSettings,
}

impl KbConfig {
    /// Load configuration from `.env`, an optional file, and the environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let file = std::env::var("ACTIONKB_CONFIG").unwrap_or_else(|_| "actionkb".to_string());

        let cfg: KbConfig = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("ACTIONKB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| KbError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that every threshold is in range
    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        if self.embedding.dimension == 0 {
            return Err(KbError::Config("embedding.dimension must be positive".into()));
        }
        Ok(())
    }
}

/// Acceptance thresholds for the matching engine
///
/// The defaults are empirical. Confidence thresholds are exclusive lower
/// bounds; distance thresholds are exclusive upper bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Accept an atomic action when confidence > this
    pub atomic_threshold: f32,
    /// Accept a learned pattern when confidence > this
    pub pattern_threshold: f32,
    /// Accept a composite action when distance < this
    pub composite_max_distance: f32,
    /// Accept a terminology entry when distance < this
    pub terminology_max_distance: f32,
    /// Candidates returned when the caller does not ask for a count
    pub default_top_k: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            atomic_threshold: actionkb_common::DEFAULT_ATOMIC_THRESHOLD,
            pattern_threshold: actionkb_common::DEFAULT_PATTERN_THRESHOLD,
            composite_max_distance: actionkb_common::DEFAULT_COMPOSITE_MAX_DISTANCE,
            terminology_max_distance: actionkb_common::DEFAULT_TERMINOLOGY_MAX_DISTANCE,
            default_top_k: actionkb_common::DEFAULT_TOP_K,
        }
    }
}

impl MatchingConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("atomic_threshold", self.atomic_threshold),
            ("pattern_threshold", self.pattern_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(KbError::Config(format!("matching.{} must be in [0, 1], got {}", name, value)));
            }
        }
        for (name, value) in [
            ("composite_max_distance", self.composite_max_distance),
            ("terminology_max_distance", self.terminology_max_distance),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(KbError::Config(format!("matching.{} must be in [0, 2], got {}", name, value)));
            }
        }
        if self.default_top_k == 0 {
            return Err(KbError::Config("matching.default_top_k must be positive".into()));
        }
        Ok(())
    }
}

/// Embedding service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// OpenAI-compatible embeddings endpoint; fallback-only when unset
    pub endpoint: Option<String>,
    /// Bearer credential for the endpoint
    pub api_key: Option<String>,
    /// Model name sent with each request
    pub model: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Whether to cache embeddings
    pub enable_cache: bool,
    /// Maximum cached texts
    pub cache_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: actionkb_common::EMBEDDING_DIMENSION,
            timeout_secs: 10,
            enable_cache: true,
            cache_size: 10_000,
        }
    }
}

/// Repository mining settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    /// Directory names never descended into
    pub excluded_dirs: Vec<String>,
    /// Source file extensions considered for mining
    pub extensions: Vec<String>,
    /// Confidence assigned to mined actions
    pub default_confidence: f32,
    /// Files larger than this are skipped
    pub max_file_bytes: u64,
}

impl Default for MiningSettings {
    fn default() -> Self {
        Self {
            excluded_dirs: [
                ".git", ".svn", ".gradle", ".idea", "target", "build", "out", "bin", "dist",
                "node_modules",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            extensions: vec!["java".to_string(), "kt".to_string()],
            default_confidence: actionkb_common::DEFAULT_MINED_CONFIDENCE,
            max_file_bytes: 2 * 1024 * 1024,
        }
    }
}
