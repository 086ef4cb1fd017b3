//! Embedding Service
//!
//! Turn action phrases and queries into fixed-length vectors.
//!
//! The remote service is treated as unreliable. [`EmbeddingProvider`] wraps
//! it and degrades to the deterministic [`HashEmbedding`] on any failure, so
//! callers always get a vector back.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EmbeddingSettings;

/// Trait for embedding services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate embedding for text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

/// Errors from embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Missing API credential")]
    MissingCredential,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Service unavailable")]
    Unavailable,
}

impl From<EmbeddingError> for actionkb_common::KbError {
    fn from(err: EmbeddingError) -> Self {
        actionkb_common::KbError::EmbeddingUnavailable(err.to_string())
    }
}

/// Deterministic character-position embedding
///
/// Each character at position `i` with code point `c` adds `c / 255` to
/// bucket `(i * 31 + c) mod dimension`; the result is L2-normalized. The same
/// text always yields a bit-identical vector.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    /// Create a hash embedding of the given dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed a single text
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0.0f64; self.dimension];

        for (i, ch) in text.to_lowercase().chars().enumerate() {
            let c = ch as usize;
            let idx = (i.wrapping_mul(31).wrapping_add(c)) % self.dimension;
            buckets[idx] += c as f64 / 255.0;
        }

        let norm = buckets.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm = if norm > 0.0 { norm } else { 1.0 };

        buckets.into_iter().map(|x| (x / norm) as f32).collect()
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(actionkb_common::EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// OpenAI-compatible `/embeddings` HTTP client
pub struct HttpEmbedding {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

impl HttpEmbedding {
    /// Create a client for `endpoint`
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbedding {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch.pop().ok_or(EmbeddingError::Unavailable)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let api_key = self.api_key.as_deref().ok_or(EmbeddingError::MissingCredential)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(EmbeddingError::ApiError(format!("status {}", response.status())));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        body.data.sort_by_key(|d| d.index);

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Bounded cache in front of a remote embedding service
///
/// Keyed by exact text. When `capacity` texts are cached the oldest one is
/// evicted. Vectors of the wrong dimension are returned but never cached, so
/// the provider's fallback check sees them again on the next call.
pub struct CachedEmbedding<E: EmbeddingService> {
    inner: E,
    cache: RwLock<EmbeddingCache>,
}

struct EmbeddingCache {
    vectors: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl EmbeddingCache {
    fn insert(&mut self, text: String, vector: Vec<f32>) {
        if self.capacity == 0 || self.vectors.contains_key(&text) {
            return;
        }
        while self.vectors.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.vectors.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(text.clone());
        self.vectors.insert(text, vector);
    }

    fn clear(&mut self) {
        self.vectors.clear();
        self.order.clear();
    }
}

impl<E: EmbeddingService> CachedEmbedding<E> {
    /// Wrap `inner`, caching at most `capacity` texts
    pub fn new(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            cache: RwLock::new(EmbeddingCache {
                vectors: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Cached texts and capacity
    pub fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.read();
        (cache.vectors.len(), cache.capacity)
    }
}

#[async_trait]
impl<E: EmbeddingService> EmbeddingService for CachedEmbedding<E> {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or(EmbeddingError::Unavailable)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing: Vec<String> = Vec::new();
        {
            let cache = self.cache.read();
            for text in texts {
                let hit = cache.vectors.get(text).cloned();
                if hit.is_none() && !missing.contains(text) {
                    missing.push(text.clone());
                }
                results.push(hit);
            }
        }

        if !missing.is_empty() {
            // Repeated texts in one batch are embedded once
            let vectors = self.inner.embed_batch(&missing).await?;
            if vectors.len() != missing.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    missing.len(),
                    vectors.len()
                )));
            }

            let dimension = self.inner.dimension();
            let fresh: HashMap<String, Vec<f32>> = missing.into_iter().zip(vectors).collect();
            {
                let mut cache = self.cache.write();
                for (text, vector) in &fresh {
                    if vector.len() == dimension {
                        cache.insert(text.clone(), vector.clone());
                    }
                }
            }
            for (slot, text) in results.iter_mut().zip(texts) {
                if slot.is_none() {
                    *slot = fresh.get(text).cloned();
                }
            }
        }

        results
            .into_iter()
            .map(|v| v.ok_or(EmbeddingError::Unavailable))
            .collect()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Embedding entry point used by the store
///
/// Tries the primary service when one is configured and falls back to
/// [`HashEmbedding`] on error, on a wrong vector count, or on a wrong
/// dimension. Never fails.
pub struct EmbeddingProvider {
    primary: Option<Arc<dyn EmbeddingService>>,
    fallback: HashEmbedding,
}

impl EmbeddingProvider {
    /// Provider that only uses the deterministic fallback
    pub fn fallback_only(dimension: usize) -> Self {
        Self {
            primary: None,
            fallback: HashEmbedding::new(dimension),
        }
    }

    /// Provider with a primary service; the fallback matches its dimension
    pub fn with_primary(primary: Arc<dyn EmbeddingService>) -> Self {
        let fallback = HashEmbedding::new(primary.dimension());
        Self {
            primary: Some(primary),
            fallback,
        }
    }

    /// Build from configuration
    ///
    /// Without an endpoint the provider runs fallback-only.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        let Some(endpoint) = settings.endpoint.as_deref() else {
            return Self::fallback_only(settings.dimension);
        };

        let http = match HttpEmbedding::new(
            endpoint,
            settings.api_key.clone(),
            settings.model.clone(),
            settings.dimension,
            Duration::from_secs(settings.timeout_secs),
        ) {
            Ok(http) => http,
            Err(e) => {
                warn!("Embedding client setup failed, using fallback: {}", e);
                return Self::fallback_only(settings.dimension);
            }
        };

        if settings.enable_cache {
            Self::with_primary(Arc::new(CachedEmbedding::new(http, settings.cache_size)))
        } else {
            Self::with_primary(Arc::new(http))
        }
    }

    /// Embed a batch of texts
    pub async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if let Some(primary) = &self.primary {
            match primary.embed_batch(texts).await {
                Ok(vectors) if self.is_usable(texts, &vectors) => return vectors,
                Ok(vectors) => warn!(
                    "Embedding service returned {} vectors for {} texts, using fallback",
                    vectors.len(),
                    texts.len()
                ),
                Err(e) => warn!("Embedding service failed, using fallback: {}", e),
            }
        }

        debug!("Embedding {} texts with hash fallback", texts.len());
        texts.iter().map(|t| self.fallback.embed(t)).collect()
    }

    /// Embed one text
    pub async fn embed_one(&self, text: &str) -> Vec<f32> {
        self.embed(&[text.to_string()])
            .await
            .pop()
            .unwrap_or_else(|| self.fallback.embed(text))
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.fallback.dimension
    }

    /// Whether a primary service is configured
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    fn is_usable(&self, texts: &[String], vectors: &[Vec<f32>]) -> bool {
        vectors.len() == texts.len() && vectors.iter().all(|v| v.len() == self.fallback.dimension)
    }
}

impl Default for EmbeddingProvider {
    fn default() -> Self {
        Self::fallback_only(actionkb_common::EMBEDDING_DIMENSION)
    }
}
