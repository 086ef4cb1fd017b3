//! Vector Store Implementations
//!
//! The store boundary is entity-agnostic: records are an id, a document text
//! and a typed JSON metadata object. Any vector database that supports
//! equality/AND metadata filters can sit behind [`VectorStore`].

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ordered_float::OrderedFloat;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use actionkb_common::{KbError, WhereFilter};

use super::embedding::EmbeddingProvider;
use crate::domain::text::search_tokens;

/// One record written to a collection
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRecord {
    pub id: String,
    /// Text that is embedded and matched
    pub document: String,
    /// Typed metadata used for filtering and reconstruction
    pub metadata: Value,
    /// Short names of the record scored for word overlap; empty means the document
    pub phrases: Vec<String>,
}

/// Query hits ordered by ascending distance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Value>,
    /// Dissimilarity in [0, 2]
    pub distances: Vec<f32>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Trait for vector store backends
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Ensure a collection exists
    async fn get_or_create(&self, collection: &str) -> Result<(), StoreError>;

    /// Insert new records; an existing id is rejected with `DuplicateId`
    async fn add(&self, collection: &str, records: Vec<StoreRecord>) -> Result<(), StoreError>;

    /// Metadata of the ids that exist, in request order
    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<Value>, StoreError>;

    /// Replace existing records; an unknown id is rejected with `NotFound`
    async fn update(&self, collection: &str, records: Vec<StoreRecord>) -> Result<(), StoreError>;

    /// Nearest records to `query_text` passing `filter`
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        n_results: usize,
        filter: Option<&WhereFilter>,
    ) -> Result<QueryResult, StoreError>;

    /// Number of records in a collection
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// Remove every record while keeping the collection open for writers
    async fn clear(&self, collection: &str) -> Result<(), StoreError>;

    /// Drop a collection and every record in it
    async fn delete_collection(&self, collection: &str) -> Result<(), StoreError>;
}

/// Errors from vector store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found in {collection}: {id}")]
    NotFound { collection: String, id: String },

    #[error("Duplicate id in {collection}: {id}")]
    DuplicateId { collection: String, id: String },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for KbError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => KbError::NotFound { collection, id },
            StoreError::DuplicateId { collection, id } => KbError::DuplicateId { collection, id },
            StoreError::CollectionNotFound(name) => {
                KbError::StoreUnavailable(format!("collection {} does not exist", name))
            }
            StoreError::Unavailable(msg) => KbError::StoreUnavailable(msg),
        }
    }
}

/// A record with its embedding and the token set of each phrase
#[derive(Debug, Clone)]
struct IndexedRecord {
    document: String,
    metadata: Value,
    embedding: Vec<f32>,
    phrases: Vec<HashSet<String>>,
}

/// One candidate during a query
struct Scored {
    id: String,
    document: String,
    metadata: Value,
    semantic: f32,
    distance: f32,
}

type Collection = Arc<DashMap<String, IndexedRecord>>;

/// In-process brute-force vector store
///
/// Uses one DashMap per collection. Writes to different ids never contend on
/// the same entry; writes to the same id serialize on its shard lock and the
/// last write wins.
///
/// Distance is `1 - max(cosine, overlap)`, where overlap is the best Jaccard
/// index between the query tokens and one of the record's phrases. Ties on
/// distance go to the higher cosine, then to the smaller id.
pub struct InMemoryVectorStore {
    collections: DashMap<String, Collection>,
    embedder: Arc<EmbeddingProvider>,
}

impl InMemoryVectorStore {
    /// Create an empty store
    pub fn new(embedder: Arc<EmbeddingProvider>) -> Self {
        Self {
            collections: DashMap::new(),
            embedder,
        }
    }

    fn collection(&self, name: &str) -> Result<Collection, StoreError> {
        self.collections
            .get(name)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    async fn index(&self, records: Vec<StoreRecord>) -> Vec<(String, IndexedRecord)> {
        let documents: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
        let embeddings = self.embedder.embed(&documents).await;

        records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| {
                let phrases = if record.phrases.is_empty() {
                    vec![token_set(&record.document)]
                } else {
                    record.phrases.iter().map(|p| token_set(p)).collect()
                };
                (
                    record.id,
                    IndexedRecord {
                        document: record.document,
                        metadata: record.metadata,
                        embedding,
                        phrases,
                    },
                )
            })
            .collect()
    }

    /// Names of existing collections
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn get_or_create(&self, collection: &str) -> Result<(), StoreError> {
        self.collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn add(&self, collection: &str, records: Vec<StoreRecord>) -> Result<(), StoreError> {
        let target = self.collection(collection)?;

        for (id, record) in self.index(records).await {
            match target.entry(id) {
                Entry::Occupied(entry) => {
                    return Err(StoreError::DuplicateId {
                        collection: collection.to_string(),
                        id: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
            }
        }
        Ok(())
    }

    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<Value>, StoreError> {
        let target = self.collection(collection)?;
        Ok(ids
            .iter()
            .filter_map(|id| target.get(id).map(|r| r.metadata.clone()))
            .collect())
    }

    async fn update(&self, collection: &str, records: Vec<StoreRecord>) -> Result<(), StoreError> {
        let target = self.collection(collection)?;

        if let Some(missing) = records.iter().find(|r| !target.contains_key(&r.id)) {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: missing.id.clone(),
            });
        }

        for (id, record) in self.index(records).await {
            match target.get_mut(&id) {
                Some(mut existing) => *existing = record,
                None => {
                    return Err(StoreError::NotFound {
                        collection: collection.to_string(),
                        id,
                    })
                }
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        n_results: usize,
        filter: Option<&WhereFilter>,
    ) -> Result<QueryResult, StoreError> {
        let target = self.collection(collection)?;
        let query_embedding = self.embedder.embed_one(query_text).await;
        let query_tokens = token_set(query_text);

        let mut scored: Vec<Scored> = target
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| {
                let semantic = cosine_similarity(&query_embedding, &r.embedding);
                let overlap = r
                    .phrases
                    .iter()
                    .map(|phrase| jaccard(&query_tokens, phrase))
                    .fold(0.0f32, f32::max);
                Scored {
                    id: r.key().clone(),
                    document: r.document.clone(),
                    metadata: r.metadata.clone(),
                    semantic,
                    distance: (1.0 - semantic.max(overlap)).clamp(0.0, 2.0),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            OrderedFloat(a.distance)
                .cmp(&OrderedFloat(b.distance))
                .then_with(|| OrderedFloat(b.semantic).cmp(&OrderedFloat(a.semantic)))
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(n_results);

        debug!(
            collection,
            query = query_text,
            hits = scored.len(),
            "vector store query"
        );

        let mut result = QueryResult::default();
        for hit in scored {
            result.ids.push(hit.id);
            result.documents.push(hit.document);
            result.metadatas.push(hit.metadata);
            result.distances.push(hit.distance);
        }
        Ok(result)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.collection(collection)?.len())
    }

    async fn clear(&self, collection: &str) -> Result<(), StoreError> {
        self.collection(collection)?.clear();
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.collections.remove(collection);
        Ok(())
    }
}

/// Cosine similarity in [-1, 1]; 0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

fn token_set(text: &str) -> HashSet<String> {
    search_tokens(text).into_iter().collect()
}

/// Jaccard index of two token sets; 0 when either is empty
///
/// Extra tokens on either side lower the score, so a one-word query is never
/// an exact hit on a three-word phrase.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f32 / (a.len() + b.len() - shared) as f32
}
