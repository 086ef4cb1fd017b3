//! Typed knowledge collections
//!
//! [`KnowledgeCollection`] puts one entity type on top of a raw
//! [`VectorStore`] collection: entities go in as typed metadata and come back
//! out as entities with a distance and a confidence. Queries and match
//! phrases are both rewritten to canonical verbs before they reach the store.

use std::marker::PhantomData;
use std::sync::Arc;

use actionkb_common::{validate_id, KbError, KnowledgeEntity, Result, WhereFilter};
use serde::Serialize;
use tracing::debug;

use super::synonyms::SynonymTable;
use crate::infra::vector_store::{StoreError, StoreRecord, VectorStore};

/// Confidence for a store distance: `max(0, 1 - distance)`, clamped to [0, 1]
pub fn confidence_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Whether an add created a new entity or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// Entity returned by a similarity query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntity<T> {
    pub entity: T,
    /// Store distance in [0, 2]
    pub distance: f32,
    /// Derived confidence in [0, 1]
    pub confidence: f32,
}

/// One entity type stored in one vector store collection
pub struct KnowledgeCollection<T: KnowledgeEntity> {
    store: Arc<dyn VectorStore>,
    synonyms: Arc<SynonymTable>,
    name: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T: KnowledgeEntity> Clone for KnowledgeCollection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            synonyms: Arc::clone(&self.synonyms),
            name: self.name,
            _entity: PhantomData,
        }
    }
}

impl<T: KnowledgeEntity> KnowledgeCollection<T> {
    /// Open (creating if needed) the collection for `T`
    pub async fn open(store: Arc<dyn VectorStore>, synonyms: Arc<SynonymTable>) -> Result<Self> {
        store.get_or_create(T::COLLECTION).await?;
        Ok(Self {
            store,
            synonyms,
            name: T::COLLECTION,
            _entity: PhantomData,
        })
    }

    /// Collection name
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn record(&self, entity: &T) -> Result<StoreRecord> {
        validate_id(entity.id())?;
        Ok(StoreRecord {
            id: entity.id().to_string(),
            document: entity.document_text(),
            metadata: serde_json::to_value(entity)?,
            phrases: entity
                .match_phrases()
                .iter()
                .map(|p| self.synonyms.canonicalize(p))
                .filter(|p| !p.is_empty())
                .collect(),
        })
    }

    fn decode(&self, metadata: serde_json::Value) -> Result<T> {
        serde_json::from_value(metadata)
            .map_err(|e| KbError::Serialization(format!("{}: {}", self.name, e)))
    }

    /// Add an entity; an existing id is replaced with the new values
    pub async fn add(&self, entity: &T) -> Result<Upserted> {
        match self.insert_new(entity).await? {
            Upserted::Created => Ok(Upserted::Created),
            Upserted::Updated => {
                debug!(collection = self.name, id = entity.id(), "duplicate id, updating");
                self.update(entity).await?;
                Ok(Upserted::Updated)
            }
        }
    }

    /// Add an entity only if its id is new
    ///
    /// Returns `Upserted::Updated` without writing when the id already
    /// exists, so callers can treat re-adds as idempotent.
    pub async fn insert_new(&self, entity: &T) -> Result<Upserted> {
        let record = self.record(entity)?;
        match self.store.add(self.name, vec![record]).await {
            Ok(()) => Ok(Upserted::Created),
            Err(StoreError::DuplicateId { .. }) => Ok(Upserted::Updated),
            Err(e) => Err(e.into()),
        }
    }

    /// Entities for the ids that exist, in request order
    pub async fn get(&self, ids: &[String]) -> Result<Vec<T>> {
        self.store
            .get(self.name, ids)
            .await?
            .into_iter()
            .map(|m| self.decode(m))
            .collect()
    }

    /// One entity by id
    pub async fn get_one(&self, id: &str) -> Result<T> {
        self.get(&[id.to_string()])
            .await?
            .pop()
            .ok_or_else(|| KbError::not_found(self.name, id))
    }

    /// Replace an existing entity
    pub async fn update(&self, entity: &T) -> Result<()> {
        let record = self.record(entity)?;
        self.store.update(self.name, vec![record]).await?;
        Ok(())
    }

    /// Nearest entities to `query_text`, best first
    pub async fn query(
        &self,
        query_text: &str,
        top_k: usize,
        filter: Option<&WhereFilter>,
    ) -> Result<Vec<ScoredEntity<T>>> {
        let query_text = self.synonyms.canonicalize(query_text);
        let result = self.store.query(self.name, &query_text, top_k, filter).await?;

        result
            .metadatas
            .into_iter()
            .zip(result.distances)
            .map(|(metadata, distance)| {
                Ok(ScoredEntity {
                    entity: self.decode(metadata)?,
                    distance,
                    confidence: confidence_from_distance(distance),
                })
            })
            .collect()
    }

    /// Number of stored entities
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.count(self.name).await?)
    }

    /// Delete every entity; the collection stays open for concurrent writers
    pub async fn clear(&self) -> Result<()> {
        self.store.clear(self.name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::embedding::EmbeddingProvider;
    use crate::infra::vector_store::InMemoryVectorStore;
    use actionkb_common::AtomicAction;
    use proptest::prelude::*;

    async fn collection() -> KnowledgeCollection<AtomicAction> {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(EmbeddingProvider::default())));
        KnowledgeCollection::open(store, Arc::new(SynonymTable::default())).await.unwrap()
    }

    fn action(id: &str, method: &str) -> AtomicAction {
        AtomicAction::new(id, crate::domain::text::to_snake_case(method), method, "PlayerScreen")
    }

    #[tokio::test]
    async fn test_add_duplicate_is_upsert() {
        let atomic = collection().await;
        assert_eq!(atomic.add(&action("a1", "clickPlayButton")).await.unwrap(), Upserted::Created);

        let newer = action("a1", "clickPlayButton").with_keywords(["fresh"]);
        assert_eq!(atomic.add(&newer).await.unwrap(), Upserted::Updated);

        assert_eq!(atomic.count().await.unwrap(), 1);
        let stored = atomic.get_one("a1").await.unwrap();
        assert!(stored.keywords.contains("fresh"));
    }

    #[tokio::test]
    async fn test_insert_new_does_not_overwrite() {
        let atomic = collection().await;
        atomic.add(&action("a1", "clickPlayButton")).await.unwrap();

        let other = action("a1", "clickPauseButton");
        assert_eq!(atomic.insert_new(&other).await.unwrap(), Upserted::Updated);
        assert_eq!(atomic.get_one("a1").await.unwrap().method_name, "clickPlayButton");
    }

    #[tokio::test]
    async fn test_get_one_missing_is_not_found() {
        let atomic = collection().await;
        let err = atomic.get_one("ghost").await.unwrap_err();
        assert!(err.is_not_found());

        let err = atomic.update(&action("ghost", "clickPlayButton")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_id_rejected() {
        let atomic = collection().await;
        let err = atomic.add(&action("", "clickPlayButton")).await.unwrap_err();
        assert!(matches!(err, KbError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_clear_empties_collection() {
        let atomic = collection().await;
        atomic.add(&action("a1", "clickPlayButton")).await.unwrap();
        atomic.add(&action("a2", "clickPauseButton")).await.unwrap();
        atomic.clear().await.unwrap();
        assert_eq!(atomic.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adds_racing_clear_never_fail() {
        let atomic = collection().await;
        let adds = (0..16).map(|i| {
            let atomic = atomic.clone();
            async move { atomic.add(&action(&format!("a{}", i), "clickPlayButton")).await }
        });

        let (results, cleared) = tokio::join!(futures::future::join_all(adds), atomic.clear());
        cleared.unwrap();
        for result in results {
            assert_eq!(result.unwrap(), Upserted::Created);
        }
        assert!(atomic.count().await.unwrap() <= 16);
    }

    #[tokio::test]
    async fn test_query_returns_confidence() {
        let atomic = collection().await;
        atomic.add(&action("a1", "clickPlayButton")).await.unwrap();

        let hits = atomic.query("click play button", 3, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity.id, "a1");
        assert_eq!(hits[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_to_same_id_keep_one_entity() {
        let atomic = collection().await;
        let writes = (0..16).map(|i| {
            let atomic = atomic.clone();
            async move {
                let entity = action("a1", "clickPlayButton").with_keywords([format!("k{}", i)]);
                atomic.add(&entity).await
            }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }
        assert_eq!(atomic.count().await.unwrap(), 1);
    }

    proptest! {
        #[test]
        fn confidence_is_bounded_and_monotonic(a in 0.0f32..=2.0, b in 0.0f32..=2.0) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            let c_near = confidence_from_distance(near);
            let c_far = confidence_from_distance(far);
            prop_assert!((0.0..=1.0).contains(&c_near));
            prop_assert!((0.0..=1.0).contains(&c_far));
            prop_assert!(c_near >= c_far);
        }
    }
}
