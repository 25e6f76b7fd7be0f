//! Persistence seams for indexed chunks and the in-memory reference store.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;

use biograph_core::{BioDocument, IndexMeta, IndexedChunkRecord, Result};
use tokio::sync::RwLock;

use crate::similarity::cosine_similarity;

/// Document-store seam for one owner's chunk records and index metadata.
///
/// Implementations must make `insert_chunks` atomic from the caller's
/// perspective: readers see either none or all of a generation's records.
pub trait ChunkStore: Send + Sync {
    /// Delete every chunk record for an owner, returning the count removed.
    ///
    /// # Errors
    /// Returns an error if the store rejects the operation.
    fn delete_chunks(&self, owner_id: &str) -> impl Future<Output = Result<usize>> + Send;

    /// Commit a generation of chunk records in one atomic write.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    fn insert_chunks(
        &self,
        owner_id: &str,
        records: Vec<IndexedChunkRecord>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetch all chunk records for an owner.
    ///
    /// # Errors
    /// Returns an error if the store rejects the read.
    fn fetch_chunks(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = Result<Vec<IndexedChunkRecord>>> + Send;

    /// Load an owner's index metadata, if any.
    ///
    /// # Errors
    /// Returns an error if the store rejects the read.
    fn load_meta(&self, owner_id: &str) -> impl Future<Output = Result<Option<IndexMeta>>> + Send;

    /// Upsert an owner's index metadata.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    fn save_meta(&self, meta: &IndexMeta) -> impl Future<Output = Result<()>> + Send;

    /// Delete an owner's index metadata. Returns whether anything existed.
    ///
    /// # Errors
    /// Returns an error if the store rejects the operation.
    fn delete_meta(&self, owner_id: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Seam to the profile subsystem that owns bio documents.
pub trait ProfileSource: Send + Sync {
    /// Fetch the current bio document for an owner, if one exists.
    ///
    /// # Errors
    /// Returns an error if the profile subsystem is unreachable.
    fn bio_document(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = Result<Option<BioDocument>>> + Send;
}

/// A stored chunk scored against a query embedding.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The stored record.
    pub record: IndexedChunkRecord,
    /// Cosine similarity to the query.
    pub score: f32,
}

#[derive(Default)]
struct OwnerState {
    chunks: Vec<IndexedChunkRecord>,
    meta: Option<IndexMeta>,
}

/// In-memory chunk store, sharded by owner id.
///
/// Used by tests and embedded deployments; production deployments implement
/// [`ChunkStore`] over the managed document store.
#[derive(Default)]
pub struct MemoryChunkStore {
    owners: RwLock<HashMap<String, OwnerState>>,
}

impl MemoryChunkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of owners with any stored state (records or metadata).
    pub async fn owner_count(&self) -> usize {
        self.owners.read().await.len()
    }

    /// Rank an owner's stored chunks by similarity to a query embedding.
    ///
    /// Returns at most `top_k` results in descending score order. Records
    /// whose vectors cannot be compared to the query score 0.
    ///
    /// # Errors
    /// Returns an error if the store rejects the read.
    pub async fn search(
        &self,
        owner_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let owners = self.owners.read().await;
        let Some(state) = owners.get(owner_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = state
            .chunks
            .iter()
            .map(|record| ScoredChunk {
                score: cosine_similarity(query_embedding, &record.embedding).unwrap_or(0.0),
                record: record.clone(),
            })
            .collect();

        scored.sort_by(|first, second| {
            second
                .score
                .partial_cmp(&first.score)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

impl ChunkStore for MemoryChunkStore {
    async fn delete_chunks(&self, owner_id: &str) -> Result<usize> {
        let mut owners = self.owners.write().await;
        let Some(state) = owners.get_mut(owner_id) else {
            return Ok(0);
        };
        let removed = state.chunks.len();
        state.chunks.clear();
        // An owner with no records and no metadata holds no state worth a
        // map entry.
        if state.meta.is_none() {
            owners.remove(owner_id);
        }
        Ok(removed)
    }

    async fn insert_chunks(&self, owner_id: &str, records: Vec<IndexedChunkRecord>) -> Result<()> {
        let mut owners = self.owners.write().await;
        let state = owners.entry(owner_id.to_owned()).or_default();
        state.chunks.extend(records);
        Ok(())
    }

    async fn fetch_chunks(&self, owner_id: &str) -> Result<Vec<IndexedChunkRecord>> {
        let owners = self.owners.read().await;
        Ok(owners
            .get(owner_id)
            .map(|state| state.chunks.clone())
            .unwrap_or_default())
    }

    async fn load_meta(&self, owner_id: &str) -> Result<Option<IndexMeta>> {
        let owners = self.owners.read().await;
        Ok(owners.get(owner_id).and_then(|state| state.meta.clone()))
    }

    async fn save_meta(&self, meta: &IndexMeta) -> Result<()> {
        let mut owners = self.owners.write().await;
        let state = owners.entry(meta.owner_id.clone()).or_default();
        state.meta = Some(meta.clone());
        Ok(())
    }

    async fn delete_meta(&self, owner_id: &str) -> Result<bool> {
        let mut owners = self.owners.write().await;
        let Some(state) = owners.get_mut(owner_id) else {
            return Ok(false);
        };
        let existed = state.meta.take().is_some();
        if state.chunks.is_empty() {
            owners.remove(owner_id);
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biograph_core::{BioEntryType, ChunkMetadata};
    use chrono::Utc;

    fn record(owner_id: &str, text: &str, embedding: Vec<f32>) -> IndexedChunkRecord {
        IndexedChunkRecord {
            owner_id: owner_id.to_owned(),
            chunk_text: text.to_owned(),
            embedding,
            source_type: BioEntryType::Policy,
            source_entry_id: "entry-1".to_owned(),
            source_position: 0,
            metadata: ChunkMetadata {
                source_entry_id: "entry-1".to_owned(),
                source_type: BioEntryType::Policy,
                source_type_name: BioEntryType::Policy.display_name().to_owned(),
                title: None,
                tags: Vec::new(),
                weight: 0.9,
                char_length: text.chars().count(),
                total_chunks: 1,
            },
            bio_version: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_delete_on_absent_owner_is_noop() {
        let store = MemoryChunkStore::new();
        assert_eq!(store.delete_chunks("nobody").await.unwrap(), 0);
        assert!(!store.delete_meta("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_ranks_descending_and_truncates() {
        let store = MemoryChunkStore::new();
        store
            .insert_chunks(
                "user-1",
                vec![
                    record("user-1", "정확히 일치", vec![1.0, 0.0, 0.0]),
                    record("user-1", "직교", vec![0.0, 1.0, 0.0]),
                    record("user-1", "비슷함", vec![0.9, 0.1, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.search("user-1", &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.chunk_text, "정확히 일치");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_fully_emptied_owner_is_pruned() {
        let store = MemoryChunkStore::new();
        store
            .insert_chunks("user-1", vec![record("user-1", "본문", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .save_meta(&IndexMeta {
                owner_id: "user-1".to_owned(),
                last_indexed_at: Utc::now(),
                bio_version: 1,
                chunk_count: 1,
                entries_count: 1,
                stats: biograph_core::IndexStats::default(),
            })
            .await
            .unwrap();
        assert_eq!(store.owner_count().await, 1);

        // Chunks alone leave the meta entry in place.
        store.delete_chunks("user-1").await.unwrap();
        assert_eq!(store.owner_count().await, 1);

        // Dropping the meta too leaves nothing worth an entry.
        assert!(store.delete_meta("user-1").await.unwrap());
        assert_eq!(store.owner_count().await, 0);
    }

    #[tokio::test]
    async fn test_search_absent_owner_is_empty() {
        let store = MemoryChunkStore::new();
        let results = store.search("nobody", &[1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }
}
