//! Index lifecycle orchestration: rebuild, on-demand refresh, status, and
//! removal.

use std::collections::HashMap;
use std::sync::Arc;

use biograph_core::{
    BioDocument, BioEntry, EmbeddingConfig, Error, IndexMeta, IndexStats, IndexStatus,
    IndexedChunkRecord, Result,
};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::embedding::{BatchOptions, EmbeddingBackend, EmbeddingMode, batch_generate_embeddings};
use crate::segmenter::{ChunkOptions, chunk_bio_entries};
use crate::store::{ChunkStore, ProfileSource};

/// Counts reported by a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOutcome {
    /// Chunk records written.
    pub indexed: usize,
    /// Chunks dropped because their embedding failed.
    pub failed: usize,
    /// Prior chunk records deleted.
    pub removed: usize,
}

/// Per-owner counts from an administrative batch rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Owners rebuilt successfully.
    pub success: usize,
    /// Owners whose rebuild failed.
    pub failed: usize,
}

/// Owns the full lifecycle of per-owner indexed-chunk collections.
///
/// Generic over the embedding backend and the chunk store so tests can
/// substitute fakes without touching process-wide state. Rebuilds for one
/// owner are serialized by an in-memory per-owner lock held across the
/// delete → write → meta-update sequence.
pub struct Indexer<E: EmbeddingBackend, S: ChunkStore> {
    client: E,
    store: S,
    chunk_options: ChunkOptions,
    batch_options: BatchOptions,
    owner_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<E: EmbeddingBackend, S: ChunkStore> Indexer<E, S> {
    /// Create an indexer with default segmentation and batch settings.
    pub fn new(client: E, store: S) -> Self {
        Self {
            client,
            store,
            chunk_options: ChunkOptions::default(),
            batch_options: BatchOptions::default(),
            owner_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create an indexer whose batch pacing follows the embedding
    /// configuration, so one config drives both the client and the indexer.
    pub fn from_config(client: E, store: S, config: &EmbeddingConfig) -> Self {
        Self::new(client, store).with_batch_options(BatchOptions::from(config))
    }

    /// Override segmentation options.
    #[must_use]
    pub fn with_chunk_options(mut self, options: ChunkOptions) -> Self {
        self.chunk_options = options;
        self
    }

    /// Override batch pacing options.
    #[must_use]
    pub fn with_batch_options(mut self, options: BatchOptions) -> Self {
        self.batch_options = options;
        self
    }

    /// Access the underlying store (retrieval consumers search through it).
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn owner_lock(&self, owner_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.owner_locks.lock().await;
        Arc::clone(
            locks
                .entry(owner_id.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Full rebuild of one owner's index at the given generation.
    ///
    /// Deletes every existing chunk record, segments and embeds the entries,
    /// commits the surviving records atomically, and upserts `IndexMeta`
    /// last, so a reader never observes a version whose chunks are absent.
    /// Chunks whose embedding failed are dropped with a warning, not fatal.
    ///
    /// # Errors
    /// Returns an error for an empty owner id or when the store rejects an
    /// operation. Per-chunk embedding failures are reported via
    /// [`IndexOutcome::failed`] instead.
    pub async fn index_bio_entries(
        &self,
        owner_id: &str,
        entries: &[BioEntry],
        bio_version: u64,
    ) -> Result<IndexOutcome> {
        if owner_id.trim().is_empty() {
            return Err(Error::Validation("owner id must not be empty".to_owned()));
        }

        let lock = self.owner_lock(owner_id).await;
        let _guard = lock.lock().await;
        self.rebuild_locked(owner_id, entries, bio_version).await
    }

    async fn rebuild_locked(
        &self,
        owner_id: &str,
        entries: &[BioEntry],
        bio_version: u64,
    ) -> Result<IndexOutcome> {
        let removed = self.store.delete_chunks(owner_id).await?;

        let corpus = chunk_bio_entries(entries, &self.chunk_options);
        if corpus.chunks.is_empty() {
            // Still advance the generation so status reflects the rebuild.
            let meta = IndexMeta {
                owner_id: owner_id.to_owned(),
                last_indexed_at: Utc::now(),
                bio_version,
                chunk_count: 0,
                entries_count: 0,
                stats: IndexStats::default(),
            };
            self.store.save_meta(&meta).await?;
            info!("Indexed {owner_id}: no chunks produced, {removed} prior records removed");
            return Ok(IndexOutcome {
                indexed: 0,
                failed: 0,
                removed,
            });
        }

        let texts: Vec<String> = corpus
            .chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect();
        let outcomes = batch_generate_embeddings(
            &self.client,
            &texts,
            EmbeddingMode::Document,
            &self.batch_options,
        )
        .await;

        let created_at = Utc::now();
        let mut records = Vec::with_capacity(corpus.chunks.len());
        let mut failed = 0;

        // Outcomes come back in input order, so position metadata survives.
        for (chunk, outcome) in corpus.chunks.into_iter().zip(outcomes) {
            if let Some(embedding) = outcome.embedding.filter(|_| outcome.success) {
                records.push(IndexedChunkRecord {
                    owner_id: owner_id.to_owned(),
                    chunk_text: chunk.text,
                    embedding,
                    source_type: chunk.metadata.source_type,
                    source_entry_id: chunk.metadata.source_entry_id.clone(),
                    source_position: chunk.position,
                    metadata: chunk.metadata,
                    bio_version,
                    created_at,
                });
            } else {
                failed += 1;
                warn!(
                    "Dropping chunk {} of entry {}: {}",
                    chunk.position,
                    chunk.metadata.source_entry_id,
                    outcome.error.as_deref().unwrap_or("embedding failed")
                );
            }
        }

        let indexed = records.len();
        self.store.insert_chunks(owner_id, records).await?;

        let meta = IndexMeta {
            owner_id: owner_id.to_owned(),
            last_indexed_at: created_at,
            bio_version,
            chunk_count: indexed,
            entries_count: corpus.stats.processed_entries,
            stats: IndexStats {
                total_chars: corpus.stats.total_chars,
                avg_chunk_size: corpus.stats.avg_chunk_size,
            },
        };
        self.store.save_meta(&meta).await?;

        info!(
            "Indexed {owner_id}: {indexed} chunks written, {failed} dropped, \
             {removed} replaced (version {bio_version})"
        );

        Ok(IndexOutcome {
            indexed,
            failed,
            removed,
        })
    }

    /// Idempotent refresh called opportunistically before retrieval.
    ///
    /// Returns `true` when a rebuild was performed, `false` when the index
    /// was already fresh. Any rebuild failure is caught and logged, never
    /// propagated: content generation proceeds with whatever index exists.
    pub async fn index_on_demand(&self, owner_id: &str, document: &BioDocument) -> bool {
        match self.refresh_if_stale(owner_id, document).await {
            Ok(did_work) => did_work,
            Err(error) => {
                warn!("On-demand indexing for {owner_id} failed, proceeding without: {error}");
                false
            }
        }
    }

    async fn refresh_if_stale(&self, owner_id: &str, document: &BioDocument) -> Result<bool> {
        if let Some(meta) = self.store.load_meta(owner_id).await?
            && meta.chunk_count > 0
            && meta.bio_version >= document.version
        {
            return Ok(false);
        }

        self.index_bio_entries(owner_id, &document.entries, document.version)
            .await?;
        Ok(true)
    }

    /// Delete all chunk records and index metadata for an owner.
    ///
    /// # Errors
    /// Returns an error if the store rejects the operation.
    pub async fn remove_all_chunks(&self, owner_id: &str) -> Result<usize> {
        let removed = {
            let lock = self.owner_lock(owner_id).await;
            let _guard = lock.lock().await;

            let removed = self.store.delete_chunks(owner_id).await?;
            self.store.delete_meta(owner_id).await?;
            removed
        };

        // The lock entry is only pruned once nothing else holds it, so a
        // rebuild racing this removal keeps serializing on the same lock.
        let mut locks = self.owner_locks.lock().await;
        if let Some(existing) = locks.get(owner_id)
            && Arc::strong_count(existing) == 1
        {
            locks.remove(owner_id);
        }
        drop(locks);

        info!("Removed {removed} indexed chunks for {owner_id}");
        Ok(removed)
    }

    /// Read-only projection of an owner's index state, never null.
    ///
    /// # Errors
    /// Returns an error if the store rejects the read.
    pub async fn get_index_status(&self, owner_id: &str) -> Result<IndexStatus> {
        Ok(self
            .store
            .load_meta(owner_id)
            .await?
            .map_or_else(|| IndexStatus::absent(owner_id), IndexStatus::from))
    }

    /// Administrative batch rebuild across owners.
    ///
    /// Owners without a bio document or with zero entries are skipped, not
    /// failed. One owner's failure never stops processing of the rest.
    pub async fn rebuild_indexes<P: ProfileSource>(
        &self,
        source: &P,
        owner_ids: &[String],
    ) -> RebuildSummary {
        let mut summary = RebuildSummary::default();

        for owner_id in owner_ids {
            let document = match source.bio_document(owner_id).await {
                Ok(Some(document)) => document,
                Ok(None) => {
                    info!("Skipping {owner_id}: no bio document");
                    continue;
                }
                Err(error) => {
                    warn!("Failed to load bio document for {owner_id}: {error}");
                    summary.failed += 1;
                    continue;
                }
            };

            if document.entries.is_empty() {
                info!("Skipping {owner_id}: bio document has no entries");
                continue;
            }

            match self
                .index_bio_entries(owner_id, &document.entries, document.version)
                .await
            {
                Ok(outcome) => {
                    summary.success += 1;
                    info!(
                        "Rebuilt index for {owner_id}: {} chunks ({} dropped)",
                        outcome.indexed, outcome.failed
                    );
                }
                Err(error) => {
                    summary.failed += 1;
                    warn!("Rebuild failed for {owner_id}: {error}");
                }
            }
        }

        info!(
            "Batch rebuild finished: {} succeeded, {} failed",
            summary.success, summary.failed
        );
        summary
    }
}
