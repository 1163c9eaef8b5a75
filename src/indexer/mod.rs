//! Section indexing
//!
//! Turns extracted sections into stored records: fingerprint, skip what the store
//! already holds, embed the rest with bounded parallelism, and upsert one batch at a
//! time. Failures are counted, never raised.

mod embed_pool;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::extractor::truncate_with_marker;
use crate::fingerprint::section_key;
use crate::repo_id::RepoId;
use crate::types::{IndexSummary, RecordMetadata, Section};
use crate::vector_db::{RecordFilter, StoredRecord, VectorStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Indexing knobs
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub batch_size: usize,
    pub max_concurrency: usize,
    /// Embedding inputs longer than this are truncated with a marker
    pub max_embedding_chars: usize,
    /// Stored display documents are cut to this many characters
    pub max_document_chars: usize,
    pub progress_interval: usize,
    /// Per-call embedding timeout
    pub embed_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl IndexerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.indexing.batch_size.max(1),
            max_concurrency: config.indexing.max_concurrency.max(1),
            max_embedding_chars: config.indexing.max_embedding_chars,
            max_document_chars: config.indexing.max_document_chars,
            progress_interval: config.indexing.progress_interval,
            embed_timeout: Duration::from_secs(config.embedding.timeout_secs.max(1)),
        }
    }
}

/// Keys known to be stored for one repository during one indexing run
///
/// Seeded from the store once, then extended as batches are upserted. Batches run
/// one after another, so the set has a single writer.
#[derive(Debug, Clone)]
pub struct IndexSession {
    repo: RepoId,
    known: HashSet<String>,
}

impl IndexSession {
    /// Empty session (nothing known yet)
    pub fn new(repo: RepoId) -> Self {
        Self {
            repo,
            known: HashSet::new(),
        }
    }

    /// Seed the session with the repository's stored keys
    ///
    /// A failed lookup is logged and the session starts empty; the run then re-embeds
    /// sections the store may already hold, and upsert replaces them.
    pub async fn load(repo: RepoId, store: &dyn VectorStore) -> Self {
        let filter = RecordFilter::repo(repo.as_str());
        let known = match store.keys(&filter).await {
            Ok(keys) => {
                tracing::info!("Found {} existing sections for {}", keys.len(), repo);
                keys
            }
            Err(e) => {
                tracing::warn!("Could not load existing keys for {}: {:#}", repo, e);
                HashSet::new()
            }
        };
        Self { repo, known }
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.known.contains(key)
    }

    pub fn mark_known(&mut self, key: String) {
        self.known.insert(key);
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// A section that passed deduplication and waits for its embedding
struct PendingRecord {
    key: String,
    context: String,
    metadata: RecordMetadata,
    document: String,
}

pub struct SectionIndexer {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: IndexerConfig,
}

impl SectionIndexer {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Index a repository's sections, skipping any already stored
    pub async fn index(&self, repo: &RepoId, sections: &[Section]) -> IndexSummary {
        let mut session = IndexSession::load(repo.clone(), self.store.as_ref()).await;
        self.index_with_session(&mut session, sections).await
    }

    /// Index against an explicit session
    pub async fn index_with_session(
        &self,
        session: &mut IndexSession,
        sections: &[Section],
    ) -> IndexSummary {
        let start = Instant::now();
        let total = sections.len();
        let indexed_at = chrono::Utc::now().timestamp();
        let mut summary = IndexSummary {
            total,
            ..IndexSummary::default()
        };

        tracing::info!("Indexing {} sections for {}", total, session.repo());

        for (batch_idx, batch) in sections.chunks(self.config.batch_size).enumerate() {
            let batch_start = batch_idx * self.config.batch_size;
            self.index_batch(session, batch, indexed_at, &mut summary)
                .await;
            self.log_progress(batch_start, batch_start + batch.len(), &summary);
        }

        summary.collection_size = match self.store.count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Could not count collection records: {:#}", e);
                0
            }
        };

        tracing::info!(
            "Indexing complete for {}: indexed {}, skipped {}, errors {} out of {} sections in {:?}",
            session.repo(),
            summary.indexed,
            summary.skipped,
            summary.errors,
            summary.total,
            start.elapsed()
        );
        summary
    }

    async fn index_batch(
        &self,
        session: &mut IndexSession,
        batch: &[Section],
        indexed_at: i64,
        summary: &mut IndexSummary,
    ) {
        let mut queued: HashSet<String> = HashSet::new();
        let mut pending = Vec::new();

        for section in batch {
            let key = section_key(session.repo(), section);
            if session.is_known(&key) || queued.contains(&key) {
                summary.skipped += 1;
                continue;
            }
            queued.insert(key.clone());

            pending.push(PendingRecord {
                context: truncate_with_marker(
                    &section.embedding_context(),
                    self.config.max_embedding_chars,
                ),
                metadata: RecordMetadata::from_section(session.repo(), section, indexed_at),
                document: section
                    .body
                    .chars()
                    .take(self.config.max_document_chars)
                    .collect(),
                key,
            });
        }

        if pending.is_empty() {
            return;
        }

        let contexts: Vec<String> = pending.iter().map(|p| p.context.clone()).collect();
        let embeddings = embed_pool::embed_all(
            Arc::clone(&self.provider),
            contexts,
            self.config.max_concurrency,
            self.config.embed_timeout,
        )
        .await;

        let mut records = Vec::with_capacity(pending.len());
        for (item, embedding) in pending.into_iter().zip(embeddings) {
            match embedding {
                Some(vector) => records.push(StoredRecord {
                    key: item.key,
                    vector,
                    metadata: item.metadata,
                    document: item.document,
                }),
                None => summary.errors += 1,
            }
        }

        if records.is_empty() {
            return;
        }

        let keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
        match self.store.upsert(records).await {
            Ok(_) => {
                summary.indexed += keys.len();
                for key in keys {
                    session.mark_known(key);
                }
            }
            Err(e) => {
                tracing::error!("Error adding batch to collection: {:#}", e);
                summary.errors += keys.len();
            }
        }
    }

    fn log_progress(&self, before: usize, after: usize, summary: &IndexSummary) {
        let interval = self.config.progress_interval;
        if interval == 0 || after == summary.total || after / interval == before / interval {
            return;
        }
        let pct = after as f64 / summary.total as f64 * 100.0;
        tracing::info!(
            "Progress: {}/{} sections ({:.1}%) - Indexed: {}, Skipped: {}, Errors: {}",
            after,
            summary.total,
            pct,
            summary.indexed,
            summary.skipped,
            summary.errors
        );
    }
}
