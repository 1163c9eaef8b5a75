//! In-process vector store
//!
//! Keeps records in insertion order behind a lock and ranks by exhaustive cosine
//! distance. Nothing is persisted.

use crate::vector_db::{
    DistanceMetric, QueryMatch, RecordFilter, StoredEntry, StoredRecord, VectorStore,
};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

struct Collection {
    dimension: Option<usize>,
    /// Key -> position in `records`
    index: HashMap<String, usize>,
    records: Vec<StoredRecord>,
}

impl Collection {
    fn new() -> Self {
        Self {
            dimension: None,
            index: HashMap::new(),
            records: Vec::new(),
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key.clone(), i))
            .collect();
    }
}

pub struct InMemoryVectorStore {
    name: String,
    collection: RwLock<Collection>,
}

impl InMemoryVectorStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collection: RwLock::new(Collection::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new("codebase_sections")
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn lock_error(e: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("In-memory store lock poisoned: {}", e)
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        let mut col = self.collection.write().map_err(lock_error)?;
        if col.dimension.is_none() {
            col.dimension = Some(dimension);
        }
        Ok(())
    }

    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<usize> {
        let mut col = self.collection.write().map_err(lock_error)?;
        let dimension = col.dimension.ok_or(crate::error::VectorDbError::NotInitialized)?;
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            anyhow::bail!(
                "Vector for '{}' has dimension {}, expected {}",
                bad.key,
                bad.vector.len(),
                dimension
            );
        }

        let count = records.len();
        for record in records {
            match col.index.get(&record.key).copied() {
                Some(pos) => col.records[pos] = record,
                None => {
                    let pos = col.records.len();
                    col.index.insert(record.key.clone(), pos);
                    col.records.push(record);
                }
            }
        }
        Ok(count)
    }

    async fn get(&self, filter: &RecordFilter, limit: Option<usize>) -> Result<Vec<StoredEntry>> {
        let col = self.collection.read().map_err(lock_error)?;
        Ok(col
            .records
            .iter()
            .filter(|r| filter.matches(&r.metadata))
            .take(limit.unwrap_or(usize::MAX))
            .map(|r| StoredEntry {
                key: r.key.clone(),
                metadata: r.metadata.clone(),
                document: r.document.clone(),
            })
            .collect())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &RecordFilter,
    ) -> Result<Vec<QueryMatch>> {
        let col = self.collection.read().map_err(lock_error)?;

        let mut scored: Vec<QueryMatch> = col
            .records
            .iter()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| QueryMatch {
                key: r.key.clone(),
                distance: 1.0 - cosine_similarity(&vector, &r.vector),
                metadata: r.metadata.clone(),
                document: r.document.clone(),
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        let doomed: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let mut col = self.collection.write().map_err(lock_error)?;
        let before = col.records.len();
        col.records.retain(|r| !doomed.contains(r.key.as_str()));
        let deleted = before - col.records.len();
        if deleted > 0 {
            col.rebuild_index();
        }
        Ok(deleted)
    }

    async fn delete_matching(&self, filter: &RecordFilter) -> Result<usize> {
        let mut col = self.collection.write().map_err(lock_error)?;
        let before = col.records.len();
        col.records.retain(|r| !filter.matches(&r.metadata));
        let deleted = before - col.records.len();
        if deleted > 0 {
            col.rebuild_index();
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.collection.read().map_err(lock_error)?.records.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut col = self.collection.write().map_err(lock_error)?;
        col.records.clear();
        col.index.clear();
        Ok(())
    }

    fn distance_metric(&self) -> DistanceMetric {
        DistanceMetric::Cosine
    }

    fn collection_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordMetadata, SectionKind};
    use std::collections::BTreeMap;

    fn record(key: &str, repo: &str, vector: Vec<f32>) -> StoredRecord {
        StoredRecord {
            key: key.to_string(),
            vector,
            metadata: RecordMetadata {
                repo: repo.to_string(),
                file_path: "src/app.js".to_string(),
                name: key.to_string(),
                kind: SectionKind::Function,
                start_line: 1,
                end_line: 1,
                attributes: BTreeMap::new(),
                indexed_at: 0,
            },
            document: String::new(),
        }
    }

    async fn store() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::default();
        store.initialize(2).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_upsert_requires_initialize() {
        let store = InMemoryVectorStore::default();
        assert!(store.upsert(vec![record("a", "r", vec![1.0, 0.0])]).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = store().await;
        store
            .upsert(vec![
                record("a", "r", vec![1.0, 0.0]),
                record("b", "r", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        let mut replacement = record("a", "r", vec![0.0, 1.0]);
        replacement.document = "new".to_string();
        store.upsert(vec![replacement]).await.unwrap();

        let entries = store.get(&RecordFilter::all(), None).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[0].document, "new");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = store().await;
        assert!(store.upsert(vec![record("a", "r", vec![1.0])]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = store().await;
        store
            .upsert(vec![
                record("far", "r", vec![0.0, 1.0]),
                record("near", "r", vec![1.0, 0.0]),
                record("other", "s", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let matches = store
            .query(vec![1.0, 0.0], 10, &RecordFilter::repo("r"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].key, "near");
        assert!(matches[0].distance.abs() < 1e-6);
        assert!((matches[1].distance - 1.0).abs() < 1e-6);

        let top = store
            .query(vec![1.0, 0.0], 1, &RecordFilter::all())
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_purge() {
        let store = store().await;
        store
            .upsert(vec![
                record("a", "r", vec![1.0, 0.0]),
                record("b", "r", vec![0.0, 1.0]),
                record("c", "s", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete(&["a".to_string()]).await.unwrap(), 1);
        assert_eq!(store.delete_matching(&RecordFilter::repo("s")).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);

        // index is rebuilt, so upserting the survivor replaces rather than duplicates
        store.upsert(vec![record("b", "r", vec![1.0, 0.0])]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let keys = store.keys(&RecordFilter::all()).await.unwrap();
        assert!(keys.contains("b"));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = store().await;
        store.upsert(vec![record("a", "r", vec![1.0, 0.0])]).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        store.upsert(vec![record("a", "r", vec![1.0, 0.0])]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
