// LanceDB is the default embedded vector database
pub mod lance_client;
pub use lance_client::LanceVectorDB;

pub mod memory;
pub use memory::InMemoryVectorStore;

use crate::config::VectorDbConfig;
use crate::error::{RagError, VectorDbError};
use crate::types::RecordMetadata;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Distance function a store ranks neighbours by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
    L2,
    Dot,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
            DistanceMetric::Dot => "dot",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record to write: key, vector, metadata projection and display document
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub key: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
    pub document: String,
}

/// A record read back without its vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,
    pub metadata: RecordMetadata,
    pub document: String,
}

/// A nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub key: String,
    pub distance: f32,
    pub metadata: RecordMetadata,
    pub document: String,
}

/// Metadata restriction applied to reads, queries and deletes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub repo: Option<String>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn repo(repo: impl Into<String>) -> Self {
        Self {
            repo: Some(repo.into()),
        }
    }

    pub fn matches(&self, metadata: &RecordMetadata) -> bool {
        self.repo.as_deref().is_none_or(|repo| metadata.repo == repo)
    }
}

/// Trait for vector store operations
///
/// A store holds one collection of records keyed by fingerprint. Writes go in whole
/// batches; query results come back nearest first.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist yet
    async fn initialize(&self, dimension: usize) -> Result<()>;

    /// Insert records, replacing any with the same key. Returns the number written.
    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<usize>;

    /// Read records matching the filter, up to `limit`
    async fn get(&self, filter: &RecordFilter, limit: Option<usize>) -> Result<Vec<StoredEntry>>;

    /// Keys of all records matching the filter
    async fn keys(&self, filter: &RecordFilter) -> Result<HashSet<String>> {
        Ok(self
            .get(filter, None)
            .await?
            .into_iter()
            .map(|entry| entry.key)
            .collect())
    }

    /// Up to `k` records nearest to `vector`, nearest first
    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &RecordFilter,
    ) -> Result<Vec<QueryMatch>>;

    /// Delete records by key. Returns the number removed.
    async fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Delete every record matching the filter. Returns the number removed.
    async fn delete_matching(&self, filter: &RecordFilter) -> Result<usize> {
        let keys: Vec<String> = self.keys(filter).await?.into_iter().collect();
        if keys.is_empty() {
            return Ok(0);
        }
        self.delete(&keys).await
    }

    /// Total number of records
    async fn count(&self) -> Result<usize>;

    /// Remove every record, keeping the collection usable
    async fn clear(&self) -> Result<()>;

    fn distance_metric(&self) -> DistanceMetric;

    fn collection_name(&self) -> &str;
}

/// Quote a value for use inside a store filter expression
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Build the store named in the configuration
pub async fn create_store(config: &VectorDbConfig) -> Result<Arc<dyn VectorStore>, RagError> {
    match config.backend.as_str() {
        "lancedb" => {
            let db = LanceVectorDB::with_path(&config.lancedb_path, &config.collection_name)
                .await
                .map_err(|e| VectorDbError::InitializationFailed(format!("{:#}", e)))?;
            Ok(Arc::new(db))
        }
        "memory" => Ok(Arc::new(InMemoryVectorStore::new(&config.collection_name))),
        other => Err(VectorDbError::InitializationFailed(format!(
            "unknown vector database backend '{}'",
            other
        ))
        .into()),
    }
}
