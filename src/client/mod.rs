//! Core library client for section-rag
//!
//! Composes the extractor, embedding provider, vector store, indexer and retriever
//! behind one handle that can be used directly as a library or wrapped by the CLI.

mod fs_lock;
mod repo_lock;

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, create_provider};
use crate::error::{IndexingError, RagError, ValidationError, VectorDbError};
use crate::extractor::Extractor;
use crate::indexer::{IndexerConfig, SectionIndexer};
use crate::repo_id::RepoId;
use crate::retriever::Retriever;
use crate::types::*;
use crate::vector_db::{RecordFilter, StoredEntry, VectorStore, create_store};
use repo_lock::RepoLocks;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main client for interacting with the section index
///
/// # Example
///
/// ```no_run
/// use section_rag::{AnalyzeRequest, RagClient, SearchRequest};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = RagClient::new().await?;
///
///     let analyzed = client
///         .analyze_repository(AnalyzeRequest {
///             repo: "acme/storefront".to_string(),
///             path: "/path/to/checkout".to_string(),
///             force_refresh: false,
///         })
///         .await?;
///     println!("Indexed {} sections", analyzed.indexing.indexed);
///
///     let found = client
///         .search_sections(SearchRequest {
///             query: "add to cart button".to_string(),
///             repo: Some("acme/storefront".to_string()),
///             limit: 5,
///             min_score: 0.3,
///         })
///         .await?;
///     println!("{} results", found.results_count);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RagClient {
    pub(crate) config: Arc<Config>,
    pub(crate) embedding_provider: Arc<dyn EmbeddingProvider>,
    pub(crate) vector_db: Arc<dyn VectorStore>,
    pub(crate) extractor: Extractor,
    pub(crate) indexer: Arc<SectionIndexer>,
    pub(crate) retriever: Arc<Retriever>,
    locks: RepoLocks,
}

impl RagClient {
    /// Create a client from the default config file and environment
    pub async fn new() -> Result<Self, RagError> {
        let config = Config::new()?;
        Self::with_config(config).await
    }

    /// Create a client from an explicit configuration
    pub async fn with_config(config: Config) -> Result<Self, RagError> {
        config.validate()?;

        tracing::info!("Initializing section-rag client");
        tracing::debug!("Vector DB backend: {}", config.vector_db.backend);
        tracing::debug!(
            "Embedding provider: {} ({})",
            config.embedding.provider,
            config.embedding.model_name
        );

        let embedding_provider = create_provider(&config.embedding)?;
        let vector_db = create_store(&config.vector_db).await?;
        Self::with_components(config, embedding_provider, vector_db).await
    }

    /// Create a client around an already-built provider and store
    pub async fn with_components(
        config: Config,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorStore>,
    ) -> Result<Self, RagError> {
        if config.vector_db.distance != vector_db.distance_metric().as_str() {
            return Err(VectorDbError::UnsupportedMetric(
                vector_db.distance_metric().to_string(),
            )
            .into());
        }

        vector_db
            .initialize(embedding_provider.dimension())
            .await
            .map_err(|e| VectorDbError::InitializationFailed(format!("{:#}", e)))?;

        let extractor = Extractor::new(config.extraction.clone())?;
        let indexer = Arc::new(SectionIndexer::new(
            Arc::clone(&embedding_provider),
            Arc::clone(&vector_db),
            IndexerConfig::from_config(&config),
        ));
        let retriever = Arc::new(Retriever::new(
            Arc::clone(&embedding_provider),
            Arc::clone(&vector_db),
        ));
        let locks = RepoLocks::new(
            config.locks.lock_dir.clone(),
            Duration::from_secs(config.locks.wait_timeout_secs),
        );

        Ok(Self {
            config: Arc::new(config),
            embedding_provider,
            vector_db,
            extractor,
            indexer,
            retriever,
            locks,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_provider.dimension()
    }

    /// Extract and index a local source tree under a repository identity
    pub async fn analyze_repository(
        &self,
        request: AnalyzeRequest,
    ) -> Result<AnalyzeResponse, RagError> {
        let start = Instant::now();
        let repo = request.validate()?;
        let root = PathBuf::from(&request.path);
        if !root.exists() {
            return Err(ValidationError::PathNotFound(request.path.clone()).into());
        }

        let _guard = self.locks.acquire(&repo).await?;
        tracing::info!("Analyzing {} at {}", repo, root.display());

        let sections_purged = if request.force_refresh {
            self.vector_db
                .delete_matching(&RecordFilter::repo(repo.as_str()))
                .await
                .map_err(|e| VectorDbError::DeleteFailed(format!("{:#}", e)))?
        } else {
            0
        };

        let extractor = self.extractor.clone();
        let output = tokio::task::spawn_blocking(move || extractor.extract_tree(&root))
            .await
            .map_err(|e| IndexingError::ExtractionTaskFailed(e.to_string()))??;

        tracing::info!(
            "Extracted {} sections from {} files ({} unreadable)",
            output.sections.len(),
            output.files_scanned,
            output.files_failed
        );

        let indexing = self.indexer.index(&repo, &output.sections).await;
        let summary = RepositorySummary::from_sections(repo.as_str(), &output.sections);

        Ok(AnalyzeResponse {
            repo: repo.to_string(),
            files_scanned: output.files_scanned,
            sections_found: output.sections.len(),
            sections_purged,
            indexing,
            summary,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Semantic search over indexed sections
    pub async fn search_sections(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResponse, RagError> {
        let start = Instant::now();
        let repo = request.validate()?;

        let results = self
            .retriever
            .search(&request.query, repo.as_ref(), request.limit, request.min_score)
            .await;

        Ok(SearchResponse {
            query: request.query,
            repo_filter: repo.map(|r| r.to_string()),
            results_count: results.len(),
            results,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Stored sections of one repository
    ///
    /// Store failures are logged and produce an empty list.
    pub async fn repository_sections(
        &self,
        repo: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredEntry>, RagError> {
        let repo = RepoId::parse(repo)?;
        match self
            .vector_db
            .get(&RecordFilter::repo(repo.as_str()), limit)
            .await
        {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::error!("Error getting sections for {}: {:#}", repo, e);
                Ok(vec![])
            }
        }
    }

    /// Structural overview of a repository's stored sections
    pub async fn repository_summary(&self, repo: &str) -> Result<RepositorySummary, RagError> {
        let repo = RepoId::parse(repo)?;
        let entries = self.repository_sections(repo.as_str(), None).await?;
        Ok(RepositorySummary::from_metadata(
            repo.as_str(),
            entries.iter().map(|e| &e.metadata),
        ))
    }

    /// Delete every record of a repository
    pub async fn delete_repository(&self, repo: &str) -> Result<ClearResponse, RagError> {
        let repo = RepoId::parse(repo)?;
        let _guard = self.locks.acquire(&repo).await?;

        Ok(
            match self
                .vector_db
                .delete_matching(&RecordFilter::repo(repo.as_str()))
                .await
            {
                Ok(deleted) => {
                    tracing::info!("Deleted {} sections for {}", deleted, repo);
                    ClearResponse {
                        success: true,
                        sections_deleted: deleted,
                        message: format!("Deleted {} sections for {}", deleted, repo),
                    }
                }
                Err(e) => {
                    tracing::error!("Error deleting sections for {}: {:#}", repo, e);
                    ClearResponse {
                        success: false,
                        sections_deleted: 0,
                        message: format!("Failed to delete sections for {}: {:#}", repo, e),
                    }
                }
            },
        )
    }

    /// Remove every record from the collection
    pub async fn clear_all(&self) -> ClearResponse {
        let before = self.vector_db.count().await.unwrap_or(0);
        match self.vector_db.clear().await {
            Ok(()) => {
                tracing::info!("Cleared all data from collection");
                ClearResponse {
                    success: true,
                    sections_deleted: before,
                    message: "Cleared all sections".to_string(),
                }
            }
            Err(e) => {
                tracing::error!("Error clearing collection: {:#}", e);
                ClearResponse {
                    success: false,
                    sections_deleted: 0,
                    message: format!("Failed to clear collection: {:#}", e),
                }
            }
        }
    }

    /// Collection-wide counts
    pub async fn statistics(&self) -> Result<StoreStatistics, RagError> {
        let total_sections = self
            .vector_db
            .count()
            .await
            .map_err(|e| VectorDbError::QueryFailed(format!("{:#}", e)))?;
        let entries = self
            .vector_db
            .get(&RecordFilter::all(), None)
            .await
            .map_err(|e| VectorDbError::QueryFailed(format!("{:#}", e)))?;

        let repositories: Vec<String> = entries
            .into_iter()
            .map(|e| e.metadata.repo)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(StoreStatistics {
            total_sections,
            repository_count: repositories.len(),
            repositories,
            collection_name: self.vector_db.collection_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests;
