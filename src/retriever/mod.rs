//! Semantic retrieval over indexed sections

mod query;

pub use query::preprocess_query;

use crate::embedding::EmbeddingProvider;
use crate::error::VectorDbError;
use crate::repo_id::RepoId;
use crate::types::SearchResult;
use crate::vector_db::{DistanceMetric, RecordFilter, VectorStore};
use anyhow::Result;
use std::sync::Arc;

/// Convert a cosine distance to a similarity score rounded to 4 decimals
///
/// Returns `None` for non-finite distances.
pub fn distance_to_score(distance: f32) -> Option<f32> {
    if !distance.is_finite() {
        return None;
    }
    let score = (1.0 - distance).min(1.0);
    Some((score * 10_000.0).round() / 10_000.0)
}

pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    /// Search indexed sections, nearest first
    ///
    /// Never fails: any error is logged and yields an empty list.
    pub async fn search(
        &self,
        query: &str,
        repo_filter: Option<&RepoId>,
        limit: usize,
        min_score: f32,
    ) -> Vec<SearchResult> {
        match self.try_search(query, repo_filter, limit, min_score).await {
            Ok(results) => {
                tracing::info!(
                    "Search found {} results for query: {}",
                    results.len(),
                    query.chars().take(50).collect::<String>()
                );
                results
            }
            Err(e) => {
                tracing::error!("Error searching sections: {:#}", e);
                vec![]
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        repo_filter: Option<&RepoId>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let metric = self.store.distance_metric();
        if metric != DistanceMetric::Cosine {
            return Err(VectorDbError::UnsupportedMetric(metric.to_string()).into());
        }

        let processed = preprocess_query(query);
        let vector = self.provider.embed(&processed).await?;

        let filter = RecordFilter {
            repo: repo_filter.map(|r| r.to_string()),
        };
        let matches = self.store.query(vector, limit, &filter).await?;

        // Scores are reported in [0, 1] whatever threshold the caller passes
        let threshold = if min_score.is_finite() {
            min_score.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(matches
            .into_iter()
            .filter_map(|m| {
                let similarity = 1.0 - m.distance;
                if !similarity.is_finite() || similarity < threshold {
                    return None;
                }
                Some(SearchResult {
                    key: m.key,
                    score: distance_to_score(m.distance)?,
                    metadata: m.metadata,
                    document: m.document,
                })
            })
            .collect())
    }
}
