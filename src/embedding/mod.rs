mod fastembed_manager;
mod hashed;
mod openai;

pub use fastembed_manager::FastEmbedManager;
pub use hashed::HashedEmbedder;
pub use openai::OpenAiEmbedder;

use crate::config::EmbeddingConfig;
use crate::error::{ConfigError, EmbeddingError, RagError};
use anyhow::Result;
use std::sync::Arc;

/// Trait for embedding generation
///
/// Implementations return vectors of a fixed length, [`EmbeddingProvider::dimension`].
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Check a produced vector against the provider's declared dimension
pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        }
        .into());
    }
    Ok(())
}

/// Build the provider named in the configuration
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    tracing::info!(
        "Creating embedding provider '{}' (model: {})",
        config.provider,
        config.model_name
    );

    match config.provider.as_str() {
        "fastembed" => {
            let manager = FastEmbedManager::from_model_name(&config.model_name)
                .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;
            Ok(Arc::new(manager))
        }
        "openai" => {
            let dimension = config
                .dimension
                .or_else(|| OpenAiEmbedder::known_dimension(&config.model_name))
                .ok_or_else(|| {
                    ConfigError::MissingRequired(format!(
                        "embedding.dimension for model '{}'",
                        config.model_name
                    ))
                })?;
            let embedder = OpenAiEmbedder::new(
                config.api_key.clone(),
                config.base_url.clone(),
                config.model_name.clone(),
                dimension,
                config.timeout_secs,
            )
            .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;
            Ok(Arc::new(embedder))
        }
        "hashed" => Ok(Arc::new(HashedEmbedder::new(
            config.dimension.unwrap_or(hashed::DEFAULT_DIMENSION),
        ))),
        other => Err(EmbeddingError::UnknownProvider(other.to_string()).into()),
    }
}
