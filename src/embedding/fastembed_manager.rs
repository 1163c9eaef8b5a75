use super::{EmbeddingProvider, check_dimension};
use crate::error::EmbeddingError;
use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// FastEmbed-based local embedding provider (all-MiniLM-L6-v2 by default)
///
/// Inference is CPU-bound and needs exclusive access to the model, so every call runs on
/// the blocking pool and takes the model lock there.
pub struct FastEmbedManager {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2)
    }

    /// Create a manager from a configured model name
    pub fn from_model_name(name: &str) -> Result<Self> {
        let model = match name {
            "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                EmbeddingModel::AllMiniLML6V2
            }
            "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
                EmbeddingModel::AllMiniLML12V2
            }
            "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            other => anyhow::bail!("Unsupported FastEmbed model: {}", other),
        };
        Self::with_model(model)
    }

    /// Create a new FastEmbedManager with a specific model
    pub fn with_model(model: EmbeddingModel) -> Result<Self> {
        tracing::info!("Initializing FastEmbed model: {:?}", model);

        let (dimension, model_name) = match model {
            EmbeddingModel::AllMiniLML6V2 => (384, "all-MiniLM-L6-v2"),
            EmbeddingModel::AllMiniLML12V2 => (384, "all-MiniLM-L12-v2"),
            EmbeddingModel::BGEBaseENV15 => (768, "bge-base-en-v1.5"),
            EmbeddingModel::BGESmallENV15 => (384, "bge-small-en-v1.5"),
            _ => (384, "unknown"),
        };

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = true;

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Arc::new(Mutex::new(embedding_model)),
            dimension,
            model_name: model_name.to_string(),
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let model = Arc::clone(&self.model);
        let embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let mut guard = model
                .lock()
                .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;
            guard
                .embed(texts, None)
                .context("Failed to generate embeddings")
        })
        .await
        .context("Embedding task panicked")??;

        for vector in &embeddings {
            check_dimension(self.dimension, vector)?;
        }
        Ok(embeddings)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FastEmbedManager {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::GenerationFailed("empty model output".into()).into())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
