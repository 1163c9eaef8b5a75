use super::{EmbeddingProvider, check_dimension};
use crate::error::EmbeddingError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Embedding provider for OpenAI-compatible `/embeddings` endpoints
///
/// Works against the hosted OpenAI API and against local servers exposing the same
/// route, such as Ollama's `/v1`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimension: usize,
    timeout_secs: u64,
}

impl fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: Option<String>,
        mut base_url: String,
        model: String,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self> {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let timeout_secs = timeout_secs.max(1);
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("section-rag/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            dimension,
            timeout_secs,
        })
    }

    /// Output dimension of well-known embedding models
    pub fn known_dimension(model: &str) -> Option<usize> {
        match model {
            "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
            "text-embedding-3-large" => Some(3072),
            "nomic-embed-text" => Some(768),
            "mxbai-embed-large" => Some(1024),
            "all-minilm" => Some(384),
            _ => None,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            input: inputs,
            model: &self.model,
        };

        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(EmbeddingError::Timeout(self.timeout_secs).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Embedding request failed")),
        };
        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read embedding response")?;

        if !status.is_success() {
            tracing::error!("Embedding API error {status}: {text}");
            anyhow::bail!("Embedding request failed (status {status})");
        }

        let mut resp: EmbeddingResponse =
            serde_json::from_str(&text).context("Invalid embedding response")?;
        resp.data.sort_by_key(|d| d.index.unwrap_or(0));

        if resp.data.len() != inputs.len() {
            anyhow::bail!(
                "Embedding response has {} vectors for {} inputs",
                resp.data.len(),
                inputs.len()
            );
        }

        let vectors: Vec<Vec<f32>> = resp.data.into_iter().map(|d| d.embedding).collect();
        for vector in &vectors {
            check_dimension(self.dimension, vector)?;
        }
        Ok(vectors)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])
            .await?
            .pop()
            .context("Embedding response was empty")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
