/// Configuration system for section-rag
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base URL of the hosted OpenAI API; any other URL is treated as a self-hosted endpoint
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Vector database configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// File eligibility and section extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Indexing pipeline tuning
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Repository lock configuration
    #[serde(default)]
    pub locks: LockConfig,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Store backend: "lancedb" (persistent) or "memory"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Collection (table) name for section records
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Distance metric; similarity scores are only meaningful for "cosine"
    #[serde(default = "default_distance")]
    pub distance: String,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider: "fastembed", "openai" or "hashed"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name (e.g., "all-MiniLM-L6-v2", "text-embedding-3-small", "nomic-embed-text")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Base URL for OpenAI-compatible endpoints (OpenAI, Ollama's /v1)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key for the OpenAI provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Vector dimension for providers that cannot report it up front
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Timeout in seconds for a single embedding call
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// File eligibility and extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// File extensions to parse (without leading dot, case-sensitive)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Substrings of lower-cased file names marking generated artifacts
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,

    /// Directory names excluded anywhere below the root
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Maximum file size to parse (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum characters kept in a section body
    #[serde(default = "default_max_section_chars")]
    pub max_section_chars: usize,

    /// Honor .gitignore files below the root
    #[serde(default)]
    pub respect_gitignore: bool,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Sections per dedup/embed/upsert batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum embedding calls in flight within a batch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Character budget for embedding input
    #[serde(default = "default_max_embedding_chars")]
    pub max_embedding_chars: usize,

    /// Character cap for the stored display document
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,

    /// Log progress every N sections
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default minimum similarity score (0.0 to 1.0)
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Default result limit
    #[serde(default = "default_result_limit")]
    pub limit: usize,
}

/// Repository lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Directory holding cross-process lock files
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    /// How long to wait for another process to release a repository lock
    #[serde(default = "default_lock_wait_secs")]
    pub wait_timeout_secs: u64,
}

// Default value functions
fn default_db_backend() -> String {
    "lancedb".to_string()
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_collection_name() -> String {
    "codebase_sections".to_string()
}

fn default_distance() -> String {
    "cosine".to_string()
}

fn default_embedding_provider() -> String {
    "fastembed".to_string()
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_base_url() -> String {
    OPENAI_DEFAULT_BASE_URL.to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_extensions() -> Vec<String> {
    [
        "js", "jsx", "ts", "tsx", "py", "java", "go", "rs", "cpp", "c", "h", "hpp", "liquid",
        "html", "htm", "vue", "css", "scss", "sass", "less",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_patterns() -> Vec<String> {
    [
        ".min.js",
        ".min.css",
        ".min.html",
        ".chunk.js",
        ".bundle.js",
        "-min.js",
        "_min.js",
        ".production.js",
        ".prod.js",
        "bundle-",
        "chunk-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_dirs() -> Vec<String> {
    [
        "node_modules",
        ".git",
        "dist",
        "build",
        "coverage",
        "__pycache__",
        ".pytest_cache",
        "venv",
        ".venv",
        "vendor",
        "target",
        ".next",
        ".nuxt",
        "out",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_file_size() -> u64 {
    512_000 // 500 KB
}

fn default_max_section_chars() -> usize {
    5000
}

fn default_batch_size() -> usize {
    100
}

fn default_max_concurrency() -> usize {
    10
}

fn default_max_embedding_chars() -> usize {
    6000
}

fn default_max_document_chars() -> usize {
    4000
}

fn default_progress_interval() -> usize {
    500
}

fn default_min_score() -> f32 {
    0.0
}

fn default_result_limit() -> usize {
    10
}

fn default_lock_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_lock_dir()
}

fn default_lock_wait_secs() -> u64 {
    30
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            lancedb_path: default_lancedb_path(),
            collection_name: default_collection_name(),
            distance: default_distance(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model_name: default_model_name(),
            base_url: default_base_url(),
            api_key: None,
            dimension: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            skip_patterns: default_skip_patterns(),
            excluded_dirs: default_excluded_dirs(),
            max_file_size: default_max_file_size(),
            max_section_chars: default_max_section_chars(),
            respect_gitignore: false,
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
            max_embedding_chars: default_max_embedding_chars(),
            max_document_chars: default_max_document_chars(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            limit: default_result_limit(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_dir: default_lock_dir(),
            wait_timeout_secs: default_lock_wait_secs(),
        }
    }
}

fn must_be_positive(key: &str, value: usize) -> Result<(), RagError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "must be greater than 0".to_string(),
        }
        .into());
    }
    Ok(())
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.vector_db.backend != "lancedb" && self.vector_db.backend != "memory" {
            return Err(ConfigError::InvalidValue {
                key: "vector_db.backend".to_string(),
                reason: format!(
                    "must be 'lancedb' or 'memory', got '{}'",
                    self.vector_db.backend
                ),
            }
            .into());
        }

        if self.vector_db.distance != "cosine" {
            return Err(ConfigError::InvalidValue {
                key: "vector_db.distance".to_string(),
                reason: format!(
                    "only 'cosine' is supported (scores are 1 - distance), got '{}'",
                    self.vector_db.distance
                ),
            }
            .into());
        }

        if self.vector_db.collection_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "vector_db.collection_name".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        match self.embedding.provider.as_str() {
            "fastembed" | "hashed" => {}
            "openai" => {
                if self.embedding.api_key.is_none()
                    && self.embedding.base_url.trim_end_matches('/') == OPENAI_DEFAULT_BASE_URL
                {
                    return Err(ConfigError::MissingRequired(
                        "embedding.api_key (or OPENAI_API_KEY) for the hosted OpenAI endpoint"
                            .to_string(),
                    )
                    .into());
                }
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "embedding.provider".to_string(),
                    reason: format!("must be 'fastembed', 'openai' or 'hashed', got '{}'", other),
                }
                .into());
            }
        }

        if let Some(dimension) = self.embedding.dimension {
            must_be_positive("embedding.dimension", dimension)?;
        }
        if self.embedding.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.extraction.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.max_file_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        must_be_positive(
            "extraction.max_section_chars",
            self.extraction.max_section_chars,
        )?;

        must_be_positive("indexing.batch_size", self.indexing.batch_size)?;
        must_be_positive("indexing.max_concurrency", self.indexing.max_concurrency)?;
        must_be_positive(
            "indexing.max_embedding_chars",
            self.indexing.max_embedding_chars,
        )?;
        must_be_positive(
            "indexing.max_document_chars",
            self.indexing.max_document_chars,
        )?;
        must_be_positive("indexing.progress_interval", self.indexing.progress_interval)?;

        if !(0.0..=1.0).contains(&self.search.min_score) {
            return Err(ConfigError::InvalidValue {
                key: "search.min_score".to_string(),
                reason: format!("must be between 0.0 and 1.0, got {}", self.search.min_score),
            }
            .into());
        }
        must_be_positive("search.limit", self.search.limit)?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("SECTION_RAG_DB_BACKEND") {
            self.vector_db.backend = backend;
        }

        if let Ok(path) = std::env::var("SECTION_RAG_LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Ok(collection) = std::env::var("SECTION_RAG_COLLECTION") {
            self.vector_db.collection_name = collection;
        }

        if let Ok(provider) = std::env::var("SECTION_RAG_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("SECTION_RAG_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(url) = std::env::var("SECTION_RAG_EMBEDDING_BASE_URL") {
            self.embedding.base_url = url;
        }

        if let Ok(key) = std::env::var("SECTION_RAG_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            && !key.trim().is_empty()
        {
            self.embedding.api_key = Some(key);
        }

        if let Ok(batch_size) = std::env::var("SECTION_RAG_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.indexing.batch_size = size;
        }

        if let Ok(concurrency) = std::env::var("SECTION_RAG_MAX_CONCURRENCY")
            && let Ok(n) = concurrency.parse()
        {
            self.indexing.max_concurrency = n;
        }

        if let Ok(max_size) = std::env::var("SECTION_RAG_MAX_FILE_SIZE")
            && let Ok(size) = max_size.parse()
        {
            self.extraction.max_file_size = size;
        }

        if let Ok(min_score) = std::env::var("SECTION_RAG_MIN_SCORE")
            && let Ok(score) = min_score.parse()
        {
            self.search.min_score = score;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
