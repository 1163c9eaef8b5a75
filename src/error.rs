/// Centralized error types for section-rag using thiserror
///
/// Component failures inside the pipeline are recovered and counted; these types
/// surface the failures that do reach a caller (validation, configuration, setup).
use thiserror::Error;

/// Main error type for the section indexing system
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to walking a tree and extracting sections
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Root directory not found: {0}")]
    RootNotFound(String),

    #[error("Root path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid pattern for kind '{kind}': {reason}")]
    InvalidPattern { kind: String, reason: String },
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Embedding generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unknown embedding provider: {0}")]
    UnknownProvider(String),

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to vector database operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Failed to initialize vector database: {0}")]
    InitializationFailed(String),

    #[error("Failed to query records: {0}")]
    QueryFailed(String),

    #[error("Failed to delete records: {0}")]
    DeleteFailed(String),

    #[error("Unsupported distance metric '{0}': similarity scores assume cosine distance")]
    UnsupportedMetric(String),

    #[error("Database is not initialized")]
    NotInitialized,
}

/// Errors related to indexing runs
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Repository '{0}' is being indexed by another process")]
    RepositoryLocked(String),

    #[error("Timed out after {secs}s waiting for the index lock on '{repo}'")]
    LockTimeout { repo: String, secs: u64 },

    #[error("Extraction task failed: {0}")]
    ExtractionTaskFailed(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid repository identifier '{id}': {reason}")]
    InvalidRepoId { id: String, reason: String },

    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("{field} must be {constraint}, got {actual}")]
    ConstraintViolation {
        field: String,
        constraint: String,
        actual: String,
    },

    #[error("Empty {0}")]
    Empty(String),
}

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}

impl RagError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RagError::Other(msg.into())
    }

    /// Check if this is a caller error (validation, bad config value) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RagError::Validation(_) | RagError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::Embedding(EmbeddingError::Timeout(_))
                | RagError::Indexing(IndexingError::RepositoryLocked(_))
                | RagError::Indexing(IndexingError::LockTimeout { .. })
                | RagError::Io(_)
        )
    }
}
