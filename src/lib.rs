//! # section-rag - Structural Section Indexing and Semantic Search
//!
//! Turns heterogeneous source trees (stylesheets, templates, component code) into a
//! searchable semantic index of named, typed, line-bounded sections.
//!
//! ## Overview
//!
//! Each eligible file is scanned with a registry of regular-expression rules. Every match
//! becomes a [`types::Section`] whose extent is bounded by brace balancing. Sections are
//! fingerprinted, embedded and stored in a vector collection partitioned by repository
//! identity, so re-analyzing an unchanged tree costs no embedding calls.
//!
//! ## Key Features
//!
//! - **Pattern Extraction**: CSS/SCSS rules, Liquid sections and blocks, React components,
//!   functions, classes and interfaces, with a whole-file fallback
//! - **Idempotent Indexing**: content-addressed fingerprints, bounded-concurrency embedding
//! - **Semantic Search**: query rewriting with stop-word removal and abbreviation expansion
//! - **Pluggable Backends**: LanceDB (embedded, default) or an in-memory store; FastEmbed,
//!   OpenAI-compatible or hashed-trigram embeddings
//!
//! ## Architecture
//!
//! ```text
//!  source tree ──► Extractor ──► Sections ──► SectionIndexer ──► VectorStore
//!                  (patterns,                 (fingerprints,      (LanceDB /
//!                   extents)                   embed pool)         in-memory)
//!                                                                      ▲
//!  query ─────────► preprocess_query ──► EmbeddingProvider ──► Retriever
//! ```
//!
//! ## Modules
//!
//! - [`client`]: Library façade composing every component
//! - [`extractor`]: File walking, pattern registry and extent finding
//! - [`indexer`]: Fingerprint dedupe and concurrent embedding into the store
//! - [`retriever`]: Query preprocessing and ranked search
//! - [`embedding`]: Embedding providers
//! - [`vector_db`]: Vector store abstraction (LanceDB and in-memory)
//! - [`config`]: Configuration management with environment variable support
//! - [`types`]: Sections, metadata and request/response types
//! - [`error`]: Error types
//!
//! ## Usage Example
//!
//! ```no_run
//! use section_rag::{RagClient, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RagClient::new().await?;
//!     let response = client
//!         .search_sections(SearchRequest {
//!             query: "primary button".to_string(),
//!             repo: None,
//!             limit: 10,
//!             min_score: 0.0,
//!         })
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```

/// Library client composing extraction, indexing and retrieval
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding providers (FastEmbed, OpenAI-compatible, hashed trigrams)
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Structural section extraction
pub mod extractor;

/// Content hashes and storage keys for sections
pub mod fingerprint;

/// Embedding and storing sections
pub mod indexer;

/// Platform-specific paths
pub mod paths;

/// Repository identity parsing
pub mod repo_id;

/// Query preprocessing and ranked search
pub mod retriever;

/// Sections, stored metadata and request/response types
pub mod types;

/// Vector store abstraction supporting LanceDB and an in-memory backend
pub mod vector_db;

pub use client::RagClient;
pub use config::Config;
pub use error::RagError;
pub use repo_id::RepoId;
pub use types::{
    AnalyzeRequest, AnalyzeResponse, ClearResponse, IndexSummary, RecordMetadata,
    RepositorySummary, SearchRequest, SearchResponse, SearchResult, Section, SectionKind,
    StoreStatistics,
};
