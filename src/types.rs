use crate::error::ValidationError;
use crate::repo_id::RepoId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of structural excerpt a section represents
///
/// The built-in kinds mirror the default pattern registry. Rules registered by library
/// users may introduce their own kinds, which round-trip through [`SectionKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionKind {
    CssClass,
    CssId,
    CssKeyframes,
    ScssMixin,
    ScssFunction,
    LiquidSection,
    LiquidBlock,
    ReactComponent,
    Function,
    Class,
    Interface,
    /// Whole-file fallback section
    File,
    Custom(String),
}

impl SectionKind {
    pub fn as_str(&self) -> &str {
        match self {
            SectionKind::CssClass => "css_class",
            SectionKind::CssId => "css_id",
            SectionKind::CssKeyframes => "css_keyframes",
            SectionKind::ScssMixin => "scss_mixin",
            SectionKind::ScssFunction => "scss_function",
            SectionKind::LiquidSection => "liquid_section",
            SectionKind::LiquidBlock => "liquid_block",
            SectionKind::ReactComponent => "react_component",
            SectionKind::Function => "function",
            SectionKind::Class => "class",
            SectionKind::Interface => "interface",
            SectionKind::File => "file",
            SectionKind::Custom(name) => name,
        }
    }
}

impl From<&str> for SectionKind {
    fn from(value: &str) -> Self {
        match value {
            "css_class" => SectionKind::CssClass,
            "css_id" => SectionKind::CssId,
            "css_keyframes" => SectionKind::CssKeyframes,
            "scss_mixin" => SectionKind::ScssMixin,
            "scss_function" => SectionKind::ScssFunction,
            "liquid_section" => SectionKind::LiquidSection,
            "liquid_block" => SectionKind::LiquidBlock,
            "react_component" => SectionKind::ReactComponent,
            "function" => SectionKind::Function,
            "class" => SectionKind::Class,
            "interface" => SectionKind::Interface,
            "file" => SectionKind::File,
            other => SectionKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for SectionKind {
    fn from(value: String) -> Self {
        SectionKind::from(value.as_str())
    }
}

impl From<SectionKind> for String {
    fn from(kind: SectionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed, line-bounded excerpt of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Identifier captured by the matching rule, or a synthesized fallback
    pub name: String,
    pub kind: SectionKind,
    /// File path relative to the tree root
    pub file_path: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    /// Excerpt text, capped in length
    pub body: String,
    /// Auxiliary facts (file extension, matched rule, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Section {
    /// Text handed to the embedding provider for this section
    pub fn embedding_context(&self) -> String {
        format!(
            "File: {}\nType: {}\nName: {}\nCode:\n{}",
            self.file_path, self.kind, self.name, self.body
        )
    }
}

/// Metadata stored with each indexed section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Repository identity; the logical partition of the collection
    pub repo: String,
    pub file_path: String,
    pub name: String,
    pub kind: SectionKind,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Unix timestamp when indexed
    pub indexed_at: i64,
}

impl RecordMetadata {
    pub fn from_section(repo: &RepoId, section: &Section, indexed_at: i64) -> Self {
        Self {
            repo: repo.to_string(),
            file_path: section.file_path.clone(),
            name: section.name.clone(),
            kind: section.kind.clone(),
            start_line: section.start_line,
            end_line: section.end_line,
            attributes: section.attributes.clone(),
            indexed_at,
        }
    }
}

/// Counts reported by an indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Sections embedded and stored during this run
    pub indexed: usize,
    /// Sections whose fingerprint was already known
    pub skipped: usize,
    /// Sections lost to embedding or store failures
    pub errors: usize,
    /// Sections submitted
    pub total: usize,
    /// Records in the collection after the run
    pub collection_size: usize,
}

/// A single search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Fingerprint of the matched section
    pub key: String,
    /// Cosine similarity in [0, 1], rounded to 4 decimals
    pub score: f32,
    pub metadata: RecordMetadata,
    /// Stored display text
    pub document: String,
}

/// Request to extract and index a local source tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Repository identity the sections are filed under
    pub repo: String,
    /// Root directory of the already-fetched source tree
    pub path: String,
    /// Purge the repository's existing records before indexing
    #[serde(default)]
    pub force_refresh: bool,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<RepoId, ValidationError> {
        let repo = RepoId::parse(&self.repo)?;
        if self.path.trim().is_empty() {
            return Err(ValidationError::Empty("path".to_string()));
        }
        Ok(repo)
    }
}

/// Response from analyzing a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub repo: String,
    /// Eligible files that were read
    pub files_scanned: usize,
    pub sections_found: usize,
    /// Records removed before indexing (force refresh only)
    pub sections_purged: usize,
    pub indexing: IndexSummary,
    pub summary: RepositorySummary,
    pub duration_ms: u64,
}

/// Request to search indexed sections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Optional repository filter
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum similarity score (0.0 to 1.0)
    #[serde(default)]
    pub min_score: f32,
}

fn default_limit() -> usize {
    10
}

impl SearchRequest {
    pub fn validate(&self) -> Result<Option<RepoId>, ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::Empty("query".to_string()));
        }
        if self.limit == 0 {
            return Err(ValidationError::ConstraintViolation {
                field: "limit".to_string(),
                constraint: "greater than 0".to_string(),
                actual: self.limit.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ValidationError::ConstraintViolation {
                field: "min_score".to_string(),
                constraint: "between 0.0 and 1.0".to_string(),
                actual: self.min_score.to_string(),
            });
        }
        self.repo.as_deref().map(RepoId::parse).transpose()
    }
}

/// Response from a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub repo_filter: Option<String>,
    pub results_count: usize,
    pub results: Vec<SearchResult>,
    pub duration_ms: u64,
}

/// Maximum number of files listed in a repository summary
const SUMMARY_FILE_LIMIT: usize = 20;

/// Structural overview of a repository's indexed sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub repository: String,
    pub total_sections: usize,
    pub files_analyzed: usize,
    /// Section count per kind
    pub section_types: BTreeMap<String, usize>,
    /// Section names per file, first files by path order
    pub file_structure: BTreeMap<String, Vec<String>>,
}

impl RepositorySummary {
    /// Build a summary from (file path, kind, name) triples
    pub fn build<'a, I>(repository: &str, sections: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a SectionKind, &'a str)>,
    {
        let mut by_file: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut section_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_sections = 0;

        for (file_path, kind, name) in sections {
            total_sections += 1;
            by_file
                .entry(file_path.to_string())
                .or_default()
                .push(name.to_string());
            *section_types.entry(kind.to_string()).or_insert(0) += 1;
        }

        let files_analyzed = by_file.len();
        let file_structure = by_file.into_iter().take(SUMMARY_FILE_LIMIT).collect();

        Self {
            repository: repository.to_string(),
            total_sections,
            files_analyzed,
            section_types,
            file_structure,
        }
    }

    pub fn from_sections(repository: &str, sections: &[Section]) -> Self {
        Self::build(
            repository,
            sections
                .iter()
                .map(|s| (s.file_path.as_str(), &s.kind, s.name.as_str())),
        )
    }

    pub fn from_metadata<'a>(
        repository: &str,
        metadata: impl IntoIterator<Item = &'a RecordMetadata>,
    ) -> Self {
        Self::build(
            repository,
            metadata
                .into_iter()
                .map(|m| (m.file_path.as_str(), &m.kind, m.name.as_str())),
        )
    }
}

/// Statistics about the whole collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_sections: usize,
    /// Distinct repository identities, sorted
    pub repositories: Vec<String>,
    pub repository_count: usize,
    pub collection_name: String,
}

/// Response from purging a repository or clearing the collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub sections_deleted: usize,
    pub message: String,
}
