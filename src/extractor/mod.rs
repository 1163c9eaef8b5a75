//! Structural section extraction
//!
//! Walks a source tree, applies the pattern registry to every eligible file and bounds
//! each match with an [`ExtentFinder`]. Files without any match still produce a single
//! whole-file section so that no non-empty file disappears from the index.

mod extent;
mod file_walker;
mod patterns;

pub use extent::{BraceBalanceExtent, Extent, ExtentFinder};
pub use file_walker::{FileWalker, SourceFile};
pub use patterns::{PatternMatch, PatternRegistry, PatternRule};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::types::{Section, SectionKind};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// Appended to any body cut at the character cap
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Sections found under a root plus scan counters
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutput {
    pub sections: Vec<Section>,
    /// Eligible files found by the walk
    pub files_scanned: usize,
    /// Eligible files that could not be read or whose extraction panicked
    pub files_failed: usize,
}

/// Cut `text` to at most `max_chars` characters, marker included
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return text.chars().take(max_chars).collect();
    }
    let keep = max_chars - marker_chars;
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

#[derive(Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    registry: Arc<PatternRegistry>,
    extent_finder: Arc<dyn ExtentFinder>,
}

impl Extractor {
    /// Extractor with the built-in registry and brace-balance extents
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractionError> {
        Ok(Self {
            config,
            registry: Arc::new(PatternRegistry::builtin()?),
            extent_finder: Arc::new(BraceBalanceExtent::default()),
        })
    }

    pub fn with_registry(mut self, registry: PatternRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_extent_finder(mut self, finder: impl ExtentFinder + 'static) -> Self {
        self.extent_finder = Arc::new(finder);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract sections from every eligible file under `root`
    ///
    /// Only a missing or non-directory root is an error. Unreadable files, and files whose
    /// extraction panics, are logged, skipped and counted in `files_failed`.
    /// Sections come out in file path order, then rule order within a file.
    pub fn extract_tree(&self, root: &Path) -> Result<ExtractionOutput, ExtractionError> {
        let files = FileWalker::new(root, &self.config).walk()?;
        let files_scanned = files.len();

        let per_file: Vec<Option<Vec<Section>>> = files
            .par_iter()
            .map(|file| {
                let bytes = match std::fs::read(&file.path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!("Error reading {}: {}", file.relative_path, e);
                        return None;
                    }
                };
                let content = String::from_utf8_lossy(&bytes);
                let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.extract_file(&file.relative_path, &content)
                }));
                match extracted {
                    Ok(sections) => {
                        if !sections.is_empty() {
                            tracing::debug!(
                                "Found {} sections in {}",
                                sections.len(),
                                file.relative_path
                            );
                        }
                        Some(sections)
                    }
                    Err(_) => {
                        tracing::warn!("Extraction panicked on {}, skipping", file.relative_path);
                        None
                    }
                }
            })
            .collect();

        let files_failed = per_file.iter().filter(|r| r.is_none()).count();
        let sections: Vec<Section> = per_file.into_iter().flatten().flatten().collect();

        tracing::info!(
            "Extracted {} sections from {} files ({} failed)",
            sections.len(),
            files_scanned,
            files_failed
        );

        Ok(ExtractionOutput {
            sections,
            files_scanned,
            files_failed,
        })
    }

    /// Extract sections from one file's content
    pub fn extract_file(&self, relative_path: &str, content: &str) -> Vec<Section> {
        let lines: Vec<&str> = content.split('\n').collect();
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let path = Path::new(relative_path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| relative_path.to_string());
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut sections = Vec::new();
        for hit in self.registry.find_matches(content) {
            let start_line = line_starts.partition_point(|&start| start <= hit.offset);
            let extent = self.extent_finder.find_extent(&lines, start_line);
            if extent.body.is_empty() {
                continue;
            }

            let name = match hit.name {
                Some(name) => name.to_string(),
                None => format!("{}_{}", stem, hit.kind),
            };

            let mut attributes = BTreeMap::new();
            attributes.insert("pattern_type".to_string(), hit.kind.to_string());
            attributes.insert("file_extension".to_string(), extension.clone());

            sections.push(Section {
                name,
                kind: hit.kind.clone(),
                file_path: relative_path.to_string(),
                start_line,
                end_line: extent.end_line.clamp(start_line, lines.len()),
                body: truncate_with_marker(&extent.body, self.config.max_section_chars),
                attributes,
            });
        }

        if sections.is_empty() && !content.trim().is_empty() {
            let mut attributes = BTreeMap::new();
            attributes.insert("file_extension".to_string(), extension);

            sections.push(Section {
                name: stem,
                kind: SectionKind::File,
                file_path: relative_path.to_string(),
                start_line: 1,
                end_line: lines.len(),
                body: truncate_with_marker(content, self.config.max_section_chars),
                attributes,
            });
        }

        sections
    }
}

#[cfg(test)]
mod tests;
