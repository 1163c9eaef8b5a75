//! File walking and eligibility filtering

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An eligible file discovered under the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated
    pub relative_path: String,
    /// Extension without the leading dot
    pub extension: String,
}

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) extensions: HashSet<String>,
    pub(crate) skip_patterns: Vec<String>,
    pub(crate) excluded_dirs: Arc<HashSet<String>>,
    pub(crate) max_file_size: u64,
    pub(crate) respect_gitignore: bool,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>, config: &ExtractionConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            skip_patterns: config
                .skip_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            excluded_dirs: Arc::new(config.excluded_dirs.iter().cloned().collect()),
            max_file_size: config.max_file_size,
            respect_gitignore: config.respect_gitignore,
        }
    }

    /// Walk the directory and collect all eligible files, sorted by relative path
    pub fn walk(&self) -> Result<Vec<SourceFile>, ExtractionError> {
        if !self.root.exists() {
            return Err(ExtractionError::RootNotFound(
                self.root.display().to_string(),
            ));
        }
        if !self.root.is_dir() {
            return Err(ExtractionError::NotADirectory(
                self.root.display().to_string(),
            ));
        }

        let excluded = Arc::clone(&self.excluded_dirs);
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                // Prune excluded directories below the root
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir
                    && entry.depth() > 0
                    && excluded.contains(&*entry.file_name().to_string_lossy()))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if let Some(file) = self.eligible(path) {
                files.push(file);
            }
        }

        tracing::info!(
            "Found {} eligible files under {}",
            files.len(),
            self.root.display()
        );
        Ok(files)
    }

    /// Eligibility for a single file found by the walk
    pub(crate) fn eligible(&self, path: &Path) -> Option<SourceFile> {
        let extension = path.extension().and_then(|e| e.to_str())?;
        if !self.extensions.contains(extension) {
            return None;
        }

        let file_name = path.file_name()?.to_string_lossy().to_lowercase();
        if self.matches_skip_pattern(&file_name) {
            tracing::debug!("Skipping {:?}: matches skip pattern", path);
            return None;
        }

        match std::fs::metadata(path) {
            Ok(metadata) if metadata.len() > self.max_file_size => {
                tracing::debug!(
                    "Skipping {:?}: too large ({:.1} KB)",
                    path,
                    metadata.len() as f64 / 1024.0
                );
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Skipping {:?}: {}", path, e);
                return None;
            }
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if self.in_excluded_dir(relative) {
            return None;
        }

        Some(SourceFile {
            path: path.to_path_buf(),
            relative_path: relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            extension: extension.to_string(),
        })
    }

    pub(crate) fn matches_skip_pattern(&self, lowercase_name: &str) -> bool {
        self.skip_patterns
            .iter()
            .any(|pattern| lowercase_name.contains(pattern.as_str()))
    }

    /// Whether any directory component of a root-relative path is excluded
    pub(crate) fn in_excluded_dir(&self, relative: &Path) -> bool {
        relative
            .parent()
            .map(|dir| {
                dir.components()
                    .any(|c| self.excluded_dirs.contains(&*c.as_os_str().to_string_lossy()))
            })
            .unwrap_or(false)
    }
}
