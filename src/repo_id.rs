//! Repository identity
//!
//! A repository identity is an opaque string used as the `repo` metadata field
//! that partitions the collection. It is validated once at the edge so the rest of
//! the pipeline can embed it in store filters without escaping surprises.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_REPO_ID_LEN: usize = 256;

/// Validated repository identity (e.g. `owner/repo`, `owner/repo@branch`, a URL, or a bare name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId(String);

impl RepoId {
    /// Parse and validate a repository identifier
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let id = raw.trim();
        let invalid = |reason: &str| ValidationError::InvalidRepoId {
            id: raw.to_string(),
            reason: reason.to_string(),
        };

        if id.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if id.len() > MAX_REPO_ID_LEN {
            return Err(invalid("must be at most 256 bytes"));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("must not contain whitespace or control characters"));
        }
        if id.contains(['\'', '"', '\\']) {
            return Err(invalid("must not contain quotes or backslashes"));
        }
        if id.starts_with('@') || id.ends_with('@') || id.matches('@').count() > 1 {
            return Err(invalid("branch suffix must look like 'name@branch'"));
        }

        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier without the `@branch` suffix
    fn base(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// Branch named by an `@branch` suffix, if any
    pub fn branch(&self) -> Option<&str> {
        self.0.split_once('@').map(|(_, branch)| branch)
    }

    /// Owner segment for `owner/repo` and URL forms
    pub fn owner(&self) -> Option<&str> {
        let segments = self.path_segments();
        if segments.len() >= 2 {
            Some(segments[segments.len() - 2])
        } else {
            None
        }
    }

    /// Repository name (last path segment, `.git` suffix removed)
    pub fn name(&self) -> &str {
        self.path_segments()
            .last()
            .map(|s| s.trim_end_matches(".git"))
            .unwrap_or_else(|| self.base())
    }

    fn path_segments(&self) -> Vec<&str> {
        let base = self.base();
        let path = match base.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
            None => base,
        };
        path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RepoId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.0
    }
}

impl AsRef<str> for RepoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_repo() {
        let id = RepoId::parse("facebook/react").unwrap();
        assert_eq!(id.as_str(), "facebook/react");
        assert_eq!(id.owner(), Some("facebook"));
        assert_eq!(id.name(), "react");
        assert_eq!(id.branch(), None);
    }

    #[test]
    fn test_parse_with_branch() {
        let id = RepoId::parse("vercel/next.js@canary").unwrap();
        assert_eq!(id.owner(), Some("vercel"));
        assert_eq!(id.name(), "next.js");
        assert_eq!(id.branch(), Some("canary"));
    }

    #[test]
    fn test_parse_url() {
        let id = RepoId::parse("https://github.com/owner/tool.git").unwrap();
        assert_eq!(id.owner(), Some("owner"));
        assert_eq!(id.name(), "tool");
    }

    #[test]
    fn test_parse_bare_name() {
        let id = RepoId::parse("  jolly-sections ").unwrap();
        assert_eq!(id.as_str(), "jolly-sections");
        assert_eq!(id.owner(), None);
        assert_eq!(id.name(), "jolly-sections");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(RepoId::parse("").is_err());
        assert!(RepoId::parse("   ").is_err());
        assert!(RepoId::parse("owner/re po").is_err());
        assert!(RepoId::parse("owner/repo'; drop").is_err());
        assert!(RepoId::parse("owner/repo@").is_err());
        assert!(RepoId::parse("@main").is_err());
        assert!(RepoId::parse("a@b@c").is_err());
        assert!(RepoId::parse(&"x".repeat(300)).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let ok: RepoId = serde_json::from_str("\"owner/repo\"").unwrap();
        assert_eq!(ok.as_str(), "owner/repo");

        let bad: Result<RepoId, _> = serde_json::from_str("\"owner repo\"");
        assert!(bad.is_err());
    }
}
