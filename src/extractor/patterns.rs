//! Pattern registry: section kind to an ordered list of regular expressions
//!
//! Rules are plain data. Matching is heuristic and line-agnostic; a rule's first capture
//! group, when present and non-empty, names the section.

use crate::error::ExtractionError;
use crate::types::SectionKind;
use regex::Regex;

/// Patterns shipped with the crate, in application order
const BUILTIN_RULES: &[(&str, &[&str])] = &[
    ("css_class", &[r"\.([a-zA-Z][\w-]*)\s*\{"]),
    ("css_id", &[r"#([a-zA-Z][\w-]*)\s*\{"]),
    ("css_keyframes", &[r"@keyframes\s+([a-zA-Z][\w-]*)"]),
    ("scss_mixin", &[r"@mixin\s+([a-zA-Z][\w-]*)"]),
    ("scss_function", &[r"@function\s+([a-zA-Z][\w-]*)"]),
    ("liquid_section", &[r"\{%\s*schema\s*%\}"]),
    (
        "liquid_block",
        &[
            r#"\{%\s*block\s+['"]?(\w+)['"]?"#,
            r"\{%\s*for\s+(\w+)\s+in",
            r"\{%\s*if\s+(\w+)",
        ],
    ),
    (
        "react_component",
        &[
            r"(?:export\s+)?(?:default\s+)?(?:const|let|var|function)\s+(\w+)\s*=\s*(?:\([^)]*\))?\s*(?::\s*\w+\s*)?=>\s*\{",
            r"(?:export\s+)?(?:default\s+)?function\s+(\w+)\s*\([^)]*\)\s*(?::\s*\w+\s*)?\{",
            r"(?:export\s+)?(?:default\s+)?class\s+(\w+)\s+extends\s+(?:React\.)?Component",
        ],
    ),
    (
        "function",
        &[
            r"(?:export\s+)?(?:async\s+)?function\s+(\w+)\s*\(",
            r"(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?\([^)]*\)\s*=>",
            r"def\s+(\w+)\s*\(",
            r"func\s+(\w+)\s*\(",
            r"fn\s+(\w+)\s*\(",
        ],
    ),
    (
        "class",
        &[
            r"(?:export\s+)?(?:default\s+)?class\s+(\w+)",
            r"class\s+(\w+)\s*(?:\([^)]*\))?:",
            r"type\s+(\w+)\s+struct",
            r"struct\s+(\w+)",
        ],
    ),
    (
        "interface",
        &[
            r"(?:export\s+)?interface\s+(\w+)",
            r"(?:export\s+)?type\s+(\w+)\s*=",
        ],
    ),
];

/// One kind and its compiled patterns
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub kind: SectionKind,
    pub patterns: Vec<Regex>,
}

/// A raw pattern hit inside a file's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch<'a> {
    pub kind: &'a SectionKind,
    /// Byte offset of the match start
    pub offset: usize,
    /// First capture group, if it participated and is non-empty
    pub name: Option<&'a str>,
}

/// Ordered collection of extraction rules
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    rules: Vec<PatternRule>,
}

impl PatternRegistry {
    /// Empty registry; every non-blank file then falls back to a whole-file section
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in stylesheet, template and code rules
    pub fn builtin() -> Result<Self, ExtractionError> {
        let mut registry = Self::empty();
        for (kind, patterns) in BUILTIN_RULES {
            registry = registry.with_rule(SectionKind::from(*kind), patterns)?;
        }
        Ok(registry)
    }

    /// Add patterns for a kind
    ///
    /// Patterns for a kind already present are appended to that rule, keeping its
    /// position; a new kind is applied after all existing ones.
    pub fn with_rule(
        mut self,
        kind: SectionKind,
        patterns: &[&str],
    ) -> Result<Self, ExtractionError> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("(?m){}", p)).map_err(|e| ExtractionError::InvalidPattern {
                    kind: kind.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match self.rules.iter_mut().find(|r| r.kind == kind) {
            Some(rule) => rule.patterns.extend(compiled),
            None => self.rules.push(PatternRule {
                kind,
                patterns: compiled,
            }),
        }
        Ok(self)
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All matches in rule order, then pattern order, then position
    ///
    /// Each pattern finds non-overlapping matches on its own; the same text may be
    /// reported by several patterns or rules.
    pub fn find_matches<'a>(&'a self, content: &'a str) -> Vec<PatternMatch<'a>> {
        let mut matches = Vec::new();
        for rule in &self.rules {
            for pattern in &rule.patterns {
                for caps in pattern.captures_iter(content) {
                    let Some(whole) = caps.get(0) else {
                        continue;
                    };
                    let name = caps
                        .get(1)
                        .map(|m| m.as_str())
                        .filter(|s| !s.is_empty());
                    matches.push(PatternMatch {
                        kind: &rule.kind,
                        offset: whole.start(),
                        name,
                    });
                }
            }
        }
        matches
    }
}
