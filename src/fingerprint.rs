//! Stable identity keys for sections
//!
//! A key is a SHA-256 digest over the repository identity, location, name and a content
//! hash of the section. Fields are joined with a unit separator so that shifting text
//! between adjacent fields always changes the digest.

use crate::repo_id::RepoId;
use crate::types::{Section, SectionKind};
use sha2::{Digest, Sha256};

const FIELD_SEPARATOR: &[u8] = b"\x1f";

fn digest_fields(fields: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(FIELD_SEPARATOR);
        }
        hasher.update(field);
    }
    format!("{:x}", hasher.finalize())
}

/// Hash of a section's body, kind and line range
pub fn content_hash(body: &str, kind: &SectionKind, start_line: usize, end_line: usize) -> String {
    digest_fields(&[
        body.as_bytes(),
        kind.as_str().as_bytes(),
        start_line.to_string().as_bytes(),
        end_line.to_string().as_bytes(),
    ])
}

/// Identity key for a section within a repository
pub fn fingerprint(
    repo: &str,
    file_path: &str,
    name: &str,
    start_line: usize,
    end_line: usize,
    content_hash: &str,
) -> String {
    digest_fields(&[
        repo.as_bytes(),
        file_path.as_bytes(),
        name.as_bytes(),
        start_line.to_string().as_bytes(),
        end_line.to_string().as_bytes(),
        content_hash.as_bytes(),
    ])
}

/// Identity key of `section` when filed under `repo`
pub fn section_key(repo: &RepoId, section: &Section) -> String {
    let hash = content_hash(
        &section.body,
        &section.kind,
        section.start_line,
        section.end_line,
    );
    fingerprint(
        repo.as_str(),
        &section.file_path,
        &section.name,
        section.start_line,
        section.end_line,
        &hash,
    )
}
