//! Query normalization: stop-word removal and abbreviation expansion

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
    "it", "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("auth", "authentication"),
    ("config", "configuration"),
    ("ctx", "context"),
    ("db", "database"),
    ("func", "function"),
    ("impl", "implementation"),
    ("params", "parameters"),
    ("props", "properties"),
    ("repo", "repository"),
    ("res", "response"),
    ("req", "request"),
    ("util", "utility"),
    ("btn", "button"),
    ("msg", "message"),
    ("init", "initialize"),
    ("async", "asynchronous"),
];

fn expansion(word: &str) -> Option<&'static str> {
    ABBREVIATIONS
        .iter()
        .find(|(short, _)| *short == word)
        .map(|(_, long)| *long)
}

/// Keep word characters, whitespace, `-` and `_`
fn strip_punctuation(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect()
}

/// Rewrite a free-text query for embedding
///
/// Lower-cases and trims, drops short stop words, and appends the expansion after any
/// known abbreviation. Falls back to the normalized query when nothing survives.
pub fn preprocess_query(query: &str) -> String {
    let normalized = query.to_lowercase().trim().to_string();

    let mut words: Vec<String> = Vec::new();
    for raw in normalized.split_whitespace() {
        let word = strip_punctuation(raw);
        if word.is_empty() {
            continue;
        }
        if let Some(long) = expansion(&word) {
            words.push(word);
            words.push(long.to_string());
        } else if !STOP_WORDS.contains(&word.as_str()) || word.chars().count() > 3 {
            words.push(word);
        }
    }

    let processed = words.join(" ");
    if processed.is_empty() {
        return normalized;
    }
    if processed != normalized {
        tracing::debug!("Query preprocessing: '{}' -> '{}'", normalized, processed);
    }
    processed
}
