//! Fixed semantic and structural features.
//!
//! The last [`FEATURE_COUNT`] slots of every embedding are reserved for hand-picked signals
//! that survive vocabulary drift: how often a chunk talks about functions, errors, databases
//! and so on, and how dense its punctuation is. Values are capped to `[0, 1]` and accumulate
//! on top of whatever term weights landed in the same slots.

use crate::embeddings::EMBEDDING_DIMENSION;

/// Keyword groups. A word hit counts toward every group that lists it.
pub const KEYWORD_GROUPS: [&[&str]; 15] = [
    &["function", "def", "func", "fn", "method", "lambda"],
    &["class", "struct", "interface", "trait", "enum", "impl"],
    &["import", "require", "include", "use", "from", "export"],
    &["async", "await", "promise", "future", "then"],
    &["try", "catch", "except", "throw", "raise", "error", "finally"],
    &["database", "query", "sql", "select", "insert", "update", "delete", "table"],
    &["http", "request", "response", "api", "fetch", "endpoint", "route"],
    &["test", "assert", "expect", "mock", "describe", "it"],
    &["for", "while", "loop", "foreach", "map", "filter", "reduce"],
    &["if", "else", "switch", "case", "match", "when"],
    &["return", "yield", "break", "continue"],
    &["const", "let", "var", "static", "mut"],
    &["public", "private", "protected", "pub", "internal"],
    &["auth", "login", "logout", "password", "token", "session", "user"],
    &["file", "read", "write", "path", "stream", "buffer"],
];

/// Structural punctuation patterns, counted as non-overlapping substrings.
pub const STRUCTURAL_PATTERNS: [&[&str]; 7] = [
    &["{", "}"],
    &["(", ")"],
    &["[", "]"],
    &["=>"],
    &["."],
    &["::"],
    &["->"],
];

pub const FEATURE_COUNT: usize = KEYWORD_GROUPS.len() + STRUCTURAL_PATTERNS.len();
pub const KEYWORD_FEATURE_OFFSET: usize = EMBEDDING_DIMENSION - FEATURE_COUNT;
pub const STRUCTURAL_FEATURE_OFFSET: usize = KEYWORD_FEATURE_OFFSET + KEYWORD_GROUPS.len();

/// Hits at which a keyword group saturates to 1.0.
const KEYWORD_SATURATION: f32 = 5.0;
/// Occurrences per character scaled so that one pattern every ten characters saturates.
const DENSITY_SCALE: f32 = 10.0;

/// Keyword group scores for already-tokenized lowercase words.
#[must_use]
pub fn keyword_features(words: &[String]) -> [f32; KEYWORD_GROUPS.len()] {
    let mut hits = [0u32; KEYWORD_GROUPS.len()];
    for word in words {
        for (group, keywords) in KEYWORD_GROUPS.iter().enumerate() {
            if keywords.contains(&word.as_str()) {
                hits[group] += 1;
            }
        }
    }
    hits.map(|count| (count as f32 / KEYWORD_SATURATION).min(1.0))
}

/// Punctuation densities of the raw text.
#[must_use]
pub fn structural_features(text: &str) -> [f32; STRUCTURAL_PATTERNS.len()] {
    let length = text.chars().count();
    if length == 0 {
        return [0.0; STRUCTURAL_PATTERNS.len()];
    }
    STRUCTURAL_PATTERNS.map(|patterns| {
        let count: usize = patterns.iter().map(|p| text.matches(p).count()).sum();
        (count as f32 / length as f32 * DENSITY_SCALE).min(1.0)
    })
}

/// Add both feature families into their reserved slots.
pub fn apply(text: &str, words: &[String], vector: &mut [f32]) {
    for (i, value) in keyword_features(words).into_iter().enumerate() {
        vector[KEYWORD_FEATURE_OFFSET + i] += value;
    }
    for (i, value) in structural_features(text).into_iter().enumerate() {
        vector[STRUCTURAL_FEATURE_OFFSET + i] += value;
    }
}
