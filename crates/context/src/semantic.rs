use codemem_code_chunk::{ChunkType, CodeChunk};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MAX_KEYWORDS: usize = 10;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("identifier pattern is valid"));

/// Language keywords and filler words that say nothing about what a chunk does.
const STOPWORDS: &[&str] = &[
    "and", "any", "are", "as", "async", "await", "bool", "break", "case", "catch", "class",
    "const", "continue", "def", "default", "else", "enum", "export", "extends", "false", "for",
    "from", "func", "function", "if", "impl", "import", "in", "int", "interface", "let", "mut",
    "new", "nil", "none", "not", "null", "number", "or", "package", "pass", "private",
    "protected", "pub", "public", "return", "self", "static", "str", "string", "struct",
    "super", "switch", "the", "this", "throw", "true", "try", "type", "undefined", "use", "var",
    "void", "while", "with", "yield",
];

/// Derived, cached view of a chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SemanticContext {
    pub keywords: Vec<String>,
    pub summary: String,
    pub related_chunks: Vec<String>,
    pub importance: f32,
}

/// Distinct identifiers of the chunk, lowercased, in order of first appearance.
#[must_use]
pub fn extract_keywords(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for found in IDENTIFIER.find_iter(content) {
        let word = found.as_str().to_lowercase();
        if word.len() < 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if seen.insert(word.clone()) {
            keywords.push(word);
            if keywords.len() == MAX_KEYWORDS {
                break;
            }
        }
    }
    keywords
}

/// One-line description: kind, name, location, and the first docstring line if any.
#[must_use]
pub fn summarize(chunk: &CodeChunk) -> String {
    let mut summary = format!(
        "{} '{}' in {} (lines {}-{})",
        chunk.chunk_type,
        chunk.name,
        chunk.filepath,
        chunk.start_line + 1,
        chunk.end_line + 1
    );
    if let Some(first_line) = chunk
        .metadata
        .docstring
        .as_deref()
        .and_then(|doc| doc.lines().map(str::trim).find(|line| !line.is_empty()))
    {
        summary.push_str(": ");
        summary.push_str(first_line);
    }
    summary
}

/// Importance in `[0, 1]`: a per-type base, bumped for documentation and size.
#[must_use]
pub fn importance(chunk: &CodeChunk) -> f32 {
    let mut score: f32 = match chunk.chunk_type {
        ChunkType::Module => 0.9,
        ChunkType::Class => 0.8,
        ChunkType::Function => 0.7,
        ChunkType::Method => 0.6,
        ChunkType::Variable => 0.4,
        ChunkType::Import => 0.3,
    };
    if chunk.metadata.docstring.is_some() {
        score += 0.1;
    }
    let span = chunk.end_line.saturating_sub(chunk.start_line);
    if span > 50 {
        score += 0.1;
    }
    if span > 100 {
        score += 0.1;
    }
    score.min(1.0)
}
