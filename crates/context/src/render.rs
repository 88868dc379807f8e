//! Plain-text rendering of ranked chunks for prompt assembly.
//!
//! Rendering is deterministic: the same results and budget always produce the same text.

use codemem_code_chunk::CodeChunk;
use codemem_vector_store::SearchResult;
use serde::Serialize;
use std::collections::HashSet;

const BLOCK_SEPARATOR: &str = "\n\n";

/// Character accounting for one assembly.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ContextBudget {
    pub max_chars: usize,
    pub used_chars: usize,
    pub truncated: bool,
    pub dropped_items: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    /// Ids of the rendered chunks, in rank order
    pub chunk_ids: Vec<String>,
    pub budget: ContextBudget,
}

/// Render one chunk: a header with kind, name and 1-based location, the first docstring line,
/// then at most `max_snippet_lines` lines of content.
#[must_use]
pub fn format_chunk(chunk: &CodeChunk, max_snippet_lines: usize) -> String {
    let mut out = format!(
        "### {} {} ({}:{}-{})",
        chunk.chunk_type,
        chunk.name,
        chunk.filepath,
        chunk.start_line + 1,
        chunk.end_line + 1
    );
    if let Some(signature) = chunk.metadata.signature.as_deref() {
        out.push_str("\nSignature: ");
        out.push_str(signature);
    }
    if let Some(doc) = chunk
        .metadata
        .docstring
        .as_deref()
        .and_then(|doc| doc.lines().map(str::trim).find(|line| !line.is_empty()))
    {
        out.push_str("\nDoc: ");
        out.push_str(doc);
    }

    let total = chunk.content.lines().count();
    out.push_str("\n```");
    out.push_str(&chunk.language);
    for line in chunk.content.lines().take(max_snippet_lines) {
        out.push('\n');
        out.push_str(line);
    }
    if total > max_snippet_lines {
        out.push_str(&format!("\n// ... {} more lines", total - max_snippet_lines));
    }
    out.push_str("\n```");
    out
}

/// Concatenate rendered results in rank order until `char_budget` would be exceeded.
///
/// Duplicate ids are skipped. A chunk is either rendered whole or not at all; the first chunk
/// that does not fit stops the assembly.
#[must_use]
pub fn assemble_context(
    results: &[SearchResult],
    char_budget: usize,
    max_snippet_lines: usize,
) -> AssembledContext {
    let mut assembled = AssembledContext {
        budget: ContextBudget {
            max_chars: char_budget,
            ..ContextBudget::default()
        },
        ..AssembledContext::default()
    };
    let mut seen: HashSet<&str> = HashSet::new();

    for (idx, result) in results.iter().enumerate() {
        if !seen.insert(result.chunk.id.as_str()) {
            continue;
        }
        let block = format_chunk(&result.chunk, max_snippet_lines);
        let separator = if assembled.text.is_empty() {
            0
        } else {
            BLOCK_SEPARATOR.len()
        };
        let cost = block.chars().count() + separator;
        if assembled.budget.used_chars.saturating_add(cost) > char_budget {
            assembled.budget.truncated = true;
            let remaining: HashSet<&str> = results[idx..]
                .iter()
                .map(|r| r.chunk.id.as_str())
                .filter(|id| !assembled.chunk_ids.iter().any(|kept| kept == id))
                .collect();
            assembled.budget.dropped_items = remaining.len();
            break;
        }
        if separator > 0 {
            assembled.text.push_str(BLOCK_SEPARATOR);
        }
        assembled.text.push_str(&block);
        assembled.budget.used_chars += cost;
        assembled.chunk_ids.push(result.chunk.id.clone());
    }

    log::debug!(
        "Assembled {} chunks ({} / {} chars, truncated: {})",
        assembled.chunk_ids.len(),
        assembled.budget.used_chars,
        assembled.budget.max_chars,
        assembled.budget.truncated
    );
    assembled
}
