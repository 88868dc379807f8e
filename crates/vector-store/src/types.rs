use codemem_code_chunk::CodeChunk;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One persisted snapshot entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub chunk: CodeChunk,
    pub embedding: Vec<f32>,
}

/// A ranked hit. `score` is cosine distance (`1 - similarity`): lower is closer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    pub chunk: CodeChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
}
