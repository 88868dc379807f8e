use crate::config::ContextConfig;
use crate::error::{ContextError, Result};
use crate::memory::{Feedback, MemoryEntry, MemoryLedger, MemoryStats};
use crate::project::ProjectContext;
use crate::semantic::{self, SemanticContext};
use codemem_code_chunk::CodeChunk;
use codemem_vector_store::{
    memory_path_for_project_root, SearchResult, VectorStore, VectorStoreError,
};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::Path;

/// Hits kept per dependency name in an explanation context.
const DEPENDENCY_HITS: usize = 3;
/// Hits kept for the usages query and for related chunks in an explanation context.
const EXPLANATION_HITS: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchResult {
    pub chunk: CodeChunk,
    /// Cosine distance, lower is closer
    pub score: f32,
    pub context: SemanticContext,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelevantContext {
    pub results: Vec<VectorSearchResult>,
    pub related_memories: Vec<MemoryEntry>,
}

/// Material for explaining one chunk. The three sets are left unmerged and may overlap.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CodeExplanationContext {
    pub dependencies: Vec<SearchResult>,
    pub usages: Vec<SearchResult>,
    pub related: Vec<SearchResult>,
}

/// Retrieval front end: search enrichment, project facts and the interaction ledger.
pub struct ContextManager {
    store: VectorStore,
    config: ContextConfig,
    ledger: MemoryLedger,
    cache: LruCache<String, SemanticContext>,
    project: ProjectContext,
}

impl ContextManager {
    /// Wrap an initialized store. Loads the ledger and scans the workspace once.
    pub async fn new(mut store: VectorStore, config: ContextConfig) -> Result<Self> {
        if !store.is_initialized() {
            return Err(VectorStoreError::NotInitialized.into());
        }
        config.validate().map_err(ContextError::InvalidConfig)?;

        let root = store.root().to_path_buf();
        let ledger =
            MemoryLedger::load(memory_path_for_project_root(&root), config.max_memory_entries)
                .await?;

        let mut project = ProjectContext::detect(&root).await;
        project.detect_patterns(&mut store, &config)?;

        let capacity = NonZeroUsize::new(config.semantic_cache_capacity).ok_or_else(|| {
            ContextError::InvalidConfig("semantic_cache_capacity must be > 0".into())
        })?;

        Ok(Self {
            store,
            config,
            ledger,
            cache: LruCache::new(capacity),
            project,
        })
    }

    /// Load config for `root`, open the named store and build a manager over it.
    pub async fn open(root: impl AsRef<Path>, store_name: &str) -> Result<Self> {
        let root = root.as_ref();
        let config = ContextConfig::load(root).await?;
        let mut store = VectorStore::new(root);
        store.initialize(store_name).await?;
        Self::new(store, config).await
    }

    /// Search and enrich each hit with its semantic context, plus prior interactions that
    /// asked something similar.
    pub fn get_relevant_context(
        &mut self,
        query: &str,
        max_results: usize,
    ) -> Result<RelevantContext> {
        let hits = self.store.search(query, max_results)?;
        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let context = self.semantic_context(&hit.chunk)?;
            results.push(VectorSearchResult {
                chunk: hit.chunk,
                score: hit.score,
                context,
            });
        }

        let related_memories = self.ledger.related(
            query,
            self.config.max_related_memories,
            self.config.memory_similarity_threshold,
        );
        log::debug!(
            "Relevant context for '{}': {} results, {} memories",
            query,
            results.len(),
            related_memories.len()
        );
        Ok(RelevantContext {
            results,
            related_memories,
        })
    }

    pub fn get_code_explanation_context(
        &mut self,
        chunk: &CodeChunk,
    ) -> Result<CodeExplanationContext> {
        let mut dependencies = Vec::new();
        for dependency in &chunk.metadata.dependencies {
            dependencies.extend(self.store.search(dependency, DEPENDENCY_HITS)?);
        }

        let usages_query = format!("uses {} from {}", chunk.name, chunk.basename());
        let usages = self.store.search(&usages_query, EXPLANATION_HITS)?;
        let related = self.store.get_related_chunks(&chunk.id, EXPLANATION_HITS)?;

        Ok(CodeExplanationContext {
            dependencies,
            usages,
            related,
        })
    }

    pub async fn record_memory_entry(
        &mut self,
        query: &str,
        response: &str,
        relevant_chunks: Vec<String>,
        feedback: Option<Feedback>,
    ) -> Result<MemoryEntry> {
        self.record_memory_entry_with_context(
            query,
            response,
            relevant_chunks,
            feedback,
            serde_json::Value::Null,
        )
        .await
    }

    /// Same as [`Self::record_memory_entry`], with a free-form context object stored alongside.
    pub async fn record_memory_entry_with_context(
        &mut self,
        query: &str,
        response: &str,
        relevant_chunks: Vec<String>,
        feedback: Option<Feedback>,
        context: serde_json::Value,
    ) -> Result<MemoryEntry> {
        let entry = self
            .ledger
            .record(query, response, relevant_chunks, feedback, context)
            .await?;
        log::info!("Recorded memory entry {}", entry.id);
        Ok(entry)
    }

    /// Returns `false` when no entry has `id`.
    pub async fn update_memory_feedback(&mut self, id: &str, feedback: Feedback) -> Result<bool> {
        self.ledger.update_feedback(id, feedback).await
    }

    /// Drop cached semantic contexts. Store, ledger and project facts are untouched.
    pub fn clear_cache(&mut self) {
        log::debug!("Clearing {} cached semantic contexts", self.cache.len());
        self.cache.clear();
    }

    #[must_use]
    pub fn cached_contexts(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn memory_entries(&self) -> &[MemoryEntry] {
        self.ledger.entries()
    }

    #[must_use]
    pub fn memory_stats(&self) -> MemoryStats {
        self.ledger.stats()
    }

    #[must_use]
    pub const fn project_context(&self) -> &ProjectContext {
        &self.project
    }

    #[must_use]
    pub const fn config(&self) -> &ContextConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut VectorStore {
        &mut self.store
    }

    fn semantic_context(&mut self, chunk: &CodeChunk) -> Result<SemanticContext> {
        if let Some(cached) = self.cache.get(&chunk.id) {
            return Ok(cached.clone());
        }

        let related_chunks = self
            .store
            .get_related_chunks(&chunk.id, self.config.related_chunks_per_result)?
            .into_iter()
            .map(|hit| hit.chunk.id)
            .collect();
        let context = SemanticContext {
            keywords: semantic::extract_keywords(&chunk.content),
            summary: semantic::summarize(chunk),
            related_chunks,
            importance: semantic::importance(chunk),
        };
        self.cache.put(chunk.id.clone(), context.clone());
        Ok(context)
    }
}
