use crate::corpus::CorpusStats;
use crate::embeddings::{EmbeddingGenerator, EMBEDDING_DIMENSION};
use crate::error::{Result, VectorStoreError};
use crate::paths::{corpus_path_for_project_root, store_path_for_project_root};
use crate::types::{SearchResult, StoreStats, StoredChunk};
use codemem_code_chunk::CodeChunk;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix that turns a code snippet into a similarity query.
pub const CODE_QUERY_PREFIX: &str = "Find code similar to: ";

/// Exhaustive-scan vector store over code chunks.
///
/// Entries keep insertion order; re-adding an id overwrites in place. Every mutation rewrites
/// the full JSON snapshot before returning, followed by the corpus statistics the embeddings
/// were computed against. Both writes go through a temp file and a rename, so a crash leaves
/// either the previous or the new file, never a torn one; writes that had not completed are
/// lost.
pub struct VectorStore {
    root: PathBuf,
    path: Option<PathBuf>,
    corpus_path: Option<PathBuf>,
    entries: Vec<StoredChunk>,
    positions: HashMap<String, usize>,
    embedder: EmbeddingGenerator,
}

impl VectorStore {
    /// Create an uninitialized store rooted at a workspace directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            path: None,
            corpus_path: None,
            entries: Vec::new(),
            positions: HashMap::new(),
            embedder: EmbeddingGenerator::new(),
        }
    }

    /// Resolve the snapshot for `name` and load it.
    ///
    /// A missing snapshot starts empty. A corrupt one is logged and also starts empty. The
    /// saved corpus statistics are restored so new queries use the same vocabulary indices and
    /// IDF as the stored embeddings. Queries issued after the last mutation are not saved. If
    /// the corpus file is missing or unreadable, it is rebuilt from the loaded chunk texts,
    /// which only approximates the session that wrote the snapshot.
    pub async fn initialize(&mut self, name: &str) -> Result<()> {
        let path = store_path_for_project_root(&self.root, name);
        let corpus_path = corpus_path_for_project_root(&self.root, name);
        log::info!("Initializing VectorStore at {:?}", path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = load_snapshot(&path).await?;
        self.embedder = restore_embedder(&corpus_path, &entries).await;

        self.entries = entries;
        self.reindex();
        self.path = Some(path);
        self.corpus_path = Some(corpus_path);

        log::info!("Loaded {} chunks", self.entries.len());
        Ok(())
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.path.is_some()
    }

    /// Snapshot location, once initialized.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Add chunks with one batch embedding so IDF covers the whole batch.
    pub async fn add_chunks(&mut self, chunks: Vec<CodeChunk>) -> Result<()> {
        self.ensure_initialized()?;
        if chunks.is_empty() {
            return Ok(());
        }

        log::info!("Adding {} chunks to store", chunks.len());

        let texts: Vec<String> = chunks.iter().map(CodeChunk::canonical_text).collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;

        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            self.upsert(StoredChunk {
                id: chunk.id.clone(),
                chunk,
                embedding,
            });
        }

        self.persist().await?;
        log::info!("Successfully added chunks. Total: {}", self.entries.len());
        Ok(())
    }

    /// Rank every stored chunk by cosine distance to `query`.
    pub fn search(&mut self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.ensure_initialized()?;
        log::debug!("Searching for: '{}' (limit: {})", query, limit);

        let query_vector = self.embedder.embed(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| {
                let similarity =
                    EmbeddingGenerator::cosine_similarity(&query_vector, &entry.embedding);
                (pos, 1.0 - similarity)
            })
            .collect();

        // stable: equal distances keep insertion order
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        let results: Vec<SearchResult> = scored
            .into_iter()
            .map(|(pos, score)| SearchResult {
                chunk: self.entries[pos].chunk.clone(),
                score,
            })
            .collect();

        log::debug!("Found {} results", results.len());
        Ok(results)
    }

    pub fn search_by_code(&mut self, snippet: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.search(&format!("{CODE_QUERY_PREFIX}{snippet}"), limit)
    }

    /// Nearest neighbours of a stored chunk, excluding itself. Unknown ids yield nothing.
    pub fn get_related_chunks(&mut self, id: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.ensure_initialized()?;
        let Some(text) = self.entry(id).map(|e| e.chunk.canonical_text()) else {
            log::debug!("Related chunks requested for unknown id {id}");
            return Ok(vec![]);
        };

        let mut results = self.search(&text, limit.saturating_add(1))?;
        results.retain(|r| r.chunk.id != id);
        results.truncate(limit);
        Ok(results)
    }

    pub fn get_chunk_by_id(&self, id: &str) -> Result<Option<&CodeChunk>> {
        self.ensure_initialized()?;
        Ok(self.entry(id).map(|e| &e.chunk))
    }

    /// Stored embedding for `id`.
    pub fn get_embedding(&self, id: &str) -> Result<Option<&[f32]>> {
        self.ensure_initialized()?;
        Ok(self.entry(id).map(|e| e.embedding.as_slice()))
    }

    /// Re-embed one chunk and overwrite its entry.
    ///
    /// Uses the current IDF snapshot; the chunk's new text counts toward document frequency
    /// only from the next batch on.
    pub async fn update_chunk(&mut self, chunk: CodeChunk) -> Result<()> {
        self.ensure_initialized()?;
        let embedding = self.embedder.embed(&chunk.canonical_text())?;
        if !self.positions.contains_key(&chunk.id) {
            log::debug!("update_chunk for new id {}; appending", chunk.id);
        }
        self.upsert(StoredChunk {
            id: chunk.id.clone(),
            chunk,
            embedding,
        });
        self.persist().await
    }

    /// Remove entries. Vocabulary and IDF are left as they are.
    pub async fn delete_chunks(&mut self, ids: &[String]) -> Result<usize> {
        self.ensure_initialized()?;
        let before = self.entries.len();
        self.entries.retain(|entry| !ids.contains(&entry.id));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.reindex();
        }
        self.persist().await?;
        log::info!("Deleted {removed} chunks. Total: {}", self.entries.len());
        Ok(removed)
    }

    pub fn get_stats(&self) -> Result<StoreStats> {
        self.ensure_initialized()?;
        let mut stats = StoreStats {
            total_chunks: self.entries.len(),
            ..StoreStats::default()
        };
        for entry in &self.entries {
            *stats
                .by_type
                .entry(entry.chunk.chunk_type.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_language
                .entry(entry.chunk.language.clone())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }

    /// Get all chunk IDs in insertion order
    #[must_use]
    pub fn chunk_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Stored chunks in insertion order
    pub fn chunks(&self) -> impl Iterator<Item = &CodeChunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Get total number of chunks
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn embedder(&self) -> &EmbeddingGenerator {
        &self.embedder
    }

    /// Vocabulary and document counters behind the embeddings.
    #[must_use]
    pub fn corpus_stats(&self) -> &CorpusStats {
        self.embedder.corpus()
    }

    fn ensure_initialized(&self) -> Result<&Path> {
        self.path.as_deref().ok_or(VectorStoreError::NotInitialized)
    }

    fn entry(&self, id: &str) -> Option<&StoredChunk> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    fn upsert(&mut self, stored: StoredChunk) {
        match self.positions.get(&stored.id) {
            Some(&pos) => self.entries[pos] = stored,
            None => {
                self.positions.insert(stored.id.clone(), self.entries.len());
                self.entries.push(stored);
            }
        }
    }

    fn reindex(&mut self) {
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (entry.id.clone(), pos))
            .collect();
    }

    async fn persist(&self) -> Result<()> {
        let path = self.ensure_initialized()?;
        log::debug!("Saving VectorStore to {:?}", path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&self.entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        if let Some(corpus_path) = &self.corpus_path {
            self.embedder.corpus().save(corpus_path).await?;
        }
        Ok(())
    }
}

async fn restore_embedder(corpus_path: &Path, entries: &[StoredChunk]) -> EmbeddingGenerator {
    match CorpusStats::load(corpus_path).await {
        Ok(corpus) => {
            log::debug!(
                "Restored corpus: {} tokens, {} documents",
                corpus.vocabulary_size(),
                corpus.document_count()
            );
            return EmbeddingGenerator::from_corpus(corpus);
        }
        Err(VectorStoreError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            if !entries.is_empty() {
                log::warn!("No corpus at {:?}; rebuilding from stored chunks", corpus_path);
            }
        }
        Err(err) => {
            log::warn!("Rebuilding unreadable corpus {:?}: {}", corpus_path, err);
        }
    }

    let mut embedder = EmbeddingGenerator::new();
    let texts: Vec<String> = entries.iter().map(|e| e.chunk.canonical_text()).collect();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    embedder.warm(&texts);
    embedder
}

async fn load_snapshot(path: &Path) -> Result<Vec<StoredChunk>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(err.into()),
    };

    let entries: Vec<StoredChunk> = match serde_json::from_slice(&bytes) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("Discarding corrupt vector snapshot {:?}: {}", path, err);
            return Ok(vec![]);
        }
    };

    if let Some(bad) = entries
        .iter()
        .find(|e| e.embedding.len() != EMBEDDING_DIMENSION)
    {
        log::warn!(
            "Discarding vector snapshot {:?}: {}",
            path,
            VectorStoreError::InvalidDimension {
                expected: EMBEDDING_DIMENSION,
                actual: bad.embedding.len(),
            }
        );
        return Ok(vec![]);
    }

    Ok(dedupe_entries(entries, path))
}

/// Collapse repeated ids: the last row wins and takes the position of the first.
fn dedupe_entries(entries: Vec<StoredChunk>, path: &Path) -> Vec<StoredChunk> {
    let total = entries.len();
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(entries.len());
    let mut unique: Vec<StoredChunk> = Vec::with_capacity(entries.len());
    for entry in entries {
        match positions.get(&entry.id) {
            Some(&pos) => unique[pos] = entry,
            None => {
                positions.insert(entry.id.clone(), unique.len());
                unique.push(entry);
            }
        }
    }
    if unique.len() < total {
        log::warn!(
            "Snapshot {:?} repeats {} ids; keeping the last row of each",
            path,
            total - unique.len()
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemem_code_chunk::ChunkType;
    use tempfile::TempDir;

    fn chunk(id: &str, content: &str) -> CodeChunk {
        CodeChunk::new(id, "src/lib.ts", ChunkType::Function, id, content).language("typescript")
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(temp_dir.path());

        assert!(matches!(
            store.add_chunks(vec![chunk("a", "x")]).await,
            Err(VectorStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.search("x", 1),
            Err(VectorStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.get_chunk_by_id("a"),
            Err(VectorStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.get_related_chunks("a", 1),
            Err(VectorStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.update_chunk(chunk("a", "x")).await,
            Err(VectorStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.delete_chunks(&["a".to_string()]).await,
            Err(VectorStoreError::NotInitialized)
        ));
        assert!(matches!(store.get_stats(), Err(VectorStoreError::NotInitialized)));
    }

    #[tokio::test]
    async fn upsert_keeps_original_position() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(temp_dir.path());
        store.initialize("test").await.unwrap();

        store
            .add_chunks(vec![chunk("a", "alpha"), chunk("b", "beta")])
            .await
            .unwrap();
        store.add_chunks(vec![chunk("a", "alpha two")]).await.unwrap();

        assert_eq!(store.chunk_ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            store.get_chunk_by_id("a").unwrap().map(|c| c.content.as_str()),
            Some("alpha two")
        );
    }

    #[tokio::test]
    async fn delete_reindexes_remaining_entries() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(temp_dir.path());
        store.initialize("test").await.unwrap();
        store
            .add_chunks(vec![chunk("a", "one"), chunk("b", "two"), chunk("c", "three")])
            .await
            .unwrap();

        let removed = store.delete_chunks(&["a".to_string(), "zzz".to_string()]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            store.get_chunk_by_id("c").unwrap().map(|c| c.content.as_str()),
            Some("three")
        );
        assert!(store.get_chunk_by_id("a").unwrap().is_none());
    }

    #[tokio::test]
    async fn update_chunk_skips_idf_refresh() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(temp_dir.path());
        store.initialize("test").await.unwrap();
        store
            .add_chunks(vec![chunk("a", "alpha"), chunk("b", "beta")])
            .await
            .unwrap();
        let docs = store.corpus_stats().document_count();
        let before = store.get_embedding("b").unwrap().unwrap().to_vec();

        let replacement = chunk("b", "zeta");
        store.update_chunk(replacement.clone()).await.unwrap();
        assert_eq!(store.corpus_stats().document_count(), docs + 1);
        assert_eq!(store.embedder().corpus().idf("zeta"), 0.0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.chunk_ids(), vec!["a".to_string(), "b".to_string()]);

        assert_eq!(
            store.get_chunk_by_id("b").unwrap().map(|c| c.content.as_str()),
            Some("zeta")
        );
        let after = store.get_embedding("b").unwrap().unwrap().to_vec();
        assert_ne!(before, after);

        let hits = store.search(&replacement.canonical_text(), 2).unwrap();
        assert_eq!(hits[0].chunk.id, "b");
        assert!(hits[0].score.abs() < 1e-5, "score {}", hits[0].score);
        assert!(hits[1].score > hits[0].score);
    }

    #[tokio::test]
    async fn repeated_ids_in_snapshot_collapse_to_last_row() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(temp_dir.path());
        store.initialize("test").await.unwrap();
        store
            .add_chunks(vec![chunk("a", "alpha"), chunk("b", "beta")])
            .await
            .unwrap();

        let path = store.path().unwrap().to_path_buf();
        let mut rows: Vec<StoredChunk> =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        let mut stale_copy = rows[0].clone();
        stale_copy.chunk.content = "alpha revised".to_string();
        rows.push(stale_copy);
        tokio::fs::write(&path, serde_json::to_vec(&rows).unwrap())
            .await
            .unwrap();

        let mut reloaded = VectorStore::new(temp_dir.path());
        reloaded.initialize("test").await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.chunk_ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(reloaded.get_stats().unwrap().total_chunks, 2);
        assert_eq!(
            reloaded.get_chunk_by_id("a").unwrap().map(|c| c.content.as_str()),
            Some("alpha revised")
        );
        let hits = reloaded.search("alpha", 10).unwrap();
        assert_eq!(hits.iter().filter(|h| h.chunk.id == "a").count(), 1);
    }
}
