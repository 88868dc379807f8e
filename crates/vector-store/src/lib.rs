//! # codemem Vector Store
//!
//! Offline embedding and exhaustive similarity search for code chunks.
//!
//! ## Features
//!
//! - **Feature-engineered TF-IDF embeddings** (384 dimensions, no model download)
//! - **Corpus-aware**: vocabulary and IDF grow with every indexed chunk and query
//! - **Persistent storage** with a JSON snapshot rewritten on every mutation
//! - **Deterministic ranking**: cosine distance, ties in insertion order
//!
//! ## Architecture
//!
//! ```text
//! CodeChunk[]
//!     │
//!     ├──> canonical text (type/name/language/file/signature/docs/content)
//!     │
//!     ├──> EmbeddingGenerator
//!     │      ├─> tokens + bigrams → CorpusStats (vocabulary, df, IDF)
//!     │      ├─> tf·idf slots + hashed overflow
//!     │      └─> keyword / punctuation features → Vector[384]
//!     │
//!     └──> VectorStore
//!            ├─> exhaustive cosine scan
//!            ├─> .codemem/vectors/<name>.json
//!            └─> .codemem/vectors/corpus/<name>.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use codemem_vector_store::{ChunkType, CodeChunk, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> codemem_vector_store::Result<()> {
//!     let mut store = VectorStore::new(".");
//!     store.initialize("workspace").await?;
//!
//!     let chunk = CodeChunk::new(
//!         "a",
//!         "src/auth.ts",
//!         ChunkType::Function,
//!         "login",
//!         "function login(user, pass) {}",
//!     );
//!     store.add_chunks(vec![chunk]).await?;
//!
//!     for result in store.search("login user pass", 10)? {
//!         println!("{}: {:.3}", result.chunk.filepath, result.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod corpus;
mod embeddings;
mod error;
mod features;
mod paths;
mod store;
mod tokenizer;
mod types;

pub use corpus::{CorpusStats, CORPUS_SCHEMA_VERSION};
pub use embeddings::{EmbeddingGenerator, EMBEDDING_DIMENSION};
pub use error::{Result, VectorStoreError};
pub use paths::{
    config_path_for_project_root, context_dir_for_project_root, corpus_path_for_project_root,
    memory_path_for_project_root, store_path_for_project_root, CONTEXT_DIR_ENV,
    CONTEXT_DIR_NAME,
};
pub use store::{VectorStore, CODE_QUERY_PREFIX};
pub use tokenizer::{tokenize, words};
pub use types::{SearchResult, StoreStats, StoredChunk};

// Re-export chunk types for convenience
pub use codemem_code_chunk::{ChunkMetadata, ChunkType, CodeChunk};
