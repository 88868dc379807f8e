//! # codemem Code Chunk
//!
//! Data model shared by chunk producers and the semantic memory engine.
//!
//! A [`CodeChunk`] is the unit of indexing: a named, located fragment of source with optional
//! metadata. Producers (language-specific extractors) assign ids; the engine uses every field
//! as supplied and performs no validation.
//!
//! ## Example
//!
//! ```rust
//! use codemem_code_chunk::{ChunkMetadata, ChunkType, CodeChunk};
//!
//! let chunk = CodeChunk::new(
//!     "a",
//!     "src/auth.ts",
//!     ChunkType::Function,
//!     "login",
//!     "function login() {}",
//! )
//! .lines(0, 0)
//! .language("typescript")
//! .with_metadata(ChunkMetadata::default().docstring("Signs a user in"));
//!
//! assert!(chunk.canonical_text().starts_with("function login"));
//! ```

mod types;

pub use types::{ChunkMetadata, ChunkType, CodeChunk};
