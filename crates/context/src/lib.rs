//! # codemem Context
//!
//! Turns ranked chunks into context for an assistant and remembers past interactions.
//!
//! - [`ContextManager`] wraps a [`VectorStore`](codemem_vector_store::VectorStore), enriching
//!   every hit with a cached [`SemanticContext`] and surfacing prior [`MemoryEntry`] records
//!   whose queries overlap the current one.
//! - [`ProjectContext`] holds languages, frameworks, dependencies and conventions read from
//!   manifests once at construction, plus architectural patterns found by searching the store.
//! - [`render`] formats results into a character-budgeted prompt block.
//!
//! ```no_run
//! use codemem_context::{ContextManager, Feedback};
//!
//! # async fn demo() -> codemem_context::Result<()> {
//! let mut manager = ContextManager::open(".", "workspace").await?;
//! let context = manager.get_relevant_context("where do we hash passwords", 5)?;
//! let ids = context.results.iter().map(|r| r.chunk.id.clone()).collect();
//! let entry = manager
//!     .record_memory_entry("where do we hash passwords", "in auth.ts", ids, None)
//!     .await?;
//! manager.update_memory_feedback(&entry.id, Feedback::Helpful).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod manager;
mod memory;
mod project;
pub mod render;
mod semantic;

pub use config::{ContextConfig, CACHE_CAPACITY_ENV, MAX_MEMORY_ENTRIES_ENV};
pub use error::{ContextError, Result};
pub use manager::{CodeExplanationContext, ContextManager, RelevantContext, VectorSearchResult};
pub use memory::{Feedback, MemoryEntry, MemoryLedger, MemoryStats};
pub use project::{ArchitecturalPattern, ProjectContext};
pub use semantic::{extract_keywords, importance, summarize, SemanticContext, MAX_KEYWORDS};
