use crate::error::{ContextError, Result};
use codemem_vector_store::config_path_for_project_root;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CACHE_CAPACITY_ENV: &str = "CODEMEM_CACHE_CAPACITY";
pub const MAX_MEMORY_ENTRIES_ENV: &str = "CODEMEM_MAX_MEMORY_ENTRIES";

/// Tuning for the context manager.
///
/// Read from `.codemem/config.toml` when present, then overridden from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    /// Semantic contexts kept in the LRU cache
    pub semantic_cache_capacity: usize,

    /// Ledger cap; older interactions are dropped
    pub max_memory_entries: usize,

    /// Prior interactions returned alongside search results
    pub max_related_memories: usize,

    /// Token overlap an interaction must exceed to count as related
    pub memory_similarity_threshold: f32,

    /// Neighbours recorded in each semantic context
    pub related_chunks_per_result: usize,

    /// Hits requested per architectural-pattern query
    pub pattern_query_limit: usize,

    /// Pattern hits farther than this cosine distance are ignored
    pub pattern_max_distance: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            semantic_cache_capacity: 1024,
            max_memory_entries: 1000,
            max_related_memories: 5,
            memory_similarity_threshold: 0.2,
            related_chunks_per_result: 3,
            pattern_query_limit: 5,
            pattern_max_distance: 0.8,
        }
    }
}

impl ContextConfig {
    /// Load config for a workspace: file (optional), then environment, then validation.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = config_path_for_project_root(root);
        let mut config = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => toml::from_str::<Self>(&raw).map_err(|err| {
                ContextError::InvalidConfig(format!("{}: {err}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(err.into()),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate().map_err(ContextError::InvalidConfig)?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(CACHE_CAPACITY_ENV) {
            self.semantic_cache_capacity = parse_usize(CACHE_CAPACITY_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MAX_MEMORY_ENTRIES_ENV) {
            self.max_memory_entries = parse_usize(MAX_MEMORY_ENTRIES_ENV, &raw)?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.semantic_cache_capacity == 0 {
            return Err("semantic_cache_capacity must be > 0".to_string());
        }
        if self.max_memory_entries == 0 {
            return Err("max_memory_entries must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.memory_similarity_threshold) {
            return Err(format!(
                "memory_similarity_threshold ({}) must be within [0, 1]",
                self.memory_similarity_threshold
            ));
        }
        if !(0.0..=2.0).contains(&self.pattern_max_distance) {
            return Err(format!(
                "pattern_max_distance ({}) must be within [0, 2]",
                self.pattern_max_distance
            ));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|err| ContextError::InvalidConfig(format!("{key}='{raw}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_valid() {
        assert!(ContextConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ContextConfig {
            semantic_cache_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.semantic_cache_capacity = 8;
        config.memory_similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        config.memory_similarity_threshold = 0.3;
        config.max_memory_entries = 0;
        assert!(config.validate().is_err());

        config.max_memory_entries = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = ContextConfig::default();
        config
            .apply_overrides(|key| match key {
                CACHE_CAPACITY_ENV => Some("64".to_string()),
                MAX_MEMORY_ENTRIES_ENV => Some(" 250 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.semantic_cache_capacity, 64);
        assert_eq!(config.max_memory_entries, 250);

        let err = config
            .apply_overrides(|key| (key == CACHE_CAPACITY_ENV).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn loads_partial_toml_over_defaults() {
        let temp = TempDir::new().unwrap();
        let path = config_path_for_project_root(temp.path());
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "related_chunks_per_result = 7\npattern_query_limit = 2\n")
            .await
            .unwrap();

        let config = ContextConfig::load(temp.path()).await.unwrap();
        assert_eq!(config.related_chunks_per_result, 7);
        assert_eq!(config.pattern_query_limit, 2);
        assert_eq!(config.max_related_memories, 5);
    }

    #[tokio::test]
    async fn rejects_malformed_toml() {
        let temp = TempDir::new().unwrap();
        let path = config_path_for_project_root(temp.path());
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "semantic_cache_capacity = \"big\"").await.unwrap();

        assert!(matches!(
            ContextConfig::load(temp.path()).await,
            Err(ContextError::InvalidConfig(_))
        ));
    }
}
