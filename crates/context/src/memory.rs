use crate::error::Result;
use codemem_vector_store::words;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

/// One recorded question/answer interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub id: String,
    /// Unix milliseconds
    pub timestamp: u64,
    pub query: String,
    pub response: String,
    #[serde(default)]
    pub relevant_chunks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MemoryStats {
    pub total: usize,
    pub helpful: usize,
    pub not_helpful: usize,
}

/// Capped interaction log, newest first, persisted as a JSON array after every change.
#[derive(Debug)]
pub struct MemoryLedger {
    path: PathBuf,
    capacity: usize,
    entries: Vec<MemoryEntry>,
}

impl MemoryLedger {
    /// Load the ledger at `path`. Missing or unreadable JSON starts an empty ledger.
    pub async fn load(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries: Vec<MemoryEntry> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                log::warn!("Discarding corrupt memory ledger {:?}: {}", path, err);
                Vec::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(capacity);
        log::info!("Loaded {} memory entries from {:?}", entries.len(), path);
        Ok(Self {
            path,
            capacity,
            entries,
        })
    }

    /// Newest first
    #[must_use]
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MemoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub async fn record(
        &mut self,
        query: &str,
        response: &str,
        relevant_chunks: Vec<String>,
        feedback: Option<Feedback>,
        context: serde_json::Value,
    ) -> Result<MemoryEntry> {
        let entry = MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: current_unix_ms(),
            query: query.to_string(),
            response: response.to_string(),
            relevant_chunks,
            feedback,
            context,
        };
        self.entries.insert(0, entry.clone());
        if self.entries.len() > self.capacity {
            let dropped = self.entries.len() - self.capacity;
            self.entries.truncate(self.capacity);
            log::debug!("Memory ledger full; dropped {dropped} oldest entries");
        }
        self.persist().await?;
        Ok(entry)
    }

    /// Set feedback on one entry. Returns `false` when the id is unknown.
    pub async fn update_feedback(&mut self, id: &str, feedback: Feedback) -> Result<bool> {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            log::debug!("Feedback for unknown memory entry {id}");
            return Ok(false);
        };
        entry.feedback = Some(feedback);
        self.persist().await?;
        Ok(true)
    }

    /// Entries whose query shares enough words with `query`, best first.
    ///
    /// Overlap is `|shared| / max(|query words|, |entry words|)` over distinct words and must
    /// exceed `threshold`.
    #[must_use]
    pub fn related(&self, query: &str, limit: usize, threshold: f32) -> Vec<MemoryEntry> {
        let query_words: HashSet<String> = words(query).into_iter().collect();
        if query_words.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f32, &MemoryEntry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let entry_words: HashSet<String> = words(&entry.query).into_iter().collect();
                let shared = query_words.intersection(&entry_words).count();
                let denominator = query_words.len().max(entry_words.len());
                let score = shared as f32 / denominator as f32;
                (score > threshold).then_some((score, entry))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        let mut stats = MemoryStats {
            total: self.entries.len(),
            ..MemoryStats::default()
        };
        for entry in &self.entries {
            match entry.feedback {
                Some(Feedback::Helpful) => stats.helpful += 1,
                Some(Feedback::NotHelpful) => stats.not_helpful += 1,
                None => {}
            }
        }
        stats
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn ledger(temp: &TempDir, capacity: usize) -> MemoryLedger {
        MemoryLedger::load(temp.path().join("memory.json"), capacity)
            .await
            .unwrap()
    }

    async fn record(ledger: &mut MemoryLedger, query: &str) -> MemoryEntry {
        ledger
            .record(query, "answer", vec![], None, serde_json::Value::Null)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn records_newest_first_and_persists() {
        let temp = TempDir::new().unwrap();
        let mut log = ledger(&temp, 10).await;
        let first = record(&mut log, "first question").await;
        let second = record(&mut log, "second question").await;

        assert_eq!(log.entries()[0].id, second.id);
        assert_eq!(log.entries()[1].id, first.id);
        assert_ne!(first.id, second.id);

        let reloaded = ledger(&temp, 10).await;
        assert_eq!(reloaded.entries(), log.entries());
    }

    #[tokio::test]
    async fn cap_drops_oldest_entries() {
        let temp = TempDir::new().unwrap();
        let mut log = ledger(&temp, 3).await;
        let oldest = record(&mut log, "q0").await;
        for i in 1..4 {
            record(&mut log, &format!("q{i}")).await;
        }
        assert_eq!(log.len(), 3);
        assert!(log.get(&oldest.id).is_none());
        assert_eq!(log.entries()[0].query, "q3");
    }

    #[tokio::test]
    async fn feedback_updates_in_place() {
        let temp = TempDir::new().unwrap();
        let mut log = ledger(&temp, 10).await;
        let entry = record(&mut log, "how do we log in").await;

        assert!(log.update_feedback(&entry.id, Feedback::Helpful).await.unwrap());
        assert!(!log.update_feedback("missing", Feedback::Helpful).await.unwrap());

        let reloaded = ledger(&temp, 10).await;
        assert_eq!(
            reloaded.get(&entry.id).and_then(|e| e.feedback),
            Some(Feedback::Helpful)
        );
        assert_eq!(
            reloaded.stats(),
            MemoryStats {
                total: 1,
                helpful: 1,
                not_helpful: 0
            }
        );
    }

    #[tokio::test]
    async fn corrupt_ledger_starts_empty() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("memory.json"), "{not json")
            .await
            .unwrap();
        let log = ledger(&temp, 10).await;
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn related_uses_word_overlap_threshold() {
        let temp = TempDir::new().unwrap();
        let mut log = ledger(&temp, 10).await;
        record(&mut log, "how does user login work").await;
        record(&mut log, "render the profile page").await;
        record(&mut log, "user login").await;

        let related = log.related("user login flow", 5, 0.2);
        let queries: Vec<&str> = related.iter().map(|e| e.query.as_str()).collect();
        // 2/3 for "user login", 2/5 for the longer question, 0 for the profile one
        assert_eq!(queries, vec!["user login", "how does user login work"]);

        assert!(log.related("", 5, 0.2).is_empty());
        assert_eq!(log.related("user login flow", 1, 0.2).len(), 1);
        assert!(log.related("user login flow", 5, 0.9).is_empty());
    }
}
