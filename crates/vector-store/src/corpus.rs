use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const CORPUS_SCHEMA_VERSION: u32 = 1;

/// Corpus-wide statistics owned by one [`EmbeddingGenerator`](crate::EmbeddingGenerator).
///
/// Every text the generator sees (chunk text and queries alike) becomes a document. The
/// vocabulary only grows: a token keeps its index for the lifetime of the value.
///
/// Document frequency is the number of documents whose lowercased text contains the token as
/// a substring. Counters are maintained incrementally: a new document is checked against the
/// existing vocabulary (O(vocabulary)), and a new token against the existing documents
/// (O(documents)). [`refresh_idf`](Self::refresh_idf) then rebuilds the IDF snapshot from the
/// counters in O(vocabulary), which yields the same values as rescanning every document
/// against every token.
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    vocabulary: HashMap<String, usize>,
    tokens: Vec<String>,
    document_frequency: Vec<usize>,
    documents: Vec<String>,
    idf: Vec<f32>,
}

/// On-disk form. The vocabulary map is rebuilt from `tokens`, whose order is the index order.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCorpus {
    schema_version: u32,
    tokens: Vec<String>,
    document_frequency: Vec<usize>,
    documents: Vec<String>,
    idf: Vec<f32>,
}

impl CorpusStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one document and its token stream.
    ///
    /// `lowercased` must be the lowercased source text; `tokens` its tokenization.
    pub fn observe(&mut self, lowercased: String, tokens: &[String]) {
        for (index, token) in self.tokens.iter().enumerate() {
            if lowercased.contains(token.as_str()) {
                self.document_frequency[index] += 1;
            }
        }
        self.documents.push(lowercased);

        for token in tokens {
            if self.vocabulary.contains_key(token) {
                continue;
            }
            let df = self
                .documents
                .iter()
                .filter(|doc| doc.contains(token.as_str()))
                .count();
            self.vocabulary.insert(token.clone(), self.tokens.len());
            self.tokens.push(token.clone());
            self.document_frequency.push(df);
        }
    }

    /// Rebuild the IDF snapshot: `ln(N / df)`.
    ///
    /// Bigrams joined with `_` may never appear verbatim in any document; their frequency is
    /// treated as 1.
    pub fn refresh_idf(&mut self) {
        let total = self.documents.len() as f32;
        self.idf = self
            .document_frequency
            .iter()
            .map(|&df| (total / df.max(1) as f32).ln())
            .collect();
    }

    /// Vocabulary index of `token`, if seen.
    #[must_use]
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.vocabulary.get(token).copied()
    }

    /// IDF from the latest snapshot; 0 for tokens that arrived after it.
    #[must_use]
    pub fn idf(&self, token: &str) -> f32 {
        self.index_of(token)
            .and_then(|index| self.idf.get(index).copied())
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn document_frequency(&self, token: &str) -> usize {
        self.index_of(token)
            .map_or(0, |index| self.document_frequency[index])
    }

    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Load a saved corpus. Token indices, counters and the IDF snapshot come back exactly as
    /// they were saved.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let persisted: PersistedCorpus = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != CORPUS_SCHEMA_VERSION {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported corpus schema_version {} (expected {CORPUS_SCHEMA_VERSION})",
                persisted.schema_version
            )));
        }
        if persisted.document_frequency.len() != persisted.tokens.len()
            || persisted.idf.len() > persisted.tokens.len()
        {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Inconsistent corpus: {} tokens, {} frequencies, {} idf values",
                persisted.tokens.len(),
                persisted.document_frequency.len(),
                persisted.idf.len()
            )));
        }

        let mut vocabulary = HashMap::with_capacity(persisted.tokens.len());
        for (index, token) in persisted.tokens.iter().enumerate() {
            if vocabulary.insert(token.clone(), index).is_some() {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Duplicate corpus token '{token}'"
                )));
            }
        }

        Ok(Self {
            vocabulary,
            tokens: persisted.tokens,
            document_frequency: persisted.document_frequency,
            documents: persisted.documents,
            idf: persisted.idf,
        })
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedCorpus {
            schema_version: CORPUS_SCHEMA_VERSION,
            tokens: self.tokens.clone(),
            document_frequency: self.document_frequency.clone(),
            documents: self.documents.clone(),
            idf: self.idf.clone(),
        };
        let bytes = serde_json::to_vec(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn observe(stats: &mut CorpusStats, text: &str) {
        stats.observe(text.to_lowercase(), &tokenize(text));
    }

    fn rescan_df(stats: &CorpusStats, token: &str) -> usize {
        stats
            .documents
            .iter()
            .filter(|doc| doc.contains(token))
            .count()
    }

    #[test]
    fn vocabulary_indices_are_stable() {
        let mut stats = CorpusStats::new();
        observe(&mut stats, "alpha beta");
        let alpha = stats.index_of("alpha");
        observe(&mut stats, "gamma alpha");
        assert_eq!(stats.index_of("alpha"), alpha);
        assert_eq!(stats.index_of("alpha"), Some(0));
        assert_eq!(stats.index_of("beta"), Some(1));
        assert_eq!(stats.index_of("alpha_beta"), Some(2));
        assert_eq!(stats.index_of("gamma"), Some(3));
        assert_eq!(stats.index_of("gamma_alpha"), Some(4));
        assert_eq!(stats.vocabulary_size(), 5);
    }

    #[test]
    fn incremental_frequency_matches_full_rescan() {
        let mut stats = CorpusStats::new();
        for text in [
            "fn parse(input)",
            "parse input quickly",
            "Input validation for parser",
            "nothing shared",
        ] {
            observe(&mut stats, text);
        }
        for token in stats.tokens.clone() {
            assert_eq!(
                stats.document_frequency(&token),
                rescan_df(&stats, &token),
                "df mismatch for {token}"
            );
        }
        // substring semantics: "parse" also matches "parser"
        assert_eq!(stats.document_frequency("parse"), 3);
    }

    #[test]
    fn idf_snapshot_lags_until_refresh() {
        let mut stats = CorpusStats::new();
        observe(&mut stats, "shared alpha");
        observe(&mut stats, "shared beta");
        stats.refresh_idf();
        assert_eq!(stats.idf("shared"), 0.0);
        assert!((stats.idf("alpha") - 2f32.ln()).abs() < 1e-6);

        observe(&mut stats, "omega");
        assert_eq!(stats.idf("omega"), 0.0, "new token has no snapshot entry yet");
        assert!((stats.idf("alpha") - 2f32.ln()).abs() < 1e-6);

        stats.refresh_idf();
        assert!((stats.idf("omega") - 3f32.ln()).abs() < 1e-6);
        assert!((stats.idf("alpha") - 3f32.ln()).abs() < 1e-6);
    }

    #[tokio::test]
    async fn save_and_load_keep_indices_and_idf() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("corpus.json");

        let mut stats = CorpusStats::new();
        observe(&mut stats, "zeta first");
        observe(&mut stats, "alpha zeta");
        stats.refresh_idf();
        // arrives after the snapshot, so it has no idf yet
        observe(&mut stats, "omega");
        stats.save(&path).await.unwrap();

        let loaded = CorpusStats::load(&path).await.unwrap();
        assert_eq!(loaded.tokens, stats.tokens);
        for token in &stats.tokens {
            assert_eq!(loaded.index_of(token), stats.index_of(token));
            assert_eq!(loaded.idf(token).to_bits(), stats.idf(token).to_bits());
            assert_eq!(loaded.document_frequency(token), stats.document_frequency(token));
        }
        assert_eq!(loaded.document_count(), 3);
        assert_eq!(loaded.idf("omega"), 0.0);
    }

    #[tokio::test]
    async fn load_rejects_inconsistent_corpus() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("corpus.json");
        tokio::fs::write(
            &path,
            r#"{
                "schema_version": 1,
                "tokens": ["a", "a"],
                "document_frequency": [1, 1],
                "documents": ["a"],
                "idf": []
            }"#,
        )
        .await
        .unwrap();
        assert!(matches!(
            CorpusStats::load(&path).await,
            Err(VectorStoreError::EmbeddingError(_))
        ));

        tokio::fs::write(
            &path,
            r#"{
                "schema_version": 1,
                "tokens": ["a"],
                "document_frequency": [],
                "documents": [],
                "idf": []
            }"#,
        )
        .await
        .unwrap();
        assert!(CorpusStats::load(&path).await.is_err());
    }

    #[test]
    fn unseen_bigram_frequency_floors_at_one() {
        let mut stats = CorpusStats::new();
        observe(&mut stats, "login(user)");
        stats.refresh_idf();
        assert_eq!(stats.document_frequency("login_user"), 0);
        assert!(stats.idf("login_user").is_finite());
    }
}
