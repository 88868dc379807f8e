use crate::corpus::CorpusStats;
use crate::error::{Result, VectorStoreError};
use crate::features;
use crate::tokenizer;
use ndarray::ArrayView1;
use std::collections::HashMap;

pub const EMBEDDING_DIMENSION: usize = 384;

/// Feature-engineered TF-IDF embedding generator.
///
/// Deterministic for a given history of inputs, but not across histories: IDF depends on every
/// document seen so far, so the same text embedded at different points yields different
/// vectors.
///
/// `embed_batch` records all texts, refreshes IDF, then vectorizes. `embed` records its text
/// (vocabulary and frequency counters grow) but vectorizes against the previous IDF snapshot.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingGenerator {
    corpus: CorpusStats,
}

impl EmbeddingGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from previously saved corpus statistics.
    #[must_use]
    pub const fn from_corpus(corpus: CorpusStats) -> Self {
        Self { corpus }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    #[must_use]
    pub const fn corpus(&self) -> &CorpusStats {
        &self.corpus
    }

    pub fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let tokens = self.observe(text);
        self.vectorize(text, &tokens)
    }

    /// Embed a batch with one IDF refresh covering every text in it.
    ///
    /// Fails as a whole: if any vector comes out malformed no vectors are returned.
    pub fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let token_streams: Vec<Vec<String>> =
            texts.iter().map(|text| self.observe(text)).collect();
        self.corpus.refresh_idf();
        texts
            .iter()
            .zip(token_streams.iter())
            .map(|(text, tokens)| self.vectorize(text, tokens))
            .collect()
    }

    /// Feed texts into the corpus without producing vectors, then refresh IDF.
    pub fn warm(&mut self, texts: &[&str]) {
        for text in texts {
            self.observe(text);
        }
        self.corpus.refresh_idf();
    }

    fn observe(&mut self, text: &str) -> Vec<String> {
        let tokens = tokenizer::tokenize(text);
        self.corpus.observe(text.to_lowercase(), &tokens);
        tokens
    }

    fn vectorize(&self, text: &str, tokens: &[String]) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; EMBEDDING_DIMENSION];

        if !tokens.is_empty() {
            let total = tokens.len() as f32;
            for (token, count) in term_counts(tokens) {
                let weight = (count as f32 / total) * self.corpus.idf(token);
                if weight == 0.0 {
                    continue;
                }
                let slot = match self.corpus.index_of(token) {
                    Some(index) if index < EMBEDDING_DIMENSION => index,
                    _ => (fnv1a_64(token.as_bytes()) % EMBEDDING_DIMENSION as u64) as usize,
                };
                vector[slot] += weight;
            }
        }

        let words = tokenizer::words(text);
        features::apply(text, &words, &mut vector);
        normalize(&mut vector);

        ensure_dimension(&vector, EMBEDDING_DIMENSION)?;
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorStoreError::EmbeddingError(format!(
                "non-finite component in embedding of {} byte text",
                text.len()
            )));
        }
        Ok(vector)
    }

    #[must_use]
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let a = ArrayView1::from(a);
        let b = ArrayView1::from(b);

        let dot_product = a.dot(&b);
        let norm_a = a.dot(&a).sqrt();
        let norm_b = b.dot(&b).sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

/// Token counts in first-appearance order, so accumulation order is stable.
fn term_counts(tokens: &[String]) -> Vec<(&str, usize)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for token in tokens {
        match positions.get(token.as_str()) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(token.as_str(), counts.len());
                counts.push((token.as_str(), 1));
            }
        }
    }
    counts
}

const fn ensure_dimension(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() == expected {
        Ok(())
    } else {
        Err(VectorStoreError::InvalidDimension {
            expected,
            actual: vec.len(),
        })
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
