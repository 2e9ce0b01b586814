//! Incremental Okapi BM25 index over chunk terms.
//!
//! Every chunk keeps its own term-frequency map, and a global
//! document-frequency table plus the running total length are updated on add
//! and decremented exactly on removal, so add/remove cycles never drift.

pub mod tokenizer;

pub use tokenizer::{tokenize, unique_terms};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const DEFAULT_K1: f32 = 1.5;
pub const DEFAULT_B: f32 = 0.75;

/// Lexical ranking contract used by the indexer and the query engine.
pub trait LexicalIndex {
    /// Insert a document, replacing any previous document with the same id.
    fn add_document(&mut self, id: &str, terms: &[String]);

    /// Remove a document. Returns false if the id was unknown.
    fn remove_document(&mut self, id: &str) -> bool;

    /// Score every document against the query terms, omitting zero scores.
    fn score_all(&self, query_terms: &[String]) -> HashMap<String, f32>;

    fn contains(&self, id: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct DocEntry {
    length: u32,
    terms: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Index {
    k1: f32,
    b: f32,
    docs: BTreeMap<String, DocEntry>,
    doc_freq: BTreeMap<String, u32>,
    total_length: u64,
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_params(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            docs: BTreeMap::new(),
            doc_freq: BTreeMap::new(),
            total_length: 0,
        }
    }

    pub fn avg_doc_length(&self) -> f32 {
        if self.docs.is_empty() {
            return 0.0;
        }
        self.total_length as f32 / self.docs.len() as f32
    }

    /// Number of documents containing `term`.
    pub fn doc_freq(&self, term: &str) -> u32 {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }

    /// Distinct terms across the corpus.
    pub fn vocabulary_size(&self) -> usize {
        self.doc_freq.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.docs.keys()
    }

    pub fn clear(&mut self) {
        self.docs.clear();
        self.doc_freq.clear();
        self.total_length = 0;
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.doc_freq(term) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize lexical index")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let index: Self =
            serde_json::from_str(json).context("Failed to parse lexical index")?;
        index.validate()?;
        Ok(index)
    }

    /// Reject snapshots whose counters disagree with their documents.
    fn validate(&self) -> Result<()> {
        let total: u64 = self.docs.values().map(|d| d.length as u64).sum();
        if total != self.total_length {
            anyhow::bail!(
                "lexical index length mismatch: recorded {}, actual {}",
                self.total_length,
                total
            );
        }

        let mut df: BTreeMap<&str, u32> = BTreeMap::new();
        for doc in self.docs.values() {
            for term in doc.terms.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        let consistent = df.len() == self.doc_freq.len()
            && df
                .iter()
                .all(|(term, n)| self.doc_freq.get(*term) == Some(n));
        if !consistent {
            anyhow::bail!("lexical index document-frequency table is inconsistent");
        }

        Ok(())
    }
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalIndex for Bm25Index {
    fn add_document(&mut self, id: &str, terms: &[String]) {
        self.remove_document(id);

        let mut tf: BTreeMap<String, u32> = BTreeMap::new();
        for term in terms {
            *tf.entry(term.clone()).or_insert(0) += 1;
        }
        for term in tf.keys() {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
        }

        let length = terms.len() as u32;
        self.total_length += length as u64;
        self.docs.insert(id.to_string(), DocEntry { length, terms: tf });
    }

    fn remove_document(&mut self, id: &str) -> bool {
        let Some(doc) = self.docs.remove(id) else {
            return false;
        };

        for term in doc.terms.keys() {
            if let Some(df) = self.doc_freq.get_mut(term) {
                *df = df.saturating_sub(1);
                if *df == 0 {
                    self.doc_freq.remove(term);
                }
            }
        }
        self.total_length = self.total_length.saturating_sub(doc.length as u64);

        true
    }

    fn score_all(&self, query_terms: &[String]) -> HashMap<String, f32> {
        let mut seen = HashSet::new();
        let weighted: Vec<(&str, f32)> = query_terms
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .filter(|t| self.doc_freq.contains_key(t.as_str()))
            .map(|t| (t.as_str(), self.idf(t)))
            .collect();

        let mut scores = HashMap::new();
        if weighted.is_empty() {
            return scores;
        }

        let avgdl = self.avg_doc_length().max(1.0);

        for (id, doc) in &self.docs {
            let norm = self.k1 * (1.0 - self.b + self.b * doc.length as f32 / avgdl);
            let mut score = 0.0f32;

            for (term, idf) in &weighted {
                if let Some(&f) = doc.terms.get(*term) {
                    let f = f as f32;
                    score += idf * f * (self.k1 + 1.0) / (f + norm);
                }
            }

            if score != 0.0 {
                scores.insert(id.clone(), score);
            }
        }

        scores
    }

    fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn terms(text: &str) -> Vec<String> {
        tokenize(text)
    }

    fn corpus() -> Bm25Index {
        let mut index = Bm25Index::new();
        index.add_document("a", &terms("parse the manifest file and load entries"));
        index.add_document("b", &terms("vector store cosine similarity search"));
        index.add_document("c", &terms("load vector embeddings from the manifest"));
        index
    }

    #[test]
    fn test_scores_only_matching_documents() {
        let index = corpus();
        let scores = index.score_all(&terms("cosine"));

        assert_eq!(scores.len(), 1);
        assert!(scores["b"] > 0.0);
    }

    #[test]
    fn test_rarer_term_scores_higher() {
        let index = corpus();
        let manifest = index.score_all(&terms("manifest"));
        let cosine = index.score_all(&terms("cosine"));

        // "cosine" appears in one document, "manifest" in two
        assert!(cosine["b"] > manifest["a"]);
    }

    #[test]
    fn test_matches_reference_formula() {
        let mut index = Bm25Index::new();
        index.add_document("d1", &terms("alpha beta alpha"));
        index.add_document("d2", &terms("beta gamma"));

        let scores = index.score_all(&terms("alpha"));
        // N=2, n(alpha)=1, f=2, |d|=3, avgdl=2.5
        let idf = (1.0f32 + (2.0 - 1.0 + 0.5) / (1.0 + 0.5)).ln();
        let norm = 1.5 * (1.0 - 0.75 + 0.75 * 3.0 / 2.5);
        let expected = idf * 2.0 * 2.5 / (2.0 + norm);

        assert!((scores["d1"] - expected).abs() < 1e-5);
        assert!(!scores.contains_key("d2"));
    }

    #[test]
    fn test_adding_query_term_never_decreases_score() {
        let index = corpus();
        let one = index.score_all(&terms("load"));
        let two = index.score_all(&terms("load manifest"));
        let three = index.score_all(&terms("load manifest vector"));

        for (id, score) in &one {
            assert!(two[id] >= *score);
            assert!(three[id] >= two[id]);
        }
    }

    #[test]
    fn test_duplicate_query_terms_count_once() {
        let index = corpus();
        assert_eq!(
            index.score_all(&terms("cosine")),
            index.score_all(&terms("cosine cosine cosine"))
        );
    }

    #[test]
    fn test_remove_restores_counters_exactly() {
        let mut index = corpus();
        let before = index.clone();

        for _ in 0..5 {
            index.add_document("tmp", &terms("manifest manifest transient words"));
            assert!(index.remove_document("tmp"));
        }

        assert_eq!(index, before);
        assert!(!index.remove_document("tmp"));
    }

    #[test]
    fn test_re_adding_same_id_replaces_document() {
        let mut index = corpus();
        index.add_document("a", &terms("completely different"));

        assert_eq!(index.len(), 3);
        assert_eq!(index.doc_freq("manifest"), 1);
        assert_eq!(index.doc_freq("different"), 1);
        assert!(index.score_all(&terms("parse")).is_empty());
    }

    #[test]
    fn test_remove_drops_unused_terms() {
        let mut index = corpus();
        index.remove_document("b");

        assert_eq!(index.doc_freq("cosine"), 0);
        assert!(index.score_all(&terms("cosine")).is_empty());
    }

    #[test]
    fn test_json_round_trip_and_validation() {
        let index = corpus();
        let json = index.to_json().unwrap();
        let restored = Bm25Index::from_json(&json).unwrap();
        assert_eq!(restored, index);

        let broken = json.replace("\"total_length\":", "\"total_length\":9");
        assert!(Bm25Index::from_json(&broken).is_err());
    }

    #[test]
    fn test_empty_index_and_query() {
        let index = Bm25Index::new();
        assert!(index.is_empty());
        assert!(index.score_all(&terms("anything")).is_empty());
        assert!(corpus().score_all(&[]).is_empty());
    }
}
