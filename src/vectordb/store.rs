use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::VectorIndex;
use crate::error::SearchError;

/// Exact (brute-force) cosine vector store keyed by chunk id.
///
/// Dimensionality and model name are fixed by the first insert. Entries are
/// kept in a `BTreeMap` so the bincode snapshot is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatVectorStore {
    dimensions: Option<usize>,
    model: Option<String>,
    entries: BTreeMap<String, Vec<f32>>,
}

/// One vector search result
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
}

impl FlatVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which model produced the vectors; only takes effect on an
    /// empty store
    pub fn set_model(&mut self, model: &str) {
        if self.entries.is_empty() {
            self.model = Some(model.to_string());
        }
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("Failed to serialize vector store")
    }

    /// Decode a snapshot, rejecting entries whose length disagrees with the
    /// recorded dimensionality
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let store: Self = bincode::deserialize(bytes).context("Failed to decode vector store")?;

        match store.dimensions {
            Some(dim) => {
                if let Some((id, v)) = store.entries.iter().find(|(_, v)| v.len() != dim) {
                    anyhow::bail!(
                        "Vector {} has {} dimensions, store declares {}",
                        id,
                        v.len(),
                        dim
                    );
                }
            }
            None if !store.entries.is_empty() => {
                anyhow::bail!("Vector store has entries but no dimensionality")
            }
            None => {}
        }

        Ok(store)
    }
}

impl VectorIndex for FlatVectorStore {
    fn add(&mut self, id: &str, vector: Vec<f32>) -> Result<(), SearchError> {
        match self.dimensions {
            Some(expected) if expected != vector.len() => {
                return Err(SearchError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            None if self.entries.is_empty() => self.dimensions = Some(vector.len()),
            _ => {}
        }
        self.entries.insert(id.to_string(), vector);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Option<Vec<f32>> {
        self.entries.remove(id)
    }

    fn search(&self, query: &[f32], top_k: usize) -> Vec<VectorHit> {
        if top_k == 0 || self.dimensions != Some(query.len()) {
            return Vec::new();
        }

        let mut hits: Vec<VectorHit> = self
            .entries
            .iter()
            .map(|(id, v)| VectorHit {
                id: id.clone(),
                score: cosine_similarity(query, v),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        hits
    }

    fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn model_name(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.dimensions = None;
        self.model = None;
    }

    fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
