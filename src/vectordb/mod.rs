mod store;

pub use store::{cosine_similarity, FlatVectorStore, VectorHit};

use crate::error::SearchError;

/// Chunk-id keyed vector index.
pub trait VectorIndex {
    /// Insert or replace; rejects a dimensionality other than the store's
    fn add(&mut self, id: &str, vector: Vec<f32>) -> Result<(), SearchError>;

    fn remove(&mut self, id: &str) -> Option<Vec<f32>>;

    /// Top `top_k` by cosine similarity, descending, ties by id
    fn search(&self, query: &[f32], top_k: usize) -> Vec<VectorHit>;

    fn contains(&self, id: &str) -> bool;

    /// None until the first insert
    fn dimensions(&self) -> Option<usize>;

    fn model_name(&self) -> Option<&str>;

    /// Drop every vector and forget dimensionality and model
    fn reset(&mut self);

    fn ids(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
