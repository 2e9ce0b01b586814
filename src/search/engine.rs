use anyhow::Result;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::analyzer::{MetadataService, SymbolHit, TagHit};
use crate::chunker::{ChunkRecord, ContentKind};
use crate::config::{Config, SearchConfig};
use crate::embed::EmbeddingProvider;
use crate::error::SearchError;
use crate::index::{index_terms, snapshot, SnapshotPaths};
use crate::lexical::{unique_terms, Bm25Index, LexicalIndex};
use crate::vectordb::{FlatVectorStore, VectorIndex};

pub const EXACT_WEIGHT: f32 = 3.0;
pub const LEXICAL_WEIGHT: f32 = 1.0;
pub const VECTOR_WEIGHT: f32 = 0.5;

pub const SYMBOL_BONUS: f32 = 0.2;
pub const TAG_BONUS: f32 = 0.1;
pub const TOKEN_BONUS: f32 = 0.01;

pub const SNIPPET_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub top_k: usize,
    pub bm25_n: usize,
    pub vec_n: usize,
    pub rerank: bool,
    pub rerank_k: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for QueryOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            top_k: config.top_k,
            bm25_n: config.bm25_n,
            vec_n: config.vec_n,
            rerank: config.rerank,
            rerank_k: config.rerank_k,
        }
    }
}

/// Best score per signal for one chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalScores {
    pub exact: f32,
    pub lexical: f32,
    pub vector: f32,
}

impl SignalScores {
    pub fn combined(&self) -> f32 {
        EXACT_WEIGHT * self.exact + LEXICAL_WEIGHT * self.lexical + VECTOR_WEIGHT * self.vector
    }
}

/// One ranked result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub location: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: ContentKind,
    pub plugin: Option<String>,
    pub module: Option<String>,
    pub snippet: String,
    pub score: f32,
    pub signals: SignalScores,
    pub symbols: Vec<SymbolHit>,
    pub tags: Vec<TagHit>,
    #[serde(skip)]
    pub text: String,
}

/// Read-only view over a snapshot that answers hybrid queries.
pub struct QueryEngine {
    chunks: HashMap<String, ChunkRecord>,

    /// Chunk ids per path, ordered by start line
    by_path: HashMap<String, Vec<String>>,

    lexical: Bm25Index,
    vectors: FlatVectorStore,
    metadata: Box<dyn MetadataService>,
    embedder: Option<Box<dyn EmbeddingProvider>>,
}

impl QueryEngine {
    /// Open the snapshot under `config.index_path()`.
    ///
    /// Fails with [`SearchError::NoIndex`] when no snapshot exists. A damaged
    /// lexical index is rebuilt in memory; a damaged vector store disables
    /// the vector signal.
    pub fn open(
        config: &Config,
        metadata: Box<dyn MetadataService>,
        embedder: Option<Box<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        let paths = SnapshotPaths::new(config.index_path());
        if !paths.exists() {
            return Err(SearchError::NoIndex(paths.dir).into());
        }

        let store = snapshot::load_chunks(&paths).ok_or_else(|| SearchError::Snapshot {
            path: paths.chunks.clone(),
            reason: "chunk store is missing or unreadable; re-run `codeseek index`".into(),
        })?;

        let chunks: Vec<ChunkRecord> = store.sorted().into_iter().cloned().collect();

        let lexical = snapshot::load_lexical(&paths).unwrap_or_else(|| {
            warn!("Lexical index unavailable, rebuilding it in memory");
            let mut index = Bm25Index::new();
            for chunk in &chunks {
                index.add_document(&chunk.id, &index_terms(chunk));
            }
            index
        });
        let vectors = snapshot::load_vectors(&paths).unwrap_or_default();

        Ok(Self::from_parts(chunks, lexical, vectors, metadata, embedder))
    }

    pub fn from_parts(
        chunks: Vec<ChunkRecord>,
        lexical: Bm25Index,
        vectors: FlatVectorStore,
        metadata: Box<dyn MetadataService>,
        embedder: Option<Box<dyn EmbeddingProvider>>,
    ) -> Self {
        let mut by_path: HashMap<String, Vec<String>> = HashMap::new();
        let mut sorted = chunks;
        sorted.sort_by(|a, b| a.path.cmp(&b.path).then(a.start_line.cmp(&b.start_line)));
        for chunk in &sorted {
            by_path.entry(chunk.path.clone()).or_default().push(chunk.id.clone());
        }

        Self {
            chunks: sorted.into_iter().map(|c| (c.id.clone(), c)).collect(),
            by_path,
            lexical,
            vectors,
            metadata,
            embedder,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether a query can use the vector signal at all. The store must have
    /// been built by the same model at the same dimensionality.
    pub fn vectors_enabled(&self) -> bool {
        let (Some(embedder), Some(dims)) = (&self.embedder, self.vectors.dimensions()) else {
            return false;
        };
        if embedder.dimensions() != dims {
            return false;
        }
        match self.vectors.model_name() {
            Some(model) if model != embedder.model_name() => {
                warn!(
                    "Vector store was built by {} but the query backend is {}; using exact and lexical results only",
                    model,
                    embedder.model_name()
                );
                false
            }
            _ => true,
        }
    }

    pub fn query(&mut self, text: &str, options: &QueryOptions) -> Vec<SearchHit> {
        let tokens = unique_terms(text);
        let mut signals: HashMap<String, SignalScores> = HashMap::new();

        // Exact
        if !text.trim().is_empty() {
            for hit in self.metadata.exact_matches(text) {
                if let Some(id) = self.chunk_for_line(&hit.path, hit.line) {
                    signals.entry(id.to_string()).or_default().exact = 1.0;
                }
            }
        }

        // Lexical
        let mut lexical: Vec<(String, f32)> = self.lexical.score_all(&tokens).into_iter().collect();
        lexical.sort_by(|a, b| by_score_desc(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
        lexical.truncate(options.bm25_n);
        for (id, score) in lexical {
            let entry = signals.entry(id).or_default();
            entry.lexical = entry.lexical.max(score);
        }

        // Vector
        if let Some(query_vector) = self.query_vector(text) {
            for hit in self.vectors.search(&query_vector, options.vec_n) {
                signals.entry(hit.id).or_default().vector = hit.score;
            }
        }

        let mut hits: Vec<SearchHit> = signals
            .into_iter()
            .filter_map(|(id, scores)| {
                let chunk = self.chunks.get(&id)?;
                Some(self.make_hit(chunk, scores, &tokens))
            })
            .collect();

        hits.sort_by(rank_order);

        if options.rerank {
            let k = options.rerank_k.min(hits.len());
            rerank(&mut hits[..k], &tokens);
        }

        hits.truncate(options.top_k);
        debug!("Query {:?} produced {} hits", text, hits.len());
        hits
    }

    fn query_vector(&mut self, text: &str) -> Option<Vec<f32>> {
        if !self.vectors_enabled() {
            return None;
        }
        let embedder = self.embedder.as_mut()?;
        match embedder.embed(text) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("Query embedding failed, using lexical results only: {}", e);
                None
            }
        }
    }

    /// Chunk of `path` containing `line`. With overlapping windows the one
    /// whose midpoint is nearest the line wins, then the shorter range, then
    /// the earlier start.
    pub fn chunk_for_line(&self, path: &str, line: usize) -> Option<&str> {
        self.by_path
            .get(path)?
            .iter()
            .filter_map(|id| self.chunks.get(id))
            .filter(|c| c.contains_line(line))
            .min_by_key(|c| {
                // twice the distance, to stay in integers
                let distance = (c.start_line + c.end_line).abs_diff(2 * line);
                (distance, c.line_count(), c.start_line)
            })
            .map(|c| c.id.as_str())
    }

    fn make_hit(&self, chunk: &ChunkRecord, signals: SignalScores, tokens: &[String]) -> SearchHit {
        SearchHit {
            id: chunk.id.clone(),
            location: chunk.location(),
            path: chunk.path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            kind: chunk.kind,
            plugin: chunk.plugin.clone(),
            module: chunk.module.clone(),
            snippet: snippet(&chunk.text, tokens),
            score: signals.combined(),
            signals,
            symbols: chunk.symbols.clone(),
            tags: chunk.tags.clone(),
            text: chunk.text.clone(),
        }
    }
}

fn by_score_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    by_score_desc(a.score, b.score)
        .then_with(|| a.path.cmp(&b.path))
        .then_with(|| a.start_line.cmp(&b.start_line))
}

/// Boost the slice by attached metadata and literal token presence, then
/// reorder only that slice
pub fn rerank(hits: &mut [SearchHit], tokens: &[String]) {
    for hit in hits.iter_mut() {
        let lower = hit.text.to_lowercase();
        let present = tokens.iter().filter(|t| lower.contains(t.as_str())).count();
        hit.score += SYMBOL_BONUS * hit.symbols.len() as f32
            + TAG_BONUS * hit.tags.len() as f32
            + TOKEN_BONUS * present as f32;
    }
    hits.sort_by(rank_order);
}

/// First non-empty line containing a query token, else the first non-empty
/// line; trimmed and clipped
pub fn snippet(text: &str, tokens: &[String]) -> String {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.clone().next().unwrap_or("");

    let line = lines
        .find(|l| {
            let lower = l.to_lowercase();
            tokens.iter().any(|t| lower.contains(t.as_str()))
        })
        .unwrap_or(first);

    line.chars().take(SNIPPET_MAX_CHARS).collect()
}
