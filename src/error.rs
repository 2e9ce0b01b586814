use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the index and query engine that callers may want to
/// match on. Everything else travels as `anyhow::Error`.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("No index found at {}. Run `codeseek index` first to build it.", .0.display())]
    NoIndex(PathBuf),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Corrupt snapshot {}: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
