pub mod analyzer;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod embed;
pub mod error;
pub mod file;
pub mod index;
pub mod lexical;
pub mod manifest;
pub mod output;
pub mod search;
pub mod vectordb;

// Re-export commonly used types
pub use analyzer::{MetadataService, NoMetadata, SourceAnalyzer};
pub use chunker::{ChunkRecord, ContentKind, WindowChunker};
pub use config::Config;
pub use embed::{EmbeddingBackend, EmbeddingProvider, HashEmbedder};
pub use error::SearchError;
pub use file::{FileInfo, FileWalker, Language};
pub use index::{Indexer, RunReport};
pub use lexical::{Bm25Index, LexicalIndex};
pub use manifest::Manifest;
pub use search::{QueryEngine, QueryOptions, SearchHit};
pub use vectordb::{FlatVectorStore, VectorIndex};
