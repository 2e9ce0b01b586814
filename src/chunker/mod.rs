use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

mod window;

pub use window::{Window, WindowChunker};

use crate::analyzer::{SymbolHit, TagHit};

/// Broad content class of a file; decides the chunk window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Code,
    Config,
    Doc,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Config => "config",
            Self::Doc => "doc",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-addressed line range of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,

    /// Project-relative path, `/`-separated
    pub path: String,

    pub plugin: Option<String>,
    pub module: Option<String>,

    pub kind: ContentKind,

    /// First line (1-based, inclusive)
    pub start_line: usize,

    /// Last line (1-based, inclusive)
    pub end_line: usize,

    pub text: String,

    #[serde(default)]
    pub symbols: Vec<SymbolHit>,

    #[serde(default)]
    pub tags: Vec<TagHit>,

    /// Owning file's mtime (ns since epoch) and size when chunked
    pub mtime_ns: u64,
    pub size: u64,

    /// SHA-256 of `text`
    pub hash: String,
}

impl ChunkRecord {
    /// Create a chunk for a line range; file metadata and enrichment are
    /// filled in by the indexer.
    pub fn new(
        path: impl Into<String>,
        kind: ContentKind,
        start_line: usize,
        end_line: usize,
        text: String,
    ) -> Self {
        let path = path.into();
        let hash = compute_hash(&text);
        let id = chunk_id(&path, start_line, end_line, &hash);

        Self {
            id,
            path,
            plugin: None,
            module: None,
            kind,
            start_line,
            end_line,
            text,
            symbols: Vec::new(),
            tags: Vec::new(),
            mtime_ns: 0,
            size: 0,
            hash,
        }
    }

    /// Navigable `path:start-end` location
    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.path, self.start_line, self.end_line)
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }
}

/// SHA-256 of content, lowercase hex
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Deterministic chunk identity: path, line range and content hash.
pub fn chunk_id(path: &str, start_line: usize, end_line: usize, content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update([0u8]);
    hasher.update(start_line.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(end_line.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(content_hash.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        let a = ChunkRecord::new("src/a.rs", ContentKind::Code, 1, 10, "fn a() {}".into());
        let b = ChunkRecord::new("src/a.rs", ContentKind::Code, 1, 10, "fn a() {}".into());
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 32);
    }

    #[test]
    fn test_chunk_id_changes_with_any_component() {
        let base = ChunkRecord::new("src/a.rs", ContentKind::Code, 1, 10, "fn a() {}".into());
        let moved = ChunkRecord::new("src/b.rs", ContentKind::Code, 1, 10, "fn a() {}".into());
        let shifted = ChunkRecord::new("src/a.rs", ContentKind::Code, 2, 11, "fn a() {}".into());
        let edited = ChunkRecord::new("src/a.rs", ContentKind::Code, 1, 10, "fn b() {}".into());

        assert_ne!(base.id, moved.id);
        assert_ne!(base.id, shifted.id);
        assert_ne!(base.id, edited.id);
    }

    #[test]
    fn test_location_and_contains() {
        let chunk = ChunkRecord::new("b.cpp", ContentKind::Code, 5, 20, String::new());
        assert_eq!(chunk.location(), "b.cpp:5-20");
        assert!(chunk.contains_line(5));
        assert!(chunk.contains_line(20));
        assert!(!chunk.contains_line(21));
        assert_eq!(chunk.line_count(), 16);
    }

    #[test]
    fn test_content_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ContentKind::Doc).unwrap(), "\"doc\"");
        assert_eq!(ContentKind::Config.to_string(), "config");
    }
}
