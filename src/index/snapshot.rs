use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::chunker::ChunkRecord;
use crate::lexical::Bm25Index;
use crate::manifest::Manifest;
use crate::vectordb::FlatVectorStore;

/// File layout of the snapshot directory
#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    pub dir: PathBuf,
    pub manifest: PathBuf,
    pub chunks: PathBuf,
    pub lexical: PathBuf,
    pub vectors: PathBuf,
    pub report: PathBuf,
}

impl SnapshotPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            manifest: dir.join("manifest.json"),
            chunks: dir.join("chunks.jsonl"),
            lexical: dir.join("lexical.json"),
            vectors: dir.join("vectors.bin"),
            report: dir.join("report.md"),
            dir,
        }
    }

    /// A snapshot exists once a manifest has been written
    pub fn exists(&self) -> bool {
        self.manifest.is_file()
    }

    /// Total bytes of the snapshot files present on disk
    pub fn disk_usage(&self) -> u64 {
        [
            &self.manifest,
            &self.chunks,
            &self.lexical,
            &self.vectors,
            &self.report,
        ]
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum()
    }
}

/// Chunk records keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkStore {
    chunks: BTreeMap<String, ChunkRecord>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chunk: ChunkRecord) {
        self.chunks.insert(chunk.id.clone(), chunk);
    }

    pub fn remove(&mut self, id: &str) -> Option<ChunkRecord> {
        self.chunks.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&ChunkRecord> {
        self.chunks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.chunks.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.chunks.keys()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Records ordered by path, then start line
    pub fn sorted(&self) -> Vec<&ChunkRecord> {
        let mut records: Vec<&ChunkRecord> = self.chunks.values().collect();
        records.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.start_line.cmp(&b.start_line))
                .then(a.end_line.cmp(&b.end_line))
        });
        records
    }

    pub fn to_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for record in self.sorted() {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn from_jsonl(content: &str) -> Result<Self> {
        let mut store = Self::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ChunkRecord = serde_json::from_str(line)
                .with_context(|| format!("Invalid chunk record on line {}", i + 1))?;
            store.insert(record);
        }
        Ok(store)
    }
}

fn load_with<T>(path: &Path, what: &str, parse: impl FnOnce(&Path) -> Result<T>) -> Option<T> {
    if !path.exists() {
        debug!("No {} at {}", what, path.display());
        return None;
    }
    match parse(path) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupt {} {}: {:#}", what, path.display(), e);
            None
        }
    }
}

pub fn load_manifest(paths: &SnapshotPaths) -> Option<Manifest> {
    load_with(&paths.manifest, "manifest", Manifest::load)
}

pub fn load_chunks(paths: &SnapshotPaths) -> Option<ChunkStore> {
    load_with(&paths.chunks, "chunk store", |p| {
        ChunkStore::from_jsonl(&std::fs::read_to_string(p)?)
    })
}

pub fn load_lexical(paths: &SnapshotPaths) -> Option<Bm25Index> {
    load_with(&paths.lexical, "lexical index", |p| {
        Bm25Index::from_json(&std::fs::read_to_string(p)?)
    })
}

pub fn load_vectors(paths: &SnapshotPaths) -> Option<FlatVectorStore> {
    load_with(&paths.vectors, "vector store", |p| {
        FlatVectorStore::from_bytes(&std::fs::read(p)?)
    })
}

/// Write every store; the manifest goes last so a run interrupted midway
/// leaves the previous manifest in charge
pub fn save_stores(
    paths: &SnapshotPaths,
    manifest: &Manifest,
    chunks: &ChunkStore,
    lexical: &Bm25Index,
    vectors: &FlatVectorStore,
) -> Result<()> {
    std::fs::create_dir_all(&paths.dir)
        .with_context(|| format!("Failed to create {}", paths.dir.display()))?;

    write(&paths.chunks, chunks.to_jsonl()?.as_bytes())?;
    write(&paths.lexical, lexical.to_json()?.as_bytes())?;
    write(&paths.vectors, &vectors.to_bytes()?)?;
    manifest.save(&paths.manifest)
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ContentKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(path: &str, start: usize, end: usize) -> ChunkRecord {
        ChunkRecord::new(path, ContentKind::Code, start, end, format!("{}:{}", path, start))
    }

    #[test]
    fn test_jsonl_ordered_by_path_then_line() {
        let mut store = ChunkStore::new();
        store.insert(record("b.rs", 1, 5));
        store.insert(record("a.rs", 20, 30));
        store.insert(record("a.rs", 1, 10));

        let jsonl = store.to_jsonl().unwrap();
        let order: Vec<(String, usize)> = jsonl
            .lines()
            .map(|l| {
                let r: ChunkRecord = serde_json::from_str(l).unwrap();
                (r.path, r.start_line)
            })
            .collect();
        assert_eq!(
            order,
            vec![("a.rs".into(), 1), ("a.rs".into(), 20), ("b.rs".into(), 1)]
        );
        assert_eq!(ChunkStore::from_jsonl(&jsonl).unwrap(), store);
    }

    #[test]
    fn test_corrupt_files_load_as_absent() {
        let dir = TempDir::new().unwrap();
        let paths = SnapshotPaths::new(dir.path());
        assert!(!paths.exists());
        assert!(load_manifest(&paths).is_none());

        std::fs::write(&paths.manifest, "{ broken").unwrap();
        std::fs::write(&paths.chunks, "{\"id\": 1}\n").unwrap();
        std::fs::write(&paths.lexical, "[]").unwrap();
        std::fs::write(&paths.vectors, b"\x01\x02").unwrap();

        assert!(load_manifest(&paths).is_none());
        assert!(load_chunks(&paths).is_none());
        assert!(load_lexical(&paths).is_none());
        assert!(load_vectors(&paths).is_none());
    }

    #[test]
    fn test_save_and_reload_stores() {
        let dir = TempDir::new().unwrap();
        let paths = SnapshotPaths::new(dir.path().join(".codeseek"));

        let mut chunks = ChunkStore::new();
        chunks.insert(record("a.rs", 1, 3));
        let manifest = Manifest::new();
        let lexical = Bm25Index::new();
        let vectors = FlatVectorStore::new();

        save_stores(&paths, &manifest, &chunks, &lexical, &vectors).unwrap();

        assert!(paths.exists());
        assert_eq!(load_chunks(&paths).unwrap(), chunks);
        assert_eq!(load_manifest(&paths).unwrap(), manifest);
        assert_eq!(load_vectors(&paths).unwrap(), vectors);
        assert!(paths.disk_usage() > 0);
    }
}
