//! Durable per-file indexing state and change detection.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileManifestEntry {
    pub size: u64,
    pub mtime_ns: u64,

    /// SHA-256 of the whole file when it was last chunked
    pub content_hash: String,

    pub indexed_at: DateTime<Utc>,

    /// Owned chunk ids, ordered by start line
    pub chunk_ids: Vec<String>,
}

/// How a walked file relates to the previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Unchanged,
    Added,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub entries: BTreeMap<String, FileManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a walked file against its prior entry. Size and mtime decide;
    /// content is not hashed here.
    pub fn classify(&self, path: &str, size: u64, mtime_ns: u64) -> FileChange {
        match self.entries.get(path) {
            None => FileChange::Added,
            Some(e) if e.size == size && e.mtime_ns == mtime_ns => FileChange::Unchanged,
            Some(_) => FileChange::Modified,
        }
    }

    /// Tracked paths that were not seen in the current walk, sorted
    pub fn deleted(&self, seen: &HashSet<String>) -> Vec<String> {
        self.entries
            .keys()
            .filter(|p| !seen.contains(*p))
            .cloned()
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<&FileManifestEntry> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: FileManifestEntry) {
        self.entries.insert(path.into(), entry);
    }

    pub fn remove(&mut self, path: &str) -> Option<FileManifestEntry> {
        self.entries.remove(path)
    }

    /// Every chunk id owned by some entry
    pub fn owned_ids(&self) -> HashSet<String> {
        self.entries
            .values()
            .flat_map(|e| e.chunk_ids.iter().cloned())
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.entries.values().map(|e| e.chunk_ids.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json).context("Failed to parse manifest")?;
        if manifest.schema_version != SCHEMA_VERSION {
            bail!(
                "Unsupported manifest schema version {} (expected {})",
                manifest.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize manifest")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
