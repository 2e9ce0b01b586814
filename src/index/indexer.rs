use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::report::RunReport;
use super::snapshot::{self, ChunkStore, SnapshotPaths};
use crate::analyzer::MetadataService;
use crate::chunker::{compute_hash, ChunkRecord, WindowChunker};
use crate::config::Config;
use crate::embed::{CachedEmbedder, EmbeddingProvider};
use crate::file::{FileInfo, FileWalker};
use crate::lexical::{tokenize, Bm25Index, LexicalIndex};
use crate::manifest::{FileChange, FileManifestEntry, Manifest};
use crate::output;
use crate::vectordb::{FlatVectorStore, VectorIndex};

/// Terms a chunk is indexed under: its text plus its path
pub fn index_terms(record: &ChunkRecord) -> Vec<String> {
    let mut terms = tokenize(&record.text);
    terms.extend(tokenize(&record.path));
    terms
}

/// Every store the indexer keeps in step
struct Stores {
    manifest: Manifest,
    chunks: ChunkStore,
    lexical: Bm25Index,
    vectors: FlatVectorStore,
}

/// Incremental batch indexer.
///
/// Owns all writes to the snapshot directory. A run loads the previous
/// snapshot, re-chunks only added or modified files, evicts what disappeared,
/// reconciles the stores against the manifest and writes everything back.
pub struct Indexer {
    config: Config,
    chunker: WindowChunker,
    metadata: Box<dyn MetadataService>,
    embedder: Option<CachedEmbedder>,

    /// Vectors evicted during this run, reusable if the same chunk id returns
    evicted: HashMap<String, Vec<f32>>,

    /// Chunk ids whose embedding failed during this run
    embed_failed: HashSet<String>,
}

impl Indexer {
    pub fn new(
        config: Config,
        metadata: Box<dyn MetadataService>,
        provider: Option<Box<dyn EmbeddingProvider>>,
    ) -> Self {
        let cache_entries = config.embedding.cache_entries;
        Self {
            chunker: WindowChunker::new(&config.chunking),
            embedder: provider.map(|p| CachedEmbedder::new(p, cache_entries)),
            config,
            metadata,
            evicted: HashMap::new(),
            embed_failed: HashSet::new(),
        }
    }

    pub fn paths(&self) -> SnapshotPaths {
        SnapshotPaths::new(self.config.index_path())
    }

    pub fn run(&mut self) -> Result<RunReport> {
        let start = Instant::now();
        let paths = self.paths();
        self.evicted.clear();
        self.embed_failed.clear();

        let mut report = RunReport {
            started_at: Some(Utc::now()),
            backend: self
                .embedder
                .as_ref()
                .map_or_else(|| "none".to_string(), |e| e.model_name().to_string()),
            metadata_available: self.metadata.has_index(),
            ..Default::default()
        };

        let mut stores = self.load_stores(&paths, &mut report);
        self.check_vector_compatibility(&mut stores.vectors, &mut report);

        // Collect
        let files = self.collect_files()?;
        report.files_scanned = files.len();
        info!("Found {} indexable files in {}", files.len(), self.config.root.display());

        // Diff
        let seen: HashSet<String> = files.iter().map(|f| f.rel_path.clone()).collect();
        let mut work = Vec::new();
        for file in files {
            let change = match stores.manifest.classify(&file.rel_path, file.size, file.mtime_ns) {
                // An entry whose chunks went missing cannot be trusted
                FileChange::Unchanged if !self.owns_all_chunks(&stores, &file.rel_path) => {
                    FileChange::Modified
                }
                change => change,
            };
            match change {
                FileChange::Unchanged => report.files_unchanged += 1,
                FileChange::Added => report.files_added += 1,
                FileChange::Modified => report.files_changed += 1,
            }
            if change != FileChange::Unchanged {
                work.push(file);
            }
        }

        // Deleted files are evicted before anything is re-chunked
        for path in stores.manifest.deleted(&seen) {
            if let Some(entry) = stores.manifest.remove(&path) {
                debug!("Evicting deleted file {}", path);
                report.chunks_removed += self.evict(&mut stores, &entry.chunk_ids);
                report.files_deleted += 1;
            }
        }

        let progress = self.progress_bar(work.len() as u64);
        for file in &work {
            progress.set_message(file.rel_path.clone());
            self.process_file(file, &mut stores, &mut report);
            progress.inc(1);
        }
        progress.finish_and_clear();

        self.reconcile(&mut stores, &mut report);

        report.chunks_total = stores.chunks.len();
        report.elapsed = start.elapsed();
        if let Some(embedder) = &self.embedder {
            let stats = embedder.stats();
            debug!(
                "Embedding cache: {} hits, {} misses ({:.1}% hit rate)",
                stats.hits,
                stats.misses,
                stats.hit_rate() * 100.0
            );
        }

        snapshot::save_stores(
            &paths,
            &stores.manifest,
            &stores.chunks,
            &stores.lexical,
            &stores.vectors,
        )?;
        std::fs::write(&paths.report, report.to_markdown())
            .with_context(|| format!("Failed to write {}", paths.report.display()))?;

        info!(
            "Indexed {} files: {} added, {} changed, {} deleted, {} chunks total",
            report.files_scanned,
            report.files_added,
            report.files_changed,
            report.files_deleted,
            report.chunks_total
        );

        Ok(report)
    }

    fn load_stores(&self, paths: &SnapshotPaths, report: &mut RunReport) -> Stores {
        let empty = || Stores {
            manifest: Manifest::new(),
            chunks: ChunkStore::new(),
            lexical: Bm25Index::new(),
            vectors: FlatVectorStore::new(),
        };

        if self.config.indexing.full {
            report.full_rebuild = true;
            return empty();
        }

        match (snapshot::load_manifest(paths), snapshot::load_chunks(paths)) {
            (Some(manifest), Some(chunks)) => Stores {
                manifest,
                chunks,
                lexical: snapshot::load_lexical(paths).unwrap_or_default(),
                vectors: snapshot::load_vectors(paths).unwrap_or_default(),
            },
            _ => {
                if paths.dir.exists() {
                    info!("Snapshot incomplete or unreadable, rebuilding from scratch");
                }
                report.full_rebuild = true;
                empty()
            }
        }
    }

    /// A store built by another model or dimensionality is dropped
    fn check_vector_compatibility(&self, vectors: &mut FlatVectorStore, report: &mut RunReport) {
        let Some(embedder) = &self.embedder else {
            return;
        };

        let stale = vectors.dimensions().is_some_and(|d| d != embedder.dimensions())
            || (!vectors.is_empty() && vectors.model_name() != Some(embedder.model_name()));
        if stale {
            info!(
                "Vector store was built with {} ({} dims); resetting for {} ({} dims)",
                vectors.model_name().unwrap_or("unknown model"),
                vectors.dimensions().unwrap_or(0),
                embedder.model_name(),
                embedder.dimensions()
            );
            vectors.reset();
            report.vector_store_reset = true;
        }
        vectors.set_model(embedder.model_name());
    }

    fn collect_files(&self) -> Result<Vec<FileInfo>> {
        let walker = FileWalker::from_config(&self.config.root, &self.config.indexing)
            .exclude_dir(self.config.index_dir.clone());
        let (files, _stats) = walker.walk()?;

        let plugins = &self.config.indexing.plugins;
        Ok(files
            .into_iter()
            .filter(|f| self.metadata.in_plugins(&f.rel_path, plugins))
            .collect())
    }

    fn owns_all_chunks(&self, stores: &Stores, path: &str) -> bool {
        stores
            .manifest
            .get(path)
            .is_some_and(|e| e.chunk_ids.iter().all(|id| stores.chunks.contains(id)))
    }

    /// Remove ids from every store; returns how many chunk records went away
    fn evict(&mut self, stores: &mut Stores, ids: &[String]) -> usize {
        let mut removed = 0;
        for id in ids {
            if stores.chunks.remove(id).is_some() {
                removed += 1;
            }
            stores.lexical.remove_document(id);
            if let Some(vector) = stores.vectors.remove(id) {
                self.evicted.insert(id.clone(), vector);
            }
        }
        removed
    }

    fn process_file(&mut self, file: &FileInfo, stores: &mut Stores, report: &mut RunReport) {
        let path = file.rel_path.as_str();

        if let Some(old) = stores.manifest.get(path) {
            let ids = old.chunk_ids.clone();
            report.chunks_removed += self.evict(stores, &ids);
        }

        let text = match std::fs::read_to_string(&file.path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {}", file.path.display(), e);
                stores.manifest.remove(path);
                report.files_failed += 1;
                return;
            }
        };

        let content_hash = compute_hash(&text);
        let (plugin, module) = self.metadata.infer_plugin_module(path);

        let mut chunk_ids = Vec::new();
        for mut record in self.chunker.chunk(path, &text, file.kind) {
            record.plugin = plugin.clone();
            record.module = module.clone();
            record.mtime_ns = file.mtime_ns;
            record.size = file.size;
            record.symbols = self
                .metadata
                .symbols_in_range(path, record.start_line, record.end_line);
            record.tags = self
                .metadata
                .tags_in_range(path, record.start_line, record.end_line);

            stores.lexical.add_document(&record.id, &index_terms(&record));
            self.embed_record(&record, &mut stores.vectors, report);

            chunk_ids.push(record.id.clone());
            stores.chunks.insert(record);
        }

        debug!("{}: {} chunks", path, chunk_ids.len());
        report.chunks_added += chunk_ids.len();

        stores.manifest.insert(
            path,
            FileManifestEntry {
                size: file.size,
                mtime_ns: file.mtime_ns,
                content_hash,
                indexed_at: Utc::now(),
                chunk_ids,
            },
        );
    }

    /// Give a chunk its vector: reuse one evicted earlier in the run,
    /// otherwise embed (cached by content hash). Returns whether it got one.
    fn embed_record(
        &mut self,
        record: &ChunkRecord,
        vectors: &mut FlatVectorStore,
        report: &mut RunReport,
    ) -> bool {
        let Some(embedder) = self.embedder.as_mut() else {
            return false;
        };

        let vector = match self.evicted.remove(&record.id) {
            Some(vector) if vector.len() == embedder.dimensions() => {
                report.embeddings_reused += 1;
                vector
            }
            _ => {
                let hits_before = embedder.stats().hits;
                match embedder.embed_keyed(&record.hash, &record.text) {
                    Ok(vector) => {
                        if embedder.stats().hits > hits_before {
                            report.embeddings_reused += 1;
                        } else {
                            report.embeddings_computed += 1;
                        }
                        vector.as_ref().clone()
                    }
                    Err(e) => {
                        warn!("Embedding failed for {}: {}", record.location(), e);
                        report.embeddings_failed += 1;
                        self.embed_failed.insert(record.id.clone());
                        return false;
                    }
                }
            }
        };

        match vectors.add(&record.id, vector) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping vector for {}: {}", record.location(), e);
                report.embeddings_failed += 1;
                self.embed_failed.insert(record.id.clone());
                false
            }
        }
    }

    /// Bring every store in line with the manifest: drop ids no file owns,
    /// restore owned ids a store is missing from their chunk records.
    fn reconcile(&mut self, stores: &mut Stores, report: &mut RunReport) {
        let owned = stores.manifest.owned_ids();

        let orphan_chunks: Vec<String> = stores
            .chunks
            .ids()
            .filter(|id| !owned.contains(*id))
            .cloned()
            .collect();
        for id in &orphan_chunks {
            stores.chunks.remove(id);
        }

        let orphan_terms: Vec<String> = stores
            .lexical
            .ids()
            .filter(|id| !owned.contains(*id))
            .cloned()
            .collect();
        for id in &orphan_terms {
            stores.lexical.remove_document(id);
        }

        let orphan_vectors: Vec<String> = stores
            .vectors
            .ids()
            .into_iter()
            .filter(|id| !owned.contains(id))
            .collect();
        for id in &orphan_vectors {
            stores.vectors.remove(id);
        }

        report.orphans_removed = orphan_chunks.len() + orphan_terms.len() + orphan_vectors.len();
        if report.orphans_removed > 0 {
            info!("Removed {} orphaned store entries", report.orphans_removed);
        }

        let mut owned: Vec<String> = owned.into_iter().collect();
        owned.sort();

        for id in &owned {
            let Some(record) = stores.chunks.get(id) else {
                continue;
            };

            if !stores.lexical.contains(id) {
                stores.lexical.add_document(id, &index_terms(record));
                report.lexical_repaired += 1;
            }

            if self.embedder.is_some()
                && !stores.vectors.contains(id)
                && !self.embed_failed.contains(id)
            {
                if self.embed_record(record, &mut stores.vectors, report) {
                    report.vectors_repaired += 1;
                }
            }
        }

        if report.lexical_repaired + report.vectors_repaired > 0 {
            info!(
                "Restored {} lexical entries and {} vectors from chunk records",
                report.lexical_repaired, report.vectors_repaired
            );
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.indexing.show_progress || output::is_quiet() || len == 0 {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓▒░ "));
        }
        pb
    }
}
