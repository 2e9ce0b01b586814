mod indexer;
mod report;
pub mod snapshot;

pub use indexer::{index_terms, Indexer};
pub use report::RunReport;
pub use snapshot::{ChunkStore, SnapshotPaths};

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;

use crate::analyzer::SourceAnalyzer;
use crate::config::Config;
use crate::embed::{create_provider, EmbeddingBackend};
use crate::error::SearchError;
use crate::info_print;
use crate::lexical::LexicalIndex;
use crate::vectordb::VectorIndex;

/// Index (or incrementally update) the project at `config.root`
pub async fn index(config: Config) -> Result<()> {
    let backend = EmbeddingBackend::parse(&config.embedding.backend)?;

    info_print!("{}", "codeseek indexer".bright_cyan().bold());
    info_print!("{}", "=".repeat(60));
    info_print!("Project: {}", config.root.display());
    info_print!("Snapshot: {}", config.index_path().display());
    info_print!("Embedding backend: {}", backend);
    if config.indexing.full {
        info_print!("{}", "Full rebuild requested".yellow());
    }
    if !config.indexing.plugins.is_empty() {
        info_print!("Plugins: {}", config.indexing.plugins.join(", "));
    }

    let analyzer = SourceAnalyzer::from_config(&config);
    let provider = create_provider(backend)?;
    let mut indexer = Indexer::new(config, Box::new(analyzer), provider);
    let report = indexer.run()?;

    print_report(&report);
    info_print!(
        "\nRun {} to search your codebase",
        "codeseek search <query>".bright_cyan()
    );
    Ok(())
}

fn print_report(report: &RunReport) {
    info_print!("\n{}", "Summary".bright_green().bold());
    info_print!("{}", "-".repeat(60));
    info_print!(
        "   Files: {} scanned, {} added, {} changed, {} deleted, {} unchanged",
        report.files_scanned,
        report.files_added,
        report.files_changed,
        report.files_deleted,
        report.files_unchanged
    );
    if report.files_failed > 0 {
        crate::warn_print!("   {} files could not be read", report.files_failed.to_string().yellow());
    }
    info_print!(
        "   Chunks: {} added, {} removed, {} total",
        report.chunks_added, report.chunks_removed, report.chunks_total
    );
    info_print!(
        "   Embeddings: {} computed, {} reused, {} failed",
        report.embeddings_computed, report.embeddings_reused, report.embeddings_failed
    );
    if report.vector_store_reset {
        info_print!("   {}", "Vector store reset for the new embedding backend".yellow());
    }
    if !report.metadata_available {
        info_print!("   {}", "Metadata service unavailable; symbols and exact matches disabled".dimmed());
    }
    info_print!("   Elapsed: {:.2?}", report.elapsed);
}

/// Show what the snapshot of `config.root` contains
pub async fn stats(config: &Config) -> Result<()> {
    let paths = SnapshotPaths::new(config.index_path());
    if !paths.exists() {
        return Err(SearchError::NoIndex(paths.dir).into());
    }

    let manifest = snapshot::load_manifest(&paths);
    let chunks = snapshot::load_chunks(&paths);
    let lexical = snapshot::load_lexical(&paths);
    let vectors = snapshot::load_vectors(&paths);

    println!("{}", "Index Statistics".bright_cyan().bold());
    println!("{}", "=".repeat(60));
    println!("Snapshot: {}", paths.dir.display());

    match &manifest {
        Some(m) => println!("   Files: {}", m.len()),
        None => println!("   Files: {}", "manifest unreadable".red()),
    }

    match &chunks {
        Some(store) => {
            let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
            let mut by_plugin: BTreeMap<String, usize> = BTreeMap::new();
            for chunk in store.sorted() {
                *by_kind.entry(chunk.kind.to_string()).or_insert(0) += 1;
                if let Some(plugin) = &chunk.plugin {
                    *by_plugin.entry(plugin.clone()).or_insert(0) += 1;
                }
            }
            println!("   Chunks: {}", store.len());
            for (kind, count) in &by_kind {
                println!("      {}: {}", kind, count);
            }
            if !by_plugin.is_empty() {
                println!("   Plugins:");
                for (plugin, count) in &by_plugin {
                    println!("      {}: {} chunks", plugin, count);
                }
            }
        }
        None => println!("   Chunks: {}", "chunk store unreadable".red()),
    }

    match &lexical {
        Some(index) => println!(
            "   Lexical: {} documents, {} terms, avg length {:.1}",
            index.len(),
            index.vocabulary_size(),
            index.avg_doc_length()
        ),
        None => println!("   Lexical: {}", "missing (rebuilt on next index run)".yellow()),
    }

    match &vectors {
        Some(store) if !store.is_empty() => println!(
            "   Vectors: {} ({} dims, {})",
            store.len(),
            store.dimensions().unwrap_or(0),
            store.model_name().unwrap_or("unknown model")
        ),
        Some(_) => println!("   Vectors: none"),
        None => println!("   Vectors: {}", "missing (rebuilt on next index run)".yellow()),
    }

    println!(
        "   Disk usage: {:.2} MB",
        paths.disk_usage() as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}

/// Delete the snapshot directory of `config.root`
pub async fn clear(config: &Config, yes: bool) -> Result<()> {
    let paths = SnapshotPaths::new(config.index_path());
    if !paths.dir.exists() {
        println!("{}", "No index found, nothing to clear.".dimmed());
        return Ok(());
    }

    println!("Snapshot: {}", paths.dir.display());

    if !yes {
        println!("{}", "This will delete the index for this project!".yellow());
        print!("Are you sure? (y/N): ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Cancelled.".dimmed());
            return Ok(());
        }
    }

    std::fs::remove_dir_all(&paths.dir)?;
    println!("{}", "Index cleared.".green());
    Ok(())
}
