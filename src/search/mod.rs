mod engine;

pub use engine::{
    rerank, snippet, QueryEngine, QueryOptions, SearchHit, SignalScores, EXACT_WEIGHT,
    LEXICAL_WEIGHT, VECTOR_WEIGHT,
};

use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::analyzer::SourceAnalyzer;
use crate::config::Config;
use crate::embed::{create_provider, EmbeddingBackend};
use crate::info_print;

/// Flags of `codeseek search` on top of the configured query defaults
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub max_results: Option<usize>,
    pub bm25_n: Option<usize>,
    pub vec_n: Option<usize>,
    pub rerank: bool,
    pub rerank_k: Option<usize>,
    pub content: bool,
    pub json: bool,
}

/// Search the snapshot of `config.root` and print the hits
pub async fn search(query: &str, config: &Config, args: SearchArgs) -> Result<()> {
    let mut options = QueryOptions::from(&config.search);
    if let Some(m) = args.max_results {
        options.top_k = m;
    }
    if let Some(n) = args.bm25_n {
        options.bm25_n = n;
    }
    if let Some(n) = args.vec_n {
        options.vec_n = n;
    }
    if let Some(k) = args.rerank_k {
        options.rerank_k = k;
    }
    options.rerank |= args.rerank;

    let backend = EmbeddingBackend::parse(&config.embedding.backend)?;

    let start = Instant::now();
    let metadata = Box::new(SourceAnalyzer::from_config(config));
    let provider = create_provider(backend)?;
    let mut engine = QueryEngine::open(config, metadata, provider)?;
    let load_duration = start.elapsed();

    let start = Instant::now();
    let hits = engine.query(query, &options);
    let search_duration = start.elapsed();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    info_print!("{}", "Search Results".bright_cyan().bold());
    info_print!("{}", "=".repeat(60));
    info_print!("Query: \"{}\"", query.bright_yellow());
    info_print!(
        "Found {} results in {:?} (snapshot load {:?}){}",
        hits.len(),
        search_duration,
        load_duration,
        if engine.vectors_enabled() { "" } else { ", lexical only" }
    );
    info_print!();

    if hits.is_empty() {
        println!("{}", "No matches found.".dimmed());
        info_print!(
            "Run {} if the codebase changed",
            "codeseek index".bright_cyan()
        );
        return Ok(());
    }

    for hit in &hits {
        print_hit(hit, args.content);
    }

    Ok(())
}

fn print_hit(hit: &SearchHit, show_content: bool) {
    println!("{}", "─".repeat(60));
    println!("{}", hit.location.bright_green());

    let mut details = format!(
        "   {} • score {:.3} (exact {:.0}, lexical {:.3}, vector {:.3})",
        hit.kind, hit.score, hit.signals.exact, hit.signals.lexical, hit.signals.vector
    );
    if let Some(plugin) = &hit.plugin {
        details.push_str(&format!(" • plugin {}", plugin));
    }
    if let Some(module) = &hit.module {
        details.push_str(&format!(" • module {}", module));
    }
    println!("{}", details.dimmed());

    if !hit.symbols.is_empty() {
        let names: Vec<String> = hit
            .symbols
            .iter()
            .take(5)
            .map(|s| format!("{} {} (L{})", s.kind, s.name, s.line))
            .collect();
        println!("   {}", names.join(", ").bright_cyan());
    }
    for tag in hit.tags.iter().take(3) {
        println!("   {} L{}: {}", tag.tag.yellow(), tag.line, tag.text);
    }

    if show_content {
        for line in hit.text.lines().take(20) {
            println!("   │ {}", line.dimmed());
        }
        if hit.text.lines().count() > 20 {
            println!("   │ {}", "...".dimmed());
        }
    } else {
        println!("   {}", hit.snippet);
    }
    println!();
}
