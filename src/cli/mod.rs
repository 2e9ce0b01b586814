use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::embed::EmbeddingBackend;
use crate::search::SearchArgs;

/// Hybrid code search: exact, lexical and semantic signals over a local index
#[derive(Parser, Debug)]
#[command(name = "codeseek")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output (only show results/errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Embedding backend: bge-small, minilm-l6, bge-base, mxbai-large,
    /// hash[:dims] or none
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or incrementally update the index
    Index {
        /// Project root (defaults to current directory)
        path: Option<PathBuf>,

        /// Ignore the previous snapshot and rebuild everything
        #[arg(long)]
        full: bool,

        /// Skip source code and config files
        #[arg(long)]
        no_code: bool,

        /// Skip documentation files
        #[arg(long)]
        no_docs: bool,

        /// Only index files of this plugin (repeatable)
        #[arg(long = "plugin", value_name = "NAME")]
        plugins: Vec<String>,
    },

    /// Search the index
    Search {
        /// Search query (an identifier, a phrase, or a question)
        query: String,

        /// Project root (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Maximum results to return
        #[arg(short = 'm', long)]
        max_results: Option<usize>,

        /// Lexical candidates to keep
        #[arg(long)]
        bm25_n: Option<usize>,

        /// Vector candidates to keep
        #[arg(long)]
        vec_n: Option<usize>,

        /// Boost the top results by symbols, tags and token presence
        #[arg(long)]
        rerank: bool,

        /// How many top results the rerank pass looks at
        #[arg(long)]
        rerank_k: Option<usize>,

        /// Show chunk content instead of snippets
        #[arg(short, long)]
        content: bool,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show statistics about the index
    Stats {
        /// Project root (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Delete the index
    Clear {
        /// Project root (defaults to current directory)
        path: Option<PathBuf>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Configuration for a project root, with the global `--model` applied
fn load_config(path: Option<&Path>, model: Option<&str>) -> Result<Config> {
    let root = path.unwrap_or_else(|| Path::new("."));
    let root = root
        .canonicalize()
        .with_context(|| format!("Cannot access {}", root.display()))?;

    let mut config = Config::load(root)?;
    if let Some(model) = model {
        EmbeddingBackend::parse(model)?;
        config.embedding.backend = model.to_string();
    }
    Ok(config)
}

pub async fn run(cli: Cli) -> Result<()> {
    if cli.quiet {
        crate::output::set_quiet(true);
    }
    let model = cli.model.as_deref();

    match cli.command {
        Commands::Index {
            path,
            full,
            no_code,
            no_docs,
            plugins,
        } => {
            let mut config = load_config(path.as_deref(), model)?;
            config.indexing.full |= full;
            config.indexing.include_code &= !no_code;
            config.indexing.include_docs &= !no_docs;
            if !plugins.is_empty() {
                config.indexing.plugins = plugins;
            }
            crate::index::index(config).await
        }
        Commands::Search {
            query,
            path,
            max_results,
            bm25_n,
            vec_n,
            rerank,
            rerank_k,
            content,
            json,
        } => {
            // Keep stdout clean for machine consumers
            if json {
                crate::output::set_quiet(true);
            }
            let config = load_config(path.as_deref(), model)?;
            let args = SearchArgs {
                max_results,
                bm25_n,
                vec_n,
                rerank,
                rerank_k,
                content,
                json,
            };
            crate::search::search(&query, &config, args).await
        }
        Commands::Stats { path } => {
            let config = load_config(path.as_deref(), model)?;
            crate::index::stats(&config).await
        }
        Commands::Clear { path, yes } => {
            let config = load_config(path.as_deref(), model)?;
            crate::index::clear(&config, yes).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_index_flags() {
        let cli = Cli::parse_from([
            "codeseek", "index", "proj", "--full", "--no-docs", "--plugin", "Combat", "--plugin",
            "Audio",
        ]);
        match cli.command {
            Commands::Index {
                path,
                full,
                no_code,
                no_docs,
                plugins,
            } => {
                assert_eq!(path, Some(PathBuf::from("proj")));
                assert!(full && no_docs && !no_code);
                assert_eq!(plugins, vec!["Combat", "Audio"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_flags() {
        let cli = Cli::parse_from([
            "codeseek", "--model", "hash:64", "search", "FooBar", "-m", "5", "--rerank",
            "--rerank-k", "8", "--json",
        ]);
        assert_eq!(cli.model.as_deref(), Some("hash:64"));
        match cli.command {
            Commands::Search {
                query,
                max_results,
                rerank,
                rerank_k,
                json,
                ..
            } => {
                assert_eq!(query, "FooBar");
                assert_eq!(max_results, Some(5));
                assert!(rerank && json);
                assert_eq!(rerank_k, Some(8));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_load_config_rejects_unknown_model() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_config(Some(dir.path()), Some("word2vec")).is_err());

        let config = load_config(Some(dir.path()), Some("none")).unwrap();
        assert_eq!(config.embedding.backend, "none");
    }
}
