use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunker::Window;

/// Name of the optional per-project configuration file
pub const CONFIG_FILE_NAME: &str = ".codeseek.toml";

/// Default snapshot directory, relative to the project root
pub const DEFAULT_INDEX_DIR: &str = ".codeseek";

/// Configuration for one indexing or query run.
///
/// Built once (defaults, then `.codeseek.toml`, then CLI overrides) and
/// passed to each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root; never read from the config file
    #[serde(skip)]
    pub root: PathBuf,

    /// Snapshot directory, relative to `root`
    pub index_dir: String,

    pub indexing: IndexingConfig,

    pub chunking: ChunkingConfig,

    pub embedding: EmbeddingConfig,

    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Index source code and config files
    pub include_code: bool,

    /// Index prose (Markdown, text, reStructuredText)
    pub include_docs: bool,

    /// Ignore the manifest and rebuild every store from empty
    pub full: bool,

    /// Only index files belonging to these plugins (case-insensitive);
    /// empty means everything
    pub plugins: Vec<String>,

    /// Honour .gitignore / .ignore files while walking
    pub respect_gitignore: bool,

    /// Draw progress bars while indexing
    pub show_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub code: Window,
    pub config: Window,
    pub doc: Window,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend spec: a fastembed model name (`bge-small`, `minilm-l6`, ...),
    /// `hash[:dims]`, or `none`
    pub backend: String,

    /// Maximum number of vectors kept in the per-run embedding cache
    pub cache_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    pub bm25_n: usize,
    pub vec_n: usize,
    pub rerank: bool,
    pub rerank_k: usize,
}

impl Config {
    /// Defaults for `root`, overlaid with `<root>/.codeseek.toml` if present
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let file = root.join(CONFIG_FILE_NAME);

        let mut config = if file.is_file() {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Invalid configuration in {}", file.display()))?
        } else {
            Self::default()
        };

        config.root = root;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration rooted at `root`
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, window) in [
            ("code", self.chunking.code),
            ("config", self.chunking.config),
            ("doc", self.chunking.doc),
        ] {
            if window.size == 0 {
                return Err(crate::SearchError::Config(format!(
                    "chunking.{}.size must be greater than zero",
                    name
                ))
                .into());
            }
        }

        if self.index_dir.trim().is_empty() {
            return Err(crate::SearchError::Config("index_dir must not be empty".into()).into());
        }

        Ok(())
    }

    /// Absolute path of the snapshot directory
    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.index_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index_dir: DEFAULT_INDEX_DIR.to_string(),
            indexing: IndexingConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            include_code: true,
            include_docs: true,
            full: false,
            plugins: Vec::new(),
            respect_gitignore: true,
            show_progress: true,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            code: Window::new(300, 40),
            config: Window::new(250, 30),
            doc: Window::new(600, 80),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "bge-small".to_string(),
            cache_entries: 10_000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            bm25_n: 50,
            vec_n: 50,
            rerank: false,
            rerank_k: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.indexing.include_code);
        assert!(config.indexing.include_docs);
        assert!(!config.indexing.full);
        assert_eq!(config.chunking.code, Window::new(300, 40));
        assert_eq!(config.search.top_k, 10);
        assert_eq!(config.index_dir, ".codeseek");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [indexing]
            include_docs = false
            plugins = ["Core"]

            [chunking.doc]
            size = 400
            overlap = 50

            [embedding]
            backend = "hash:64"
            "#,
        )
        .unwrap();

        assert!(config.indexing.include_code);
        assert!(!config.indexing.include_docs);
        assert_eq!(config.indexing.plugins, vec!["Core".to_string()]);
        assert_eq!(config.chunking.doc, Window::new(400, 50));
        assert_eq!(config.chunking.code, Window::new(300, 40));
        assert_eq!(config.embedding.backend, "hash:64");
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = Config::from_toml("[chunking.code]\nsize = 0\noverlap = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_project_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "index_dir = \".search\"\n[search]\ntop_k = 3\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.search.top_k, 3);
        assert_eq!(config.index_path(), dir.path().join(".search"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.index_path(), dir.path().join(DEFAULT_INDEX_DIR));
    }
}
