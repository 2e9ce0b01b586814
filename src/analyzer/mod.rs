//! Structural metadata for chunks: plugin/module ownership, symbol
//! definitions, comment tags and literal line matches.
//!
//! The engine only talks to the [`MetadataService`] trait. [`NoMetadata`]
//! stands in when no analyzer is available; [`SourceAnalyzer`] analyses the
//! project tree in-process with tree-sitter.

mod extractor;
mod grammar;
mod parser;

pub use extractor::{extract_symbols, get_extractor, LanguageExtractor};
pub use grammar::grammar_for;
pub use parser::{CodeParser, ParsedCode};

use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::IndexingConfig;
use crate::file::{FileWalker, Language};

/// Upper bound on literal matches returned for one query
pub const MAX_EXACT_MATCHES: usize = 1000;

/// Comment markers reported as tags
pub const TAG_MARKERS: &[&str] = &["TODO", "FIXME", "HACK", "XXX", "NOTE", "BUG"];

/// A definition found in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHit {
    pub name: String,
    pub kind: String,
    pub line: usize,
    pub end_line: usize,
}

/// A tagged line, e.g. a `TODO:` comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagHit {
    pub tag: String,
    pub line: usize,
    pub text: String,
}

/// One literal match of a query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineHit {
    pub path: String,
    pub line: usize,
}

/// Source of structural metadata consumed by the indexer and query engine.
///
/// Every method must degrade to an empty answer rather than fail.
pub trait MetadataService {
    /// Plugin and module owning a project-relative path
    fn infer_plugin_module(&self, path: &str) -> (Option<String>, Option<String>) {
        infer_plugin_module(path)
    }

    /// Whether `path` belongs to one of `plugins` (case-insensitive). An
    /// empty filter admits every path.
    fn in_plugins(&self, path: &str, plugins: &[String]) -> bool {
        if plugins.is_empty() {
            return true;
        }
        let (plugin, _) = self.infer_plugin_module(path);
        plugin.is_some_and(|p| plugins.iter().any(|want| want.eq_ignore_ascii_case(&p)))
    }

    /// Definitions starting within `start..=end` (1-based lines)
    fn symbols_in_range(&self, path: &str, start: usize, end: usize) -> Vec<SymbolHit>;

    /// Tags on lines within `start..=end`
    fn tags_in_range(&self, path: &str, start: usize, end: usize) -> Vec<TagHit>;

    /// Lines containing `query` literally
    fn exact_matches(&self, query: &str) -> Vec<LineHit>;

    /// Whether real metadata backs this service
    fn has_index(&self) -> bool;
}

/// Absent metadata service
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataService for NoMetadata {
    fn symbols_in_range(&self, _path: &str, _start: usize, _end: usize) -> Vec<SymbolHit> {
        Vec::new()
    }

    fn tags_in_range(&self, _path: &str, _start: usize, _end: usize) -> Vec<TagHit> {
        Vec::new()
    }

    fn exact_matches(&self, _query: &str) -> Vec<LineHit> {
        Vec::new()
    }

    fn has_index(&self) -> bool {
        false
    }
}

/// Infer `(plugin, module)` from `…/Plugins/<plugin>/…/Source/<module>/…`
/// style layouts. Either part is None when the layout does not say.
pub fn infer_plugin_module(path: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = path.split('/').collect();
    let dirs = &parts[..parts.len().saturating_sub(1)];

    let plugin = dirs
        .iter()
        .position(|p| p.eq_ignore_ascii_case("plugins"))
        .and_then(|i| dirs.get(i + 1))
        .map(|s| s.to_string());

    let module = dirs
        .iter()
        .rposition(|p| p.eq_ignore_ascii_case("source"))
        .and_then(|i| dirs.get(i + 1))
        .map(|s| s.to_string());

    (plugin, module)
}

#[derive(Debug, Default)]
struct FileOutline {
    symbols: Vec<SymbolHit>,
    tags: Vec<TagHit>,
}

/// In-process analyzer over the project tree.
///
/// Symbols come from tree-sitter definitions, tags from comment markers and
/// exact matches from a literal scan of the files the indexer would walk,
/// plugin filter included, so the hit cap is spent on indexed files only.
/// Per-file outlines are cached.
pub struct SourceAnalyzer {
    root: PathBuf,
    indexing: IndexingConfig,
    index_dir: String,
    outlines: Cache<String, Arc<FileOutline>>,
}

impl SourceAnalyzer {
    pub fn new(root: impl Into<PathBuf>, indexing: IndexingConfig, index_dir: &str) -> Self {
        Self {
            root: root.into(),
            indexing,
            index_dir: index_dir.to_string(),
            outlines: Cache::new(4096),
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(&config.root, config.indexing.clone(), &config.index_dir)
    }

    fn outline(&self, path: &str) -> Arc<FileOutline> {
        self.outlines
            .get_with(path.to_string(), || Arc::new(self.analyze(path)))
    }

    fn analyze(&self, path: &str) -> FileOutline {
        let full = self.root.join(path);
        let source = match std::fs::read_to_string(&full) {
            Ok(s) => s,
            Err(e) => {
                debug!("Analyzer cannot read {}: {}", full.display(), e);
                return FileOutline::default();
            }
        };

        let language = Language::from_path(&full);
        let symbols = if language.supports_tree_sitter() {
            let mut parser = CodeParser::new();
            match parser.parse(language, &source) {
                Ok(parsed) => extract_symbols(&parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        FileOutline {
            symbols,
            tags: scan_tags(&source),
        }
    }
}

impl MetadataService for SourceAnalyzer {
    fn symbols_in_range(&self, path: &str, start: usize, end: usize) -> Vec<SymbolHit> {
        self.outline(path)
            .symbols
            .iter()
            .filter(|s| start <= s.line && s.line <= end)
            .cloned()
            .collect()
    }

    fn tags_in_range(&self, path: &str, start: usize, end: usize) -> Vec<TagHit> {
        self.outline(path)
            .tags
            .iter()
            .filter(|t| start <= t.line && t.line <= end)
            .cloned()
            .collect()
    }

    fn exact_matches(&self, query: &str) -> Vec<LineHit> {
        let needle = query.trim();
        if needle.is_empty() {
            return Vec::new();
        }

        let walker = FileWalker::from_config(&self.root, &self.indexing)
            .exclude_dir(self.index_dir.clone());
        let files = match walker.walk() {
            Ok((files, _)) => files,
            Err(e) => {
                warn!("Exact-match scan failed: {}", e);
                return Vec::new();
            }
        };

        let mut hits = Vec::new();
        for file in files {
            if !self.in_plugins(&file.rel_path, &self.indexing.plugins) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&file.path) else {
                continue;
            };
            for (i, line) in content.lines().enumerate() {
                if line.contains(needle) {
                    hits.push(LineHit {
                        path: file.rel_path.clone(),
                        line: i + 1,
                    });
                    if hits.len() >= MAX_EXACT_MATCHES {
                        debug!("Exact matches capped at {}", MAX_EXACT_MATCHES);
                        return hits;
                    }
                }
            }
        }
        hits
    }

    fn has_index(&self) -> bool {
        self.root.is_dir()
    }
}

/// Find comment markers (`TODO`, `FIXME`, ...) as whole words.
pub fn scan_tags(source: &str) -> Vec<TagHit> {
    let mut tags = Vec::new();

    for (i, line) in source.lines().enumerate() {
        let marker = TAG_MARKERS
            .iter()
            .filter_map(|m| find_word(line, m).map(|pos| (pos, *m)))
            .min_by_key(|(pos, _)| *pos);

        if let Some((_, tag)) = marker {
            tags.push(TagHit {
                tag: tag.to_string(),
                line: i + 1,
                text: line.trim().chars().take(200).collect(),
            });
        }
    }

    tags
}

fn find_word(line: &str, word: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';

    line.match_indices(word).map(|(pos, _)| pos).find(|&pos| {
        let before = line[..pos].chars().next_back();
        let after = line[pos + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_infer_plugin_module() {
        assert_eq!(
            infer_plugin_module("Plugins/Combat/Source/CombatCore/Private/Weapon.cpp"),
            (Some("Combat".to_string()), Some("CombatCore".to_string()))
        );
        assert_eq!(
            infer_plugin_module("Source/Game/Game.cpp"),
            (None, Some("Game".to_string()))
        );
        assert_eq!(infer_plugin_module("src/main.rs"), (None, None));
        // a file named like the marker directory is not a directory
        assert_eq!(infer_plugin_module("docs/plugins"), (None, None));
    }

    #[test]
    fn test_scan_tags() {
        let source = "int a; // TODO: remove\nint TODOS;\n/* FIXME(bob) NOTE */\nplain\n";
        let tags = scan_tags(source);

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].tag, "TODO");
        assert_eq!(tags[0].line, 1);
        assert_eq!(tags[1].tag, "FIXME");
        assert_eq!(tags[1].line, 3);
    }

    #[test]
    fn test_no_metadata_is_empty() {
        let service = NoMetadata;
        assert!(!service.has_index());
        assert!(service.exact_matches("anything").is_empty());
        assert!(service.symbols_in_range("a.rs", 1, 100).is_empty());
        assert_eq!(
            service.infer_plugin_module("Plugins/Audio/Source/Mixer/a.cpp"),
            (Some("Audio".to_string()), Some("Mixer".to_string()))
        );
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("lib.rs"),
            "// TODO: split\nstruct FooBar;\n\nfn make() -> FooBar {\n    FooBar\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.md"), "FooBar is documented here\n").unwrap();
        dir
    }

    #[test]
    fn test_source_analyzer_symbols_and_tags() {
        let dir = project();
        let analyzer = SourceAnalyzer::new(dir.path(), IndexingConfig::default(), ".codeseek");

        let symbols = analyzer.symbols_in_range("lib.rs", 1, 3);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "FooBar");

        assert_eq!(analyzer.symbols_in_range("lib.rs", 1, 10).len(), 2);
        assert_eq!(analyzer.tags_in_range("lib.rs", 1, 1).len(), 1);
        assert!(analyzer.tags_in_range("lib.rs", 2, 10).is_empty());
        assert!(analyzer.symbols_in_range("missing.rs", 1, 10).is_empty());
        assert!(analyzer.has_index());
    }

    #[test]
    fn test_source_analyzer_exact_matches() {
        let dir = project();
        let analyzer = SourceAnalyzer::new(dir.path(), IndexingConfig::default(), ".codeseek");

        let hits = analyzer.exact_matches("FooBar");
        assert_eq!(
            hits,
            vec![
                LineHit { path: "lib.rs".into(), line: 2 },
                LineHit { path: "lib.rs".into(), line: 4 },
                LineHit { path: "lib.rs".into(), line: 5 },
                LineHit { path: "notes.md".into(), line: 1 },
            ]
        );
        assert!(analyzer.exact_matches("   ").is_empty());
        assert!(analyzer.exact_matches("foobar").is_empty());
    }

    #[test]
    fn test_exact_matches_skip_filtered_plugins() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("Plugins/Audio/Source/Mixer");
        let combat = dir.path().join("Plugins/Combat/Source/CombatCore");
        fs::create_dir_all(&audio).unwrap();
        fs::create_dir_all(&combat).unwrap();

        // enough matches outside the filter to fill the cap on their own
        let noisy = "let volume = Needle;\n".repeat(MAX_EXACT_MATCHES + 10);
        fs::write(audio.join("Mixer.cpp"), noisy).unwrap();
        fs::write(combat.join("Weapon.cpp"), "int a;\nclass Needle {};\n").unwrap();

        let unfiltered = SourceAnalyzer::new(dir.path(), IndexingConfig::default(), ".codeseek");
        let hits = unfiltered.exact_matches("Needle");
        assert_eq!(hits.len(), MAX_EXACT_MATCHES);
        assert!(hits.iter().all(|h| h.path.starts_with("Plugins/Audio/")));

        let indexing = IndexingConfig {
            plugins: vec!["combat".to_string()],
            ..IndexingConfig::default()
        };
        let filtered = SourceAnalyzer::new(dir.path(), indexing, ".codeseek");
        assert_eq!(
            filtered.exact_matches("Needle"),
            vec![LineHit {
                path: "Plugins/Combat/Source/CombatCore/Weapon.cpp".into(),
                line: 2,
            }]
        );
    }

    #[test]
    fn test_in_plugins() {
        let service = NoMetadata;
        let path = "Plugins/Combat/Source/CombatCore/Weapon.cpp";
        assert!(service.in_plugins(path, &[]));
        assert!(service.in_plugins(path, &["COMBAT".to_string()]));
        assert!(!service.in_plugins(path, &["Audio".to_string()]));
        assert!(!service.in_plugins("src/main.rs", &["Combat".to_string()]));
    }
}
