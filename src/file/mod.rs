use anyhow::Result;
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

mod binary;
mod language;

pub use binary::{is_binary_file, looks_binary};
pub use language::Language;

use crate::chunker::ContentKind;
use crate::config::{IndexingConfig, CONFIG_FILE_NAME};

/// A file selected for indexing
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,

    /// Project-relative, `/`-separated; the manifest key
    pub rel_path: String,

    pub language: Language,
    pub kind: ContentKind,
    pub size: u64,
    pub mtime_ns: u64,
}

#[derive(Debug, Default, Clone)]
pub struct WalkStats {
    pub total_files: usize,
    pub indexable_files: usize,
    pub skipped_binary: usize,
    pub skipped_kind: usize,
    pub files_by_kind: HashMap<ContentKind, usize>,
    pub total_size_bytes: u64,
}

impl WalkStats {
    fn add_file(&mut self, file: &FileInfo) {
        self.indexable_files += 1;
        self.total_size_bytes += file.size;
        *self.files_by_kind.entry(file.kind).or_insert(0) += 1;
    }

    pub fn total_size_mb(&self) -> f64 {
        self.total_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Project walker honouring .gitignore, build/VCS exclusions and the
/// include-code / include-docs toggles
pub struct FileWalker {
    root: PathBuf,
    exclude_dirs: Vec<String>,
    respect_gitignore: bool,
    include_code: bool,
    include_docs: bool,
}

/// Build output, dependency and VCS directories never worth indexing
const EXCLUDED_DIRS: &[&str] = &[
    ".git", ".svn", ".hg",
    "node_modules", "target", "dist", "build", "out",
    "Binaries", "Intermediate", "DerivedDataCache", "Saved",
    "__pycache__", ".pytest_cache", ".tox", "venv", ".venv",
    "vendor", ".bundle", ".gradle", ".m2",
    ".idea", ".vscode", ".vs",
    "coverage", ".nyc_output", ".cache",
];

impl FileWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude_dirs: Vec::new(),
            respect_gitignore: true,
            include_code: true,
            include_docs: true,
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &IndexingConfig) -> Self {
        Self::new(root)
            .respect_gitignore(config.respect_gitignore)
            .include_code(config.include_code)
            .include_docs(config.include_docs)
    }

    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Include source code and config files (default: true)
    pub fn include_code(mut self, include: bool) -> Self {
        self.include_code = include;
        self
    }

    /// Include prose documents (default: true)
    pub fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    /// Skip an additional directory name, e.g. the snapshot directory
    pub fn exclude_dir(mut self, name: impl Into<String>) -> Self {
        self.exclude_dirs.push(name.into());
        self
    }

    /// Walk the tree; files are returned sorted by relative path.
    pub fn walk(&self) -> Result<(Vec<FileInfo>, WalkStats)> {
        let mut files = Vec::new();
        let mut stats = WalkStats::default();

        debug!("Starting file walk in: {}", self.root.display());

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .hidden(true)
            .add_custom_ignore_filename(".codeseekignore");

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Error walking file: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            stats.total_files += 1;

            let path = entry.path();
            let Some(rel_path) = relative_path(&self.root, path) else {
                continue;
            };

            if self.is_in_excluded_dir(&rel_path) || rel_path == CONFIG_FILE_NAME {
                continue;
            }

            let language = Language::from_path(path);
            let Some(kind) = language.content_kind() else {
                stats.skipped_kind += 1;
                continue;
            };
            if !self.wants(kind) {
                stats.skipped_kind += 1;
                continue;
            }

            if is_binary_file(path) {
                stats.skipped_binary += 1;
                debug!("Skipping binary file: {}", path.display());
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    warn!("Cannot stat {}: {}", path.display(), err);
                    continue;
                }
            };

            let file_info = FileInfo {
                path: path.to_path_buf(),
                rel_path,
                language,
                kind,
                size: metadata.len(),
                mtime_ns: mtime_ns(&metadata),
            };

            stats.add_file(&file_info);
            files.push(file_info);
        }

        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        debug!(
            "Walk complete: {} indexable of {} files ({:.2} MB)",
            stats.indexable_files,
            stats.total_files,
            stats.total_size_mb()
        );

        Ok((files, stats))
    }

    fn wants(&self, kind: ContentKind) -> bool {
        match kind {
            ContentKind::Code | ContentKind::Config => self.include_code,
            ContentKind::Doc => self.include_docs,
        }
    }

    fn is_in_excluded_dir(&self, rel_path: &str) -> bool {
        let mut dirs: Vec<&str> = rel_path.split('/').collect();
        dirs.pop();
        dirs.iter().any(|dir| {
            EXCLUDED_DIRS.contains(dir) || self.exclude_dirs.iter().any(|d| d == dir)
        })
    }
}

/// `/`-separated path of `path` relative to `root`
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Modification time in nanoseconds since the Unix epoch (0 if unknown)
pub fn mtime_ns(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(files: &[FileInfo]) -> Vec<&str> {
        files.iter().map(|f| f.rel_path.as_str()).collect()
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("config.yaml"), "key: value").unwrap();
        fs::write(root.join("docs/guide.md"), "# Guide").unwrap();
        fs::write(root.join("logo.dat"), [0u8, 1, 2]).unwrap();
        dir
    }

    #[test]
    fn test_walk_sorted_relative_paths() {
        let dir = project();
        let (files, stats) = FileWalker::new(dir.path()).walk().unwrap();

        assert_eq!(names(&files), vec!["config.yaml", "docs/guide.md", "src/main.rs"]);
        assert_eq!(stats.indexable_files, 3);
        assert_eq!(files[2].kind, ContentKind::Code);
        assert_eq!(files[0].kind, ContentKind::Config);
        assert!(files.iter().all(|f| f.mtime_ns > 0));
    }

    #[test]
    fn test_include_toggles() {
        let dir = project();

        let (code_only, _) = FileWalker::new(dir.path()).include_docs(false).walk().unwrap();
        assert_eq!(names(&code_only), vec!["config.yaml", "src/main.rs"]);

        let (docs_only, _) = FileWalker::new(dir.path()).include_code(false).walk().unwrap();
        assert_eq!(names(&docs_only), vec!["docs/guide.md"]);
    }

    #[test]
    fn test_excluded_directories() {
        let dir = project();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::create_dir_all(root.join("Intermediate")).unwrap();
        fs::write(root.join("Intermediate/gen.cpp"), "int x;").unwrap();
        fs::create_dir_all(root.join("snap")).unwrap();
        fs::write(root.join("snap/state.json"), "{}").unwrap();

        let (files, _) = FileWalker::new(root).exclude_dir("snap").walk().unwrap();
        assert_eq!(names(&files), vec!["config.yaml", "docs/guide.md", "src/main.rs"]);
    }

    #[test]
    fn test_gitignore_respected_without_git_repo() {
        let dir = project();
        fs::write(dir.path().join(".gitignore"), "docs/\n").unwrap();

        let (files, _) = FileWalker::new(dir.path()).walk().unwrap();
        assert_eq!(names(&files), vec!["config.yaml", "src/main.rs"]);

        let (all, _) = FileWalker::new(dir.path())
            .respect_gitignore(false)
            .walk()
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/project");
        assert_eq!(
            relative_path(root, Path::new("/project/a/b.rs")),
            Some("a/b.rs".to_string())
        );
        assert_eq!(relative_path(root, Path::new("/elsewhere/x.rs")), None);
    }
}
