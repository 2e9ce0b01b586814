use std::path::Path;

use crate::chunker::ContentKind;

/// Languages and file formats recognised by the walker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Shell,
    Sql,
    Html,
    Css,
    Markdown,
    Text,
    Json,
    Yaml,
    Toml,
    Ini,
    Xml,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        Self::from_extension(extension)
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyw" | "pyi" => Self::Python,
            "js" | "mjs" | "cjs" | "jsx" => Self::JavaScript,
            "ts" | "mts" | "cts" | "tsx" => Self::TypeScript,
            "go" => Self::Go,
            "java" => Self::Java,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "inl" => Self::Cpp,
            "cs" => Self::CSharp,
            "rb" | "rake" => Self::Ruby,
            "php" => Self::Php,
            "swift" => Self::Swift,
            "kt" | "kts" => Self::Kotlin,
            "sh" | "bash" | "zsh" | "ps1" | "bat" => Self::Shell,
            "sql" => Self::Sql,
            "html" | "htm" => Self::Html,
            "css" | "scss" | "sass" | "less" => Self::Css,
            "md" | "markdown" => Self::Markdown,
            "txt" | "rst" | "adoc" => Self::Text,
            "json" | "uplugin" | "uproject" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            "ini" | "cfg" | "conf" => Self::Ini,
            "xml" => Self::Xml,
            _ => Self::Unknown,
        }
    }

    /// Content class used for chunk sizing and include/exclude toggles
    pub fn content_kind(&self) -> Option<ContentKind> {
        match self {
            Self::Unknown => None,
            Self::Markdown | Self::Text => Some(ContentKind::Doc),
            Self::Json | Self::Yaml | Self::Toml | Self::Ini | Self::Xml => {
                Some(ContentKind::Config)
            }
            _ => Some(ContentKind::Code),
        }
    }

    /// Languages with a tree-sitter grammar for symbol extraction
    pub fn supports_tree_sitter(&self) -> bool {
        matches!(
            self,
            Self::Rust
                | Self::Python
                | Self::JavaScript
                | Self::TypeScript
                | Self::Go
                | Self::Java
                | Self::C
                | Self::Cpp
        )
    }

    pub fn is_indexable(&self) -> bool {
        self.content_kind().is_some()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rust => "Rust",
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Go => "Go",
            Self::Java => "Java",
            Self::C => "C",
            Self::Cpp => "C++",
            Self::CSharp => "C#",
            Self::Ruby => "Ruby",
            Self::Php => "PHP",
            Self::Swift => "Swift",
            Self::Kotlin => "Kotlin",
            Self::Shell => "Shell",
            Self::Sql => "SQL",
            Self::Html => "HTML",
            Self::Css => "CSS",
            Self::Markdown => "Markdown",
            Self::Text => "Text",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Ini => "INI",
            Self::Xml => "XML",
            Self::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extension_detection() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("HPP"), Language::Cpp);
        assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
        assert_eq!(Language::from_path(&PathBuf::from("Foo.uplugin")), Language::Json);
        assert_eq!(Language::from_path(&PathBuf::from("Makefile")), Language::Unknown);
    }

    #[test]
    fn test_content_kinds() {
        assert_eq!(Language::Cpp.content_kind(), Some(ContentKind::Code));
        assert_eq!(Language::Markdown.content_kind(), Some(ContentKind::Doc));
        assert_eq!(Language::Text.content_kind(), Some(ContentKind::Doc));
        assert_eq!(Language::Ini.content_kind(), Some(ContentKind::Config));
        assert_eq!(Language::Unknown.content_kind(), None);
    }

    #[test]
    fn test_tree_sitter_support() {
        assert!(Language::Rust.supports_tree_sitter());
        assert!(Language::Cpp.supports_tree_sitter());
        assert!(!Language::Markdown.supports_tree_sitter());
        assert!(!Language::Json.supports_tree_sitter());
    }

    #[test]
    fn test_indexable() {
        assert!(Language::Rust.is_indexable());
        assert!(Language::Yaml.is_indexable());
        assert!(!Language::Unknown.is_indexable());
    }
}
