use crate::file::Language;
use tree_sitter::Language as TsLanguage;

/// Compiled-in tree-sitter grammar for a language, if one is linked.
pub fn grammar_for(language: Language) -> Option<TsLanguage> {
    let grammar: TsLanguage = match language {
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        _ => return None,
    };
    Some(grammar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tree_sitter_language_has_a_grammar() {
        for language in [
            Language::Rust,
            Language::Python,
            Language::JavaScript,
            Language::TypeScript,
            Language::Go,
            Language::Java,
            Language::C,
            Language::Cpp,
        ] {
            assert!(language.supports_tree_sitter());
            assert!(grammar_for(language).is_some(), "{}", language.name());
        }
    }

    #[test]
    fn test_unsupported_language() {
        assert!(grammar_for(Language::Markdown).is_none());
        assert!(grammar_for(Language::Json).is_none());
    }
}
