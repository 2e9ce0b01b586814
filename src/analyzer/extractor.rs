use tree_sitter::Node;

use super::parser::ParsedCode;
use super::SymbolHit;
use crate::file::Language;

/// Language-specific knowledge of which AST nodes are definitions and how to
/// name them.
pub trait LanguageExtractor {
    /// Map a node kind to a symbol kind, or None if it is not a definition
    fn classify(&self, node: Node) -> Option<&'static str>;

    fn extract_name(&self, node: Node, source: &[u8]) -> Option<String> {
        name_field(node, source)
    }
}

pub fn get_extractor(language: Language) -> Option<Box<dyn LanguageExtractor>> {
    match language {
        Language::Rust => Some(Box::new(RustExtractor)),
        Language::Python => Some(Box::new(PythonExtractor)),
        Language::JavaScript | Language::TypeScript => Some(Box::new(TypeScriptExtractor)),
        Language::Go => Some(Box::new(GoExtractor)),
        Language::Java => Some(Box::new(JavaExtractor)),
        Language::C | Language::Cpp => Some(Box::new(CFamilyExtractor)),
        _ => None,
    }
}

/// Collect every named definition in a parse tree, ordered by line.
pub fn extract_symbols(parsed: &ParsedCode<'_>) -> Vec<SymbolHit> {
    let Some(extractor) = get_extractor(parsed.language()) else {
        return Vec::new();
    };
    let source = parsed.source();

    let mut symbols = Vec::new();
    parsed.walk(|node| {
        let Some(kind) = extractor.classify(node) else {
            return;
        };
        let Some(name) = extractor.extract_name(node, source) else {
            return;
        };
        symbols.push(SymbolHit {
            name,
            kind: kind.to_string(),
            line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
        });
    });

    symbols.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.name.cmp(&b.name)));
    symbols
}

fn name_field(node: Node, source: &[u8]) -> Option<String> {
    node.child_by_field_name("name")?
        .utf8_text(source)
        .ok()
        .map(String::from)
}

pub struct RustExtractor;

impl LanguageExtractor for RustExtractor {
    fn classify(&self, node: Node) -> Option<&'static str> {
        Some(match node.kind() {
            "function_item" => {
                let in_impl = node
                    .parent()
                    .and_then(|p| p.parent())
                    .is_some_and(|gp| matches!(gp.kind(), "impl_item" | "trait_item"));
                if in_impl {
                    "method"
                } else {
                    "function"
                }
            }
            "struct_item" => "struct",
            "enum_item" => "enum",
            "trait_item" => "trait",
            "impl_item" => "impl",
            "type_item" => "type",
            "mod_item" => "module",
            "const_item" => "const",
            "static_item" => "static",
            "macro_definition" => "macro",
            _ => return None,
        })
    }

    fn extract_name(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() == "impl_item" {
            let ty = node.child_by_field_name("type")?.utf8_text(source).ok()?;
            return match node.child_by_field_name("trait") {
                Some(tr) => Some(format!("{} for {}", tr.utf8_text(source).ok()?, ty)),
                None => Some(ty.to_string()),
            };
        }
        name_field(node, source)
    }
}

pub struct PythonExtractor;

impl LanguageExtractor for PythonExtractor {
    fn classify(&self, node: Node) -> Option<&'static str> {
        match node.kind() {
            "function_definition" => {
                let in_class = node
                    .parent()
                    .and_then(|p| p.parent())
                    .is_some_and(|gp| gp.kind() == "class_definition");
                Some(if in_class { "method" } else { "function" })
            }
            "class_definition" => Some("class"),
            _ => None,
        }
    }
}

pub struct TypeScriptExtractor;

impl LanguageExtractor for TypeScriptExtractor {
    fn classify(&self, node: Node) -> Option<&'static str> {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => Some("function"),
            "class_declaration" | "abstract_class_declaration" => Some("class"),
            "method_definition" => Some("method"),
            "interface_declaration" => Some("interface"),
            "type_alias_declaration" => Some("type"),
            "enum_declaration" => Some("enum"),
            _ => None,
        }
    }
}

pub struct GoExtractor;

impl LanguageExtractor for GoExtractor {
    fn classify(&self, node: Node) -> Option<&'static str> {
        match node.kind() {
            "function_declaration" => Some("function"),
            "method_declaration" => Some("method"),
            "type_spec" => Some("type"),
            _ => None,
        }
    }
}

pub struct JavaExtractor;

impl LanguageExtractor for JavaExtractor {
    fn classify(&self, node: Node) -> Option<&'static str> {
        match node.kind() {
            "class_declaration" => Some("class"),
            "interface_declaration" => Some("interface"),
            "enum_declaration" => Some("enum"),
            "record_declaration" => Some("record"),
            "method_declaration" => Some("method"),
            "constructor_declaration" => Some("constructor"),
            _ => None,
        }
    }
}

/// C and C++ share node names; C++ adds classes and namespaces.
pub struct CFamilyExtractor;

impl LanguageExtractor for CFamilyExtractor {
    fn classify(&self, node: Node) -> Option<&'static str> {
        let has_body = || node.child_by_field_name("body").is_some();
        match node.kind() {
            "function_definition" => Some("function"),
            "class_specifier" if has_body() => Some("class"),
            "struct_specifier" if has_body() => Some("struct"),
            "union_specifier" if has_body() => Some("union"),
            "enum_specifier" if has_body() => Some("enum"),
            "namespace_definition" => Some("namespace"),
            _ => None,
        }
    }

    fn extract_name(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() != "function_definition" {
            return name_field(node, source);
        }

        // Follow the declarator chain: pointer/reference/function declarators
        // wrap the identifier.
        let mut current = node.child_by_field_name("declarator")?;
        loop {
            match current.kind() {
                "identifier" | "field_identifier" | "qualified_identifier"
                | "destructor_name" | "operator_name" => {
                    return current.utf8_text(source).ok().map(String::from);
                }
                _ => {
                    current = match current.child_by_field_name("declarator") {
                        Some(inner) => inner,
                        None => {
                            let mut cursor = current.walk();
                            let last = current.named_children(&mut cursor).last()?;
                            last
                        }
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parser::CodeParser;

    fn symbols(language: Language, source: &str) -> Vec<(String, String, usize)> {
        let mut parser = CodeParser::new();
        let parsed = parser.parse(language, source).unwrap();
        extract_symbols(&parsed)
            .into_iter()
            .map(|s| (s.name, s.kind, s.line))
            .collect()
    }

    fn entry(name: &str, kind: &str, line: usize) -> (String, String, usize) {
        (name.to_string(), kind.to_string(), line)
    }

    #[test]
    fn test_rust_definitions() {
        let source = "struct Store;\n\nimpl Store {\n    fn open() {}\n}\n\nfn main() {}\n";
        assert_eq!(
            symbols(Language::Rust, source),
            vec![
                entry("Store", "struct", 1),
                entry("Store", "impl", 3),
                entry("open", "method", 4),
                entry("main", "function", 7),
            ]
        );
    }

    #[test]
    fn test_python_definitions() {
        let source = "class Index:\n    def add(self):\n        pass\n\ndef load():\n    pass\n";
        assert_eq!(
            symbols(Language::Python, source),
            vec![
                entry("Index", "class", 1),
                entry("add", "method", 2),
                entry("load", "function", 5),
            ]
        );
    }

    #[test]
    fn test_cpp_definitions() {
        let source = "namespace engine {\nclass FooBar {\n  int x;\n};\nint FooBar::Tick(float dt) {\n  return 0;\n}\n}\n";
        assert_eq!(
            symbols(Language::Cpp, source),
            vec![
                entry("engine", "namespace", 1),
                entry("FooBar", "class", 2),
                entry("FooBar::Tick", "function", 5),
            ]
        );
    }

    #[test]
    fn test_forward_declaration_is_not_a_definition() {
        assert!(symbols(Language::Cpp, "class Forward;\n").is_empty());
    }

    #[test]
    fn test_typescript_definitions() {
        let source = "interface Hit { score: number }\nfunction rank(): void {}\n";
        assert_eq!(
            symbols(Language::TypeScript, source),
            vec![entry("Hit", "interface", 1), entry("rank", "function", 2)]
        );
    }

    #[test]
    fn test_go_definitions() {
        let source = "package main\n\ntype Store struct{}\n\nfunc (s *Store) Open() {}\n\nfunc main() {}\n";
        assert_eq!(
            symbols(Language::Go, source),
            vec![
                entry("Store", "type", 3),
                entry("Open", "method", 5),
                entry("main", "function", 7),
            ]
        );
    }

    #[test]
    fn test_languages_without_extractor() {
        assert!(get_extractor(Language::Markdown).is_none());
        assert!(get_extractor(Language::Json).is_none());
    }
}
