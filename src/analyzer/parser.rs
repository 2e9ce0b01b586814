use anyhow::{anyhow, Result};
use tree_sitter::{Node, Parser, Tree};

use super::grammar::grammar_for;
use crate::file::Language;

/// Wrapper around a tree-sitter parser that picks the grammar per call
pub struct CodeParser {
    parser: Parser,
}

impl CodeParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    pub fn parse<'s>(&mut self, language: Language, source: &'s str) -> Result<ParsedCode<'s>> {
        let grammar = grammar_for(language)
            .ok_or_else(|| anyhow!("No grammar available for {}", language.name()))?;

        self.parser
            .set_language(&grammar)
            .map_err(|e| anyhow!("Failed to set language: {}", e))?;

        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("Failed to parse source code"))?;

        Ok(ParsedCode {
            tree,
            source,
            language,
        })
    }
}

impl Default for CodeParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A parse tree borrowing the source it was built from
pub struct ParsedCode<'s> {
    tree: Tree,
    source: &'s str,
    language: Language,
}

impl<'s> ParsedCode<'s> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &'s [u8] {
        self.source.as_bytes()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn has_errors(&self) -> bool {
        self.root_node().has_error()
    }

    /// Depth-first, pre-order visit of every node
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(Node<'_>),
    {
        fn recurse<'t, F: FnMut(Node<'t>)>(node: Node<'t>, visit: &mut F) {
            visit(node);
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                recurse(child, visit);
            }
        }
        recurse(self.root_node(), &mut visit);
    }
}
