//! Parsing entry point.
//!
//! A fresh `Parser` is constructed per call, as in the ingestion
//! pipeline's `parse_and_extract`: simplest correct thing, and parsing
//! a single function body is cheap enough that pooling is not worth the
//! complexity here.

use tree_sitter::{Parser, Tree};

use crate::error::{Result, SyntaxEngineError};
use crate::language::LanguageKind;

pub fn parse(code: &str, lang: LanguageKind) -> Result<Tree> {
    let mut parser = Parser::new();
    set_language(&mut parser, lang)?;

    parser
        .parse(code, None)
        .ok_or_else(|| SyntaxEngineError::ParseFailed(lang_name(lang)))
}

fn set_language(parser: &mut Parser, lang: LanguageKind) -> Result<()> {
    let result = match lang {
        LanguageKind::Python => parser.set_language(&tree_sitter_python::LANGUAGE.into()),
        LanguageKind::JavaScript => parser.set_language(&tree_sitter_javascript::LANGUAGE.into()),
        LanguageKind::TypeScript => {
            parser.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        }
    };
    result.map_err(|source| SyntaxEngineError::GrammarSetup {
        language: lang_name(lang),
        source,
    })
}

fn lang_name(lang: LanguageKind) -> &'static str {
    match lang {
        LanguageKind::Python => "python",
        LanguageKind::JavaScript => "javascript",
        LanguageKind::TypeScript => "typescript",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_python() {
        let tree = parse("def f():\n    pass\n", LanguageKind::Python).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn parses_simple_typescript() {
        let tree = parse("function f(): void {}\n", LanguageKind::TypeScript).unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }
}
