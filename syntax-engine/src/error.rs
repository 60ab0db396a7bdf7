//! Error taxonomy for the syntax engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyntaxEngineError>;

#[derive(Debug, Error)]
pub enum SyntaxEngineError {
    #[error("failed to set grammar for {language}")]
    GrammarSetup {
        language: &'static str,
        #[source]
        source: tree_sitter::LanguageError,
    },

    #[error("tree-sitter produced no tree for a {0} buffer")]
    ParseFailed(&'static str),
}
