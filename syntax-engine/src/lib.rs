//! AST-anchored syntax layer (Component 1).
//!
//! Parses a source buffer with Tree-sitter, locates named top-level
//! constructs by exact identifier, and re-validates edited buffers for
//! syntax errors. Pure and synchronous: no I/O beyond the byte slice it
//! is handed.

pub mod diagnostics;
pub mod error;
pub mod find;
pub mod language;
pub mod span;
pub mod tree;

pub use diagnostics::{Diagnostic, Severity, has_errors};
pub use error::{Result, SyntaxEngineError};
pub use find::{Construct, find_named_top_level_constructs};
pub use language::LanguageKind;
pub use span::ByteSpan;
pub use tree::parse;
