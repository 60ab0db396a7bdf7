//! Language taxonomy for the syntax engine.
//!
//! Narrower than the ingestion pipeline's [`LanguageKind`]: only the
//! three languages the diffusion core actually edits are represented.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    Python,
    JavaScript,
    TypeScript,
}

impl Display for LanguageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LanguageKind::Python => "python",
            LanguageKind::JavaScript => "javascript",
            LanguageKind::TypeScript => "typescript",
        })
    }
}

impl LanguageKind {
    /// Best-effort detection by file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Self::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_extensions() {
        assert_eq!(LanguageKind::from_extension("py"), Some(LanguageKind::Python));
        assert_eq!(LanguageKind::from_extension("TSX"), Some(LanguageKind::TypeScript));
        assert_eq!(LanguageKind::from_extension("rb"), None);
    }
}
