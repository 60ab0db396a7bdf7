//! The per-request input and the mutable Condition it carries across
//! retry attempts (§3).

use syntax_engine::LanguageKind;

/// `(file_path, target_names, instruction, language)` plus the knobs
/// the state machine needs: whether autoregressive fallback is
/// enabled for this request, and its scheduling priority within a
/// batch.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub file_path: String,
    pub source: String,
    pub target_names: Vec<String>,
    pub instruction: String,
    pub context_excerpt: Option<String>,
    pub language: LanguageKind,
    pub autoregressive_fallback: bool,
    pub priority: i64,
}

impl RunRequest {
    pub fn new(
        file_path: impl Into<String>,
        source: impl Into<String>,
        target_names: Vec<String>,
        instruction: impl Into<String>,
        language: LanguageKind,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            source: source.into(),
            target_names,
            instruction: instruction.into(),
            context_excerpt: None,
            language,
            autoregressive_fallback: false,
            priority: 0,
        }
    }

    pub fn with_context_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.context_excerpt = Some(excerpt.into());
        self
    }

    pub fn with_autoregressive_fallback(mut self, enabled: bool) -> Self {
        self.autoregressive_fallback = enabled;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

/// The mutable Condition string: instruction + optional context
/// excerpt +, on retry, a diagnostic suffix. Each revision is a
/// distinct ledger event (`ConditionRevision`).
#[derive(Debug, Clone)]
pub struct Condition {
    base: String,
    suffix: Option<String>,
}

impl Condition {
    pub fn new(instruction: &str, context_excerpt: Option<&str>) -> Self {
        let base = match context_excerpt {
            Some(excerpt) => format!("{instruction}\n\nContext:\n{excerpt}"),
            None => instruction.to_string(),
        };
        Self { base, suffix: None }
    }

    pub fn text(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}\n\n{suffix}", self.base),
            None => self.base.clone(),
        }
    }

    /// Appends the diagnostic suffix fed back after a rejected attempt
    /// ("IMPORTANT: Previous attempt had <syntax|semantic> errors.
    /// Fix these issues: <summary>").
    pub fn revise(&mut self, stage: &str, summary: &str) {
        self.suffix = Some(format!(
            "IMPORTANT: Previous attempt had {stage} errors. Fix these issues: {summary}"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_includes_context_excerpt_when_present() {
        let c = Condition::new("rename foo", Some("def foo(): pass"));
        assert!(c.text().contains("rename foo"));
        assert!(c.text().contains("def foo(): pass"));
    }

    #[test]
    fn revise_appends_diagnostic_suffix() {
        let mut c = Condition::new("rename foo", None);
        c.revise("syntax", "line 1: unexpected token");
        assert!(c.text().contains("IMPORTANT: Previous attempt had syntax errors"));
        assert!(c.text().contains("line 1: unexpected token"));
    }
}
