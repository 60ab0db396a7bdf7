//! Mask Span model and the masking algorithm.

use serde::{Deserialize, Serialize};
use syntax_engine::{Construct, LanguageKind, find_named_top_level_constructs, parse};
use tracing::debug;

use crate::MASK_TOKEN;

/// A single excised region: byte interval, captured text, and the
/// metadata needed to re-stitch or report on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSpan {
    pub start_byte: usize,
    pub end_byte: usize,
    /// 0-indexed start line.
    pub start_line: usize,
    /// 0-indexed end line.
    pub end_line: usize,
    /// 0-indexed start column on `start_line`.
    pub start_column: usize,
    /// 0-indexed end column on `end_line`.
    pub end_column: usize,
    /// The original substring this span replaced.
    pub original_text: String,
    /// Tree-sitter node kind of the excised construct, e.g.
    /// `function_definition`.
    pub category: String,
    /// Tree-sitter node kind of the immediate parent, if any.
    pub parent_category: Option<String>,
    pub name: String,
}

/// Runs the full masking algorithm described in the component design:
/// find matching nodes, dedup/sort/replace/reverse.
///
/// Returns `(masked_buffer, spans)` in ascending start-byte order. An
/// empty `target_names` match set yields `(source.to_string(), vec![])`
/// unchanged, per the empty-spans edge-case policy.
pub fn mask(source: &str, target_names: &[String], language: LanguageKind) -> (String, Vec<MaskSpan>) {
    let tree = match parse(source, language) {
        Ok(t) => t,
        Err(_) => return (source.to_string(), Vec::new()),
    };

    let mut found = find_named_top_level_constructs(&tree, source, language, target_names);

    // Dedup by node identity: two requested names resolving to the same
    // byte range collapse to one span. Overlapping candidates keep the
    // first encountered in pre-order (find_named_top_level_constructs
    // already returns pre-order-first matches and never descends into a
    // matched node's body, so remaining overlaps are exact duplicates).
    found.sort_by_key(|c| c.span.start_byte);
    found.dedup_by_key(|c| (c.span.start_byte, c.span.end_byte));

    if found.is_empty() {
        return (source.to_string(), Vec::new());
    }

    let mut spans: Vec<MaskSpan> = found.iter().map(|c| to_mask_span(c, source)).collect();

    // Step 3-4: descending start byte, replace in a single mutable buffer.
    let mut by_desc = spans.clone();
    by_desc.sort_by(|a, b| b.start_byte.cmp(&a.start_byte));

    let mut buffer = source.to_string();
    for span in &by_desc {
        buffer.replace_range(span.start_byte..span.end_byte, MASK_TOKEN);
    }

    // Step 5: ascending order for emission.
    spans.sort_by_key(|s| s.start_byte);

    debug!(num_spans = spans.len(), "masked buffer");
    (buffer, spans)
}

fn to_mask_span(construct: &Construct, source: &str) -> MaskSpan {
    MaskSpan {
        start_byte: construct.span.start_byte,
        end_byte: construct.span.end_byte,
        start_line: construct.span.start_line,
        end_line: construct.span.end_line,
        start_column: construct.span.start_column,
        end_column: construct.span.end_column,
        original_text: source[construct.span.start_byte..construct.span.end_byte].to_string(),
        category: construct.kind.to_string(),
        parent_category: construct.parent_kind.map(|k| k.to_string()),
        name: construct.name.clone(),
    }
}

/// Reconstructs the original source from a masked buffer and its spans,
/// used by tests of the masking-fidelity invariant and available to
/// callers that want to verify a round trip.
pub fn unmask(masked: &str, spans: &[MaskSpan]) -> String {
    let mut by_desc: Vec<&MaskSpan> = spans.iter().collect();
    by_desc.sort_by(|a, b| b.start_byte.cmp(&a.start_byte));

    let mut buffer = masked.to_string();
    // Mask tokens appear in ascending order in `masked`; replace the
    // k-th occurrence (from the end, descending span order) with its
    // original text. Since tokens are fixed-width and don't overlap,
    // locating them by repeated rfind of MASK_TOKEN, bounded by the
    // count already consumed, recovers the correct occurrence.
    for (i, span) in by_desc.iter().enumerate() {
        let occurrence_from_end = i;
        let mut search_end = buffer.len();
        let mut found_at = None;
        for _ in 0..=occurrence_from_end {
            found_at = buffer[..search_end].rfind(MASK_TOKEN);
            match found_at {
                Some(idx) => search_end = idx,
                None => break,
            }
        }
        if let Some(idx) = found_at {
            buffer.replace_range(idx..idx + MASK_TOKEN.len(), &span.original_text);
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_single_python_function() {
        let source = "def add(a,b):\n    return a+b\n";
        let (masked, spans) = mask(source, &["add".to_string()], LanguageKind::Python);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].category, "function_definition");
        assert_eq!(masked, "[MASK]\n");
    }

    #[test]
    fn missing_name_yields_empty_spans_and_unchanged_source() {
        let source = "def add(a,b):\n    return a+b\n";
        let (masked, spans) = mask(source, &["missing".to_string()], LanguageKind::Python);
        assert!(spans.is_empty());
        assert_eq!(masked, source);
    }

    #[test]
    fn masking_fidelity_round_trips_byte_for_byte() {
        let source = "def a():\n    pass\n\ndef b():\n    return 1\n";
        let (masked, spans) = mask(
            source,
            &["a".to_string(), "b".to_string()],
            LanguageKind::Python,
        );
        assert_eq!(spans.len(), 2);
        assert_eq!(masked.matches(MASK_TOKEN).count(), spans.len());
        assert_eq!(unmask(&masked, &spans), source);
    }

    #[test]
    fn spans_are_disjoint_and_in_ascending_order() {
        let source = "def a():\n    pass\n\ndef b():\n    return 1\n";
        let (_, spans) = mask(
            source,
            &["a".to_string(), "b".to_string()],
            LanguageKind::Python,
        );
        for w in spans.windows(2) {
            assert!(w[0].start_byte < w[1].start_byte);
            assert!(w[0].end_byte <= w[1].start_byte);
        }
    }

    #[test]
    fn duplicate_target_names_dedup_to_one_span() {
        let source = "def a():\n    pass\n";
        let (_, spans) = mask(
            source,
            &["a".to_string(), "a".to_string()],
            LanguageKind::Python,
        );
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn whole_file_single_function_yields_one_full_span() {
        let source = "def only():\n    pass\n";
        let (masked, spans) = mask(source, &["only".to_string()], LanguageKind::Python);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_byte, 0);
        assert_eq!(spans[0].end_byte, source.trim_end_matches('\n').len());
        assert_eq!(masked, "[MASK]\n");
    }
}
