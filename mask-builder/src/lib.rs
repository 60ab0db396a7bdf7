//! Mask Builder (Component 2).
//!
//! Turns `(source, target_names, language)` into a masked buffer and
//! an ordered list of Mask Spans, following the algorithm in the
//! component design: find, dedup, sort descending, replace, reverse.

pub mod span;

pub use span::{MaskSpan, mask, unmask};

/// The fixed literal placeholder inserted for each excised span.
pub const MASK_TOKEN: &str = "[MASK]";
