//! Knowledge-graph capability (consumed, not implemented here).
//!
//! The ingestion/indexing pipeline that populates the graph is out of
//! scope (§1). This module specifies only the query surface the core
//! consumes, as an abstract property-bag interface, plus a
//! [`NullGraph`] that always returns empty results so callers degrade
//! gracefully when no graph is configured.

use serde_json::Value;

/// An opaque node: whatever properties the graph implementation chose
/// to attach. The core never assumes a schema beyond what it asks for.
pub type GraphNode = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Contains,
    Imports,
    InheritsFrom,
    Calls,
}

/// Abstract query surface the core consumes (§6). Implementations are
/// out of scope; this crate only ships [`NullGraph`], used when no
/// graph is configured, and any caller-supplied implementation is
/// accepted behind this trait.
pub trait KnowledgeGraph: Send + Sync {
    fn get_file_by_path(&self, path: &str) -> Option<GraphNode>;
    fn get_contents_by_property(&self, kind: &str, key: &str, value: &str) -> Vec<GraphNode>;
    fn get_related_nodes(&self, node_id: &str, relation: Relation, depth: u32) -> Vec<GraphNode>;
    fn get_dependencies(&self, symbol_id: &str) -> Vec<GraphNode>;
}

/// Graceful-degradation default: an always-empty graph. The core skips
/// dependency enrichment and proceeds with direct-file context only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGraph;

impl KnowledgeGraph for NullGraph {
    fn get_file_by_path(&self, _path: &str) -> Option<GraphNode> {
        None
    }

    fn get_contents_by_property(&self, _kind: &str, _key: &str, _value: &str) -> Vec<GraphNode> {
        Vec::new()
    }

    fn get_related_nodes(&self, _node_id: &str, _relation: Relation, _depth: u32) -> Vec<GraphNode> {
        Vec::new()
    }

    fn get_dependencies(&self, _symbol_id: &str) -> Vec<GraphNode> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_graph_degrades_to_empty_everywhere() {
        let g = NullGraph;
        assert!(g.get_file_by_path("a.py").is_none());
        assert!(g.get_contents_by_property("function", "name", "foo").is_empty());
        assert!(g.get_related_nodes("n1", Relation::Calls, 1).is_empty());
        assert!(g.get_dependencies("sym").is_empty());
    }
}
