//! Flattens the tree (or a sub-tree) into a `{nodes, edges}` flow graph.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::model::{NodeId, ProcessTree};
use crate::schema::Level;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub level: Level,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Checks that every edge endpoint names a node. Extracted graphs always pass; this guards
    /// graphs deserialized from elsewhere.
    pub fn validate(&self) -> Result<()> {
        let ids: FxHashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        for e in &self.edges {
            for end in [&e.from, &e.to] {
                if !ids.contains(end.as_str()) {
                    return Err(Error::UnknownNode { id: end.clone() });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Shallowest level that becomes a graph node.
    pub min_level: Level,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_level: Level::FIRST_PROCESS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub graph: FlowGraph,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy)]
pub struct FlowGraphExtractor<'t> {
    tree: &'t ProcessTree,
    options: ExtractOptions,
}

impl<'t> FlowGraphExtractor<'t> {
    pub fn new(tree: &'t ProcessTree) -> Self {
        Self {
            tree,
            options: ExtractOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn extract(&self) -> Extraction {
        self.extract_nodes(self.tree.walk())
    }

    pub fn extract_from(&self, root: NodeId) -> Extraction {
        self.extract_nodes(self.tree.descendants(root))
    }

    fn extract_nodes(&self, order: Vec<NodeId>) -> Extraction {
        let tree = self.tree;
        let selected: Vec<NodeId> = order
            .into_iter()
            .filter(|&id| tree.node(id).level >= self.options.min_level)
            .collect();

        let mut out = Extraction::default();
        let emitted: FxHashSet<&str> = selected
            .iter()
            .map(|&id| tree.node(id).id.as_str())
            .collect();

        for &id in &selected {
            let n = tree.node(id);
            out.graph.nodes.push(GraphNode {
                id: n.id.clone(),
                label: n.label().to_string(),
                level: n.level,
                metadata: n.metadata.clone(),
                child_ids: n.children.keys().cloned().collect(),
            });
        }

        let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
        for &id in &selected {
            let n = tree.node(id);
            let Some(rel) = &n.relationships else {
                continue;
            };
            for pred in rel.entries() {
                if !emitted.contains(pred.id.as_str()) {
                    out.diagnostics.push(Diagnostic::DanglingReference {
                        from: pred.id.clone(),
                        to: n.id.clone(),
                    });
                    continue;
                }
                if !seen.insert((pred.id.as_str(), n.id.as_str())) {
                    continue;
                }
                out.graph.edges.push(GraphEdge {
                    from: pred.id.clone(),
                    to: n.id.clone(),
                    condition: pred.condition.clone(),
                });
            }
        }

        tracing::debug!(
            nodes = out.graph.nodes.len(),
            edges = out.graph.edges.len(),
            dangling = out.diagnostics.len(),
            "flow graph extracted"
        );
        out
    }
}

/// Extracts the whole tree with default options.
pub fn extract_flow_graph(tree: &ProcessTree) -> Extraction {
    FlowGraphExtractor::new(tree).extract()
}
