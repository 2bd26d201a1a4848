//! The deduplicated hierarchy tree.
//!
//! Nodes live in an arena and refer to their children by [`NodeId`]. A process node reached
//! from two parents is stored once and linked from both, so every id has a single source of
//! truth across the batch.

use crate::schema::Level;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predecessor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Ordered, deduplicated predecessor list with positionally aligned conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    entries: Vec<Predecessor>,
}

impl Relationships {
    pub fn new(entries: Vec<Predecessor>) -> Self {
        let mut out = Self::default();
        out.merge(entries);
        out
    }

    /// Union by id in first-appearance order. A later condition only fills a missing one.
    /// Returns the `(id, kept, ignored)` condition conflicts encountered.
    pub fn merge(
        &mut self,
        incoming: impl IntoIterator<Item = Predecessor>,
    ) -> Vec<(String, String, String)> {
        let mut conflicts = Vec::new();
        for p in incoming {
            let Some(existing) = self.entries.iter_mut().find(|e| e.id == p.id) else {
                self.entries.push(p);
                continue;
            };
            let Some(incoming) = p.condition else {
                continue;
            };
            match existing.condition.clone() {
                None => existing.condition = Some(incoming),
                Some(kept) if kept != incoming => conflicts.push((p.id, kept, incoming)),
                Some(_) => {}
            }
        }
        conflicts
    }

    pub fn entries(&self) -> &[Predecessor] {
        &self.entries
    }

    pub fn predecessors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.id.as_str())
    }

    /// One slot per predecessor, `None` where no condition was given.
    pub fn conditions(&self) -> Vec<Option<&str>> {
        self.entries.iter().map(|p| p.condition.as_deref()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for Relationships {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let preds: Vec<&str> = self.predecessors().collect();
        let mut st = serializer.serialize_struct("Relationships", 2)?;
        st.serialize_field("predecessors", &preds)?;
        st.serialize_field("conditions", &self.conditions())?;
        st.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessNode {
    pub id: String,
    pub name: String,
    pub level: Level,
    pub metadata: IndexMap<String, String>,
    pub relationships: Option<Relationships>,
    pub children: IndexMap<String, NodeId>,
}

impl ProcessNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, level: Level) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level,
            metadata: IndexMap::new(),
            relationships: None,
            children: IndexMap::new(),
        }
    }

    /// Display name, falling back to the id when the name is blank.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessTree {
    nodes: Vec<ProcessNode>,
    by_id: FxHashMap<String, NodeId>,
    first_parent: Vec<Option<NodeId>>,
    roots: IndexMap<String, NodeId>,
}

impl ProcessTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &ProcessNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ProcessNode {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.by_id.get(id).copied()
    }

    pub fn find(&self, id: &str) -> Option<&ProcessNode> {
        self.get(id).map(|n| self.node(n))
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.values().copied()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.values().copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.first_parent[id.0]
    }

    /// Every node in arena (creation) order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ProcessNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// The process map: every node at a process level, in creation order.
    pub fn process_nodes(&self) -> impl Iterator<Item = (NodeId, &ProcessNode)> {
        self.iter().filter(|(_, n)| n.level.is_process())
    }

    /// Pre-order walk from `start`; shared nodes are visited once.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(cur) = stack.pop() {
            if std::mem::replace(&mut seen[cur.0], true) {
                continue;
            }
            out.push(cur);
            let children: Vec<NodeId> = self.children(cur).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Pre-order walk over every root.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut out = Vec::new();
        for root in self.roots() {
            for id in self.descendants(root) {
                if !std::mem::replace(&mut seen[id.0], true) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Root-to-node path following first parents, for breadcrumb navigation.
    pub fn breadcrumb(&self, id: &str) -> Vec<&ProcessNode> {
        let Some(mut cur) = self.get(id) else {
            return Vec::new();
        };
        let mut path = vec![self.node(cur)];
        while let Some(parent) = self.parent(cur) {
            path.push(self.node(parent));
            cur = parent;
        }
        path.reverse();
        path
    }

    pub(crate) fn insert(&mut self, node: ProcessNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_id.insert(node.id.clone(), id);
        match parent {
            Some(p) => {
                self.nodes[p.0].children.insert(node.id.clone(), id);
            }
            None => {
                self.roots.insert(node.id.clone(), id);
            }
        }
        self.first_parent.push(parent);
        self.nodes.push(node);
        id
    }

    /// Links an existing node as an additional child of `parent`.
    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId) {
        let key = self.nodes[child.0].id.clone();
        self.nodes[parent.0].children.entry(key).or_insert(child);
    }

    /// Nested view suitable for serialization: `{ id: { ..., children: { ... } } }`.
    pub fn view(&self) -> TreeView<'_> {
        TreeView {
            tree: self,
            ids: self.roots.values().copied().collect(),
        }
    }

    /// Nested view of one sub-tree.
    pub fn subtree_view(&self, root: NodeId) -> TreeView<'_> {
        TreeView {
            tree: self,
            ids: vec![root],
        }
    }
}

impl Serialize for ProcessTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view().serialize(serializer)
    }
}

pub struct TreeView<'a> {
    tree: &'a ProcessTree,
    ids: Vec<NodeId>,
}

impl Serialize for TreeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.ids.len()))?;
        for &id in &self.ids {
            let node = self.tree.node(id);
            map.serialize_entry(
                &node.id,
                &NodeView {
                    tree: self.tree,
                    node,
                },
            )?;
        }
        map.end()
    }
}

struct NodeView<'a> {
    tree: &'a ProcessTree,
    node: &'a ProcessNode,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let n = self.node;
        let children = TreeView {
            tree: self.tree,
            ids: n.children.values().copied().collect(),
        };
        let mut st = serializer.serialize_struct("ProcessNode", 6)?;
        st.serialize_field("id", &n.id)?;
        st.serialize_field("name", &n.name)?;
        st.serialize_field("level", &n.level)?;
        st.serialize_field("metadata", &n.metadata)?;
        st.serialize_field("relationships", &n.relationships)?;
        st.serialize_field("children", &children)?;
        st.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str, c: Option<&str>) -> Predecessor {
        Predecessor {
            id: id.into(),
            condition: c.map(Into::into),
        }
    }

    #[test]
    fn relationship_merge_is_a_union_that_fills_conditions() {
        let mut rel = Relationships::new(vec![p("A", None), p("B", Some("x"))]);
        let conflicts = rel.merge(vec![p("C", None), p("A", Some("late")), p("B", Some("y"))]);
        assert_eq!(rel.predecessors().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(rel.conditions(), vec![Some("late"), Some("x"), None]);
        assert_eq!(
            conflicts,
            vec![("B".to_string(), "x".to_string(), "y".to_string())]
        );
    }

    #[test]
    fn breadcrumb_follows_first_parents() {
        let mut t = ProcessTree::new();
        let d = t.insert(ProcessNode::new("D", "Domain", Level::L0), None);
        let l = t.insert(ProcessNode::new("B", "", Level::L1), Some(d));
        t.insert(ProcessNode::new("P", "Proc", Level::L4), Some(l));
        let ids: Vec<&str> = t.breadcrumb("P").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["D", "B", "P"]);
        assert!(t.breadcrumb("missing").is_empty());
        assert_eq!(t.find("B").unwrap().label(), "B");
    }

    #[test]
    fn shared_children_are_walked_once() {
        let mut t = ProcessTree::new();
        let d = t.insert(ProcessNode::new("D", "", Level::L0), None);
        let a = t.insert(ProcessNode::new("A", "", Level::L4), Some(d));
        let b = t.insert(ProcessNode::new("B", "", Level::L4), Some(d));
        let s = t.insert(ProcessNode::new("S", "", Level::L5), Some(a));
        t.link(b, s);
        assert_eq!(t.walk(), vec![d, a, s, b]);
        assert_eq!(t.node(b).children.get("S"), Some(&s));
    }

    #[test]
    fn tree_serializes_as_nested_maps() {
        let mut t = ProcessTree::new();
        let d = t.insert(ProcessNode::new("D", "Domain", Level::L0), None);
        t.insert(ProcessNode::new("P", "Proc", Level::L4), Some(d));
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["D"]["level"], "L0");
        assert_eq!(v["D"]["children"]["P"]["name"], "Proc");
        assert!(v["D"]["children"]["P"]["relationships"].is_null());
    }

    #[test]
    fn missing_conditions_serialize_as_null_in_place() {
        let rel = Relationships::new(vec![p("A", None), p("B", Some("yes")), p("C", None)]);
        let v = serde_json::to_value(&rel).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "predecessors": ["A", "B", "C"],
                "conditions": [null, "yes", null]
            })
        );

        // The serialized arrays are valid relationship cells and read back to the same pairs.
        let back = crate::parse_relationships(
            Some(&v["predecessors"].to_string()),
            Some(&v["conditions"].to_string()),
        )
        .unwrap();
        assert_eq!(back, rel.entries());
    }
}
