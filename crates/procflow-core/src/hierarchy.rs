//! Folds normalized rows into the deduplicated [`ProcessTree`].

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{NodeId, ProcessNode, ProcessTree, Relationships};
use crate::row::{LevelEntry, RawRow, RowNormalizer};
use crate::schema::LevelSchema;

#[derive(Debug, Clone, Default)]
pub struct HierarchyBuild {
    pub tree: ProcessTree,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy)]
pub struct HierarchyBuilder<'s> {
    schema: &'s LevelSchema,
}

impl<'s> HierarchyBuilder<'s> {
    pub fn new(schema: &'s LevelSchema) -> Self {
        Self { schema }
    }

    pub fn build(&self, rows: &[RawRow]) -> HierarchyBuild {
        let mut out = HierarchyBuild::default();
        for (index, row) in rows.iter().enumerate() {
            self.ingest(&mut out.tree, index, row, &mut out.diagnostics);
        }
        tracing::debug!(
            rows = rows.len(),
            nodes = out.tree.len(),
            diagnostics = out.diagnostics.len(),
            "hierarchy built"
        );
        out
    }

    /// Adds one row to `tree`. The tree's id index is the dedup table: every level entry is
    /// resolved through it before anything is created.
    pub fn ingest(
        &self,
        tree: &mut ProcessTree,
        index: usize,
        row: &RawRow,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(row) = RowNormalizer::new(self.schema).normalize(index, row, diagnostics) else {
            return;
        };

        let mut parent: Option<NodeId> = None;
        for entry in row.entries() {
            match self.place(tree, parent, entry, index, diagnostics) {
                Some(id) => parent = Some(id),
                None => return,
            }
        }
    }

    fn place(
        &self,
        tree: &mut ProcessTree,
        parent: Option<NodeId>,
        entry: &LevelEntry,
        row: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<NodeId> {
        let Some(existing) = tree.get(&entry.id) else {
            let mut node = ProcessNode::new(
                entry.id.clone(),
                entry.name.clone().unwrap_or_default(),
                entry.level,
            );
            node.metadata = entry.metadata.clone();
            if self.schema.spec(entry.level).relationships.is_some() {
                node.relationships = Some(Relationships::new(entry.predecessors.clone()));
            }
            return Some(tree.insert(node, parent));
        };

        let existing_level = tree.node(existing).level;
        if existing_level != entry.level {
            diagnostics.push(Diagnostic::LevelConflict {
                row,
                id: entry.id.clone(),
                existing: existing_level,
                incoming: entry.level,
            });
            return None;
        }

        merge_entry(tree.node_mut(existing), entry, diagnostics);

        let current_parent = tree.parent(existing);
        if current_parent != parent {
            match parent {
                Some(p) if entry.level.is_process() => tree.link(p, existing),
                _ => diagnostics.push(Diagnostic::ParentConflict {
                    id: entry.id.clone(),
                    kept_parent: parent_label(tree, current_parent),
                    ignored_parent: parent_label(tree, parent),
                }),
            }
        }
        Some(existing)
    }
}

fn parent_label(tree: &ProcessTree, parent: Option<NodeId>) -> String {
    parent
        .map(|p| tree.node(p).id.clone())
        .unwrap_or_else(|| "(root)".to_string())
}

/// Merge-fill: blank name and unset metadata keys are filled, existing values are kept.
fn merge_entry(node: &mut ProcessNode, entry: &LevelEntry, diagnostics: &mut Diagnostics) {
    if let Some(name) = &entry.name {
        if node.name.is_empty() {
            node.name = name.clone();
        } else if node.name != *name {
            diagnostics.push(Diagnostic::DuplicateIdentifierConflict {
                id: node.id.clone(),
                field: "name".to_string(),
                kept: node.name.clone(),
                ignored: name.clone(),
            });
        }
    }

    for (key, value) in &entry.metadata {
        match node.metadata.get(key) {
            None => {
                node.metadata.insert(key.clone(), value.clone());
            }
            Some(kept) if kept != value => {
                diagnostics.push(Diagnostic::DuplicateIdentifierConflict {
                    id: node.id.clone(),
                    field: key.clone(),
                    kept: kept.clone(),
                    ignored: value.clone(),
                });
            }
            Some(_) => {}
        }
    }

    if entry.predecessors.is_empty() {
        return;
    }
    let conflicts = node
        .relationships
        .get_or_insert_with(Relationships::default)
        .merge(entry.predecessors.iter().cloned());
    for (pred, kept, ignored) in conflicts {
        diagnostics.push(Diagnostic::DuplicateIdentifierConflict {
            id: node.id.clone(),
            field: format!("condition[{pred}]"),
            kept,
            ignored,
        });
    }
}

/// Convenience wrapper around [`HierarchyBuilder::build`].
pub fn build_hierarchy(rows: &[RawRow], schema: &LevelSchema) -> HierarchyBuild {
    HierarchyBuilder::new(schema).build(rows)
}
