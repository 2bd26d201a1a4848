//! Recoverable data problems found while building the tree or extracting the flow graph.
//!
//! None of these abort a build. Each has a deterministic resolution (skip, first-wins,
//! merge-fill, drop the edge) and is logged once when recorded.

use crate::schema::Level;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// The row has no L0 identifier and contributed nothing.
    RowRejected { row: usize, reason: String },
    /// A level was blank while a deeper level of the same chain was filled in.
    MissingIdentifier { row: usize, level: Level },
    /// A predecessor id does not resolve to any node in the extracted graph.
    DanglingReference { from: String, to: String },
    /// Two rows disagree on a field of the same node; the first value is kept.
    DuplicateIdentifierConflict {
        id: String,
        field: String,
        kept: String,
        ignored: String,
    },
    /// A hierarchy node was placed under a second parent; the first parent is kept.
    ParentConflict {
        id: String,
        kept_parent: String,
        ignored_parent: String,
    },
    /// An id already used at another level; the later row stops descending.
    LevelConflict {
        row: usize,
        id: String,
        existing: Level,
        incoming: Level,
    },
    /// The predecessor cell could not be parsed; treated as an empty list.
    MalformedPredecessors {
        row: usize,
        level: Level,
        raw: String,
    },
    /// A node listed itself as predecessor; the relationship is dropped.
    SelfReference { id: String },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::RowRejected { .. } => "rowRejected",
            Diagnostic::MissingIdentifier { .. } => "missingIdentifier",
            Diagnostic::DanglingReference { .. } => "danglingReference",
            Diagnostic::DuplicateIdentifierConflict { .. } => "duplicateIdentifierConflict",
            Diagnostic::ParentConflict { .. } => "parentConflict",
            Diagnostic::LevelConflict { .. } => "levelConflict",
            Diagnostic::MalformedPredecessors { .. } => "malformedPredecessors",
            Diagnostic::SelfReference { .. } => "selfReference",
        }
    }

    fn log(&self) {
        match self {
            Diagnostic::RowRejected { row, reason } => {
                tracing::warn!(row, %reason, "row rejected");
            }
            Diagnostic::MissingIdentifier { row, level } => {
                tracing::warn!(row, %level, "missing identifier; deeper levels ignored");
            }
            Diagnostic::DanglingReference { from, to } => {
                tracing::debug!(%from, %to, "dangling predecessor reference dropped");
            }
            Diagnostic::DuplicateIdentifierConflict {
                id,
                field,
                kept,
                ignored,
            } => {
                tracing::debug!(%id, %field, %kept, %ignored, "conflicting duplicate value ignored");
            }
            Diagnostic::ParentConflict {
                id,
                kept_parent,
                ignored_parent,
            } => {
                tracing::warn!(%id, %kept_parent, %ignored_parent, "node already has a parent");
            }
            Diagnostic::LevelConflict {
                row,
                id,
                existing,
                incoming,
            } => {
                tracing::warn!(row, %id, %existing, %incoming, "id reused across levels");
            }
            Diagnostic::MalformedPredecessors { row, level, raw } => {
                tracing::warn!(row, %level, %raw, "unparseable predecessor list");
            }
            Diagnostic::SelfReference { id } => {
                tracing::debug!(%id, "self predecessor dropped");
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.entries.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn dangling_references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|d| match d {
            Diagnostic::DanglingReference { from, to } => Some((from.as_str(), to.as_str())),
            _ => None,
        })
    }

    /// Per-kind counts in first-seen order, for summaries.
    pub fn summary(&self) -> indexmap::IndexMap<&'static str, usize> {
        let mut out = indexmap::IndexMap::new();
        for d in &self.entries {
            *out.entry(d.kind()).or_insert(0) += 1;
        }
        out
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
