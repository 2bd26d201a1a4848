#![forbid(unsafe_code)]

//! Process hierarchy builder (headless).
//!
//! Flat process-definition rows go in; a deduplicated multi-level [`ProcessTree`] and a
//! flattened [`FlowGraph`] come out. Data problems never abort a build: they are collected as
//! [`Diagnostic`]s next to the result. Only malformed input is a hard [`Error`].

pub mod diagnostics;
pub mod error;
pub mod flow;
pub mod hierarchy;
pub mod model;
pub mod row;
pub mod schema;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Error, Result};
pub use flow::{
    ExtractOptions, Extraction, FlowGraph, FlowGraphExtractor, GraphEdge, GraphNode,
    extract_flow_graph,
};
pub use hierarchy::{HierarchyBuild, HierarchyBuilder, build_hierarchy};
pub use model::{NodeId, Predecessor, ProcessNode, ProcessTree, Relationships, TreeView};
pub use row::{
    LevelEntry, NormalizedRow, RawRow, RowNormalizer, parse_relationships, rows_from_csv,
    rows_from_json, rows_from_json_str,
};
pub use schema::{Level, LevelSchema, LevelSpec, RelationshipColumns};

#[cfg(test)]
mod tests;
