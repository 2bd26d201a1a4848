#![forbid(unsafe_code)]

//! `procflow` turns flat process-definition rows into a deduplicated hierarchy tree and a
//! laid-out flow graph, without any rendering.
//!
//! - [`procflow_core`] (re-exported at the root): schema, ingestion, tree and flow graph
//! - [`layout`]: the headless layout engine
//! - [`pipeline`]: rows → tree → graph → layout in one call
//! - [`export`]: the laid-out graph as JSON or node/edge CSV tables

pub use procflow_core::*;

pub mod layout {
    pub use procflow_layout::*;
}

pub mod export;
pub mod pipeline;

pub use export::{LaidOutGraph, LaidOutNode, Viewport};
pub use pipeline::{
    Pipeline, PipelineError, PipelineOutput, layout_options_from_str, to_layout_graph,
};
