use crate::export::LaidOutGraph;
use procflow_core::{
    Diagnostics, ExtractOptions, Extraction, FlowGraph, FlowGraphExtractor, HierarchyBuild,
    HierarchyBuilder, LevelSchema, ProcessTree, RawRow,
};
use procflow_layout::{Graph, LayoutOptions, LayoutReport, Node, Point};
use rustc_hash::FxHashMap;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Build(#[from] procflow_core::Error),
    #[error(transparent)]
    Layout(#[from] procflow_layout::Error),
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed export: {message}")]
    MalformedExport { message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Parses layout options from JSON (when the text starts with `{`) or YAML. Missing fields keep
/// their defaults.
pub fn layout_options_from_str(text: &str) -> Result<LayoutOptions> {
    let options: LayoutOptions = if text.trim_start().starts_with('{') {
        serde_json::from_str(text)?
    } else if text.trim().is_empty() {
        LayoutOptions::default()
    } else {
        serde_yaml::from_str(text)?
    };
    options.validate()?;
    Ok(options)
}

/// Builds the layout engine's input. Node order and edge order follow the flow graph.
pub fn to_layout_graph(graph: &FlowGraph, options: &LayoutOptions) -> Graph {
    Graph {
        nodes: graph
            .nodes
            .iter()
            .map(|n| {
                let mut node = Node::new(n.id.clone(), options.node_width, options.node_height);
                node.metadata = n.metadata.clone();
                node
            })
            .collect(),
        edges: graph
            .edges
            .iter()
            .map(|e| procflow_layout::Edge {
                source: e.from.clone(),
                target: e.to.clone(),
                condition: e.condition.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub tree: ProcessTree,
    pub graph: FlowGraph,
    pub laid_out: LaidOutGraph,
    pub report: LayoutReport,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    schema: LevelSchema,
    extract: ExtractOptions,
    layout: LayoutOptions,
    scope: Option<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: LevelSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_extract_options(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    pub fn with_layout_options(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Restricts graph extraction to the sub-tree rooted at `id`.
    pub fn with_scope(mut self, id: impl Into<String>) -> Self {
        self.scope = Some(id.into());
        self
    }

    pub fn schema(&self) -> &LevelSchema {
        &self.schema
    }

    pub fn layout_options(&self) -> &LayoutOptions {
        &self.layout
    }

    pub fn build_tree(&self, rows: &[RawRow]) -> HierarchyBuild {
        HierarchyBuilder::new(&self.schema).build(rows)
    }

    pub fn extract(&self, tree: &ProcessTree) -> Result<Extraction> {
        let extractor = FlowGraphExtractor::new(tree).with_options(self.extract);
        match &self.scope {
            None => Ok(extractor.extract()),
            Some(id) => {
                let root = tree
                    .get(id)
                    .ok_or_else(|| procflow_core::Error::UnknownNode { id: id.clone() })?;
                Ok(extractor.extract_from(root))
            }
        }
    }

    pub fn layout(&self, graph: &FlowGraph) -> Result<(LaidOutGraph, LayoutReport)> {
        self.layout_with_priors(graph, None)
    }

    /// Lays out `graph`, starting nodes that also appear in `prior` from their previous
    /// positions (e.g. when toggling direction).
    pub fn layout_with_priors(
        &self,
        graph: &FlowGraph,
        prior: Option<&LaidOutGraph>,
    ) -> Result<(LaidOutGraph, LayoutReport)> {
        let mut input = to_layout_graph(graph, &self.layout);
        if let Some(prior) = prior {
            let positions: FxHashMap<&str, Point> = prior
                .nodes
                .iter()
                .map(|n| (n.id.as_str(), n.position))
                .collect();
            for node in &mut input.nodes {
                node.prior = positions.get(node.id.as_str()).copied();
            }
        }
        let result = procflow_layout::layout(&input, &self.layout)?;
        let report = result.report.clone();
        Ok((LaidOutGraph::assemble(graph, result)?, report))
    }

    pub fn run(&self, rows: &[RawRow]) -> Result<PipelineOutput> {
        let HierarchyBuild {
            tree,
            mut diagnostics,
        } = self.build_tree(rows);
        let Extraction {
            graph,
            diagnostics: extract_diagnostics,
        } = self.extract(&tree)?;
        diagnostics.extend(extract_diagnostics);
        let (laid_out, report) = self.layout(&graph)?;

        tracing::debug!(
            rows = rows.len(),
            tree_nodes = tree.len(),
            graph_nodes = graph.nodes.len(),
            graph_edges = graph.edges.len(),
            diagnostics = diagnostics.len(),
            "pipeline finished"
        );
        Ok(PipelineOutput {
            tree,
            graph,
            laid_out,
            report,
            diagnostics,
        })
    }
}
