//! The laid-out graph handed to presentation layers, as JSON or as two CSV tables.

use crate::pipeline::{PipelineError, Result};
use indexmap::IndexMap;
use procflow_core::{FlowGraph, Level};
use procflow_layout::{
    Direction, LayoutResult, NodeKind, Point, RankSource, Rect, RoutedEdge, Side, bounds_of,
};
use serde::{Deserialize, Serialize};

const NODE_COLUMNS: [&str; 12] = [
    "id",
    "label",
    "level",
    "kind",
    "rank",
    "rankSource",
    "x",
    "y",
    "width",
    "height",
    "metadata",
    "childIds",
];

const EDGE_COLUMNS: [&str; 9] = [
    "from",
    "to",
    "condition",
    "sourceAnchor",
    "targetAnchor",
    "sourceHandle",
    "targetHandle",
    "bundleOffset",
    "path",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutNode {
    pub id: String,
    pub label: String,
    pub level: Level,
    pub kind: NodeKind,
    pub rank: usize,
    pub rank_source: RankSource,
    /// Center of the node.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
}

impl LaidOutNode {
    pub fn bounding_box(&self) -> Rect {
        Rect::from_center(self.position, self.width, self.height)
    }
}

/// Smallest box covering every node box and every route point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub direction: Direction,
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn covering(direction: Direction, nodes: &[LaidOutNode], edges: &[RoutedEdge]) -> Self {
        let corners = nodes.iter().flat_map(|n| {
            let r = n.bounding_box();
            [
                Point::new(r.min_x(), r.min_y()),
                Point::new(r.max_x(), r.max_y()),
            ]
        });
        let route_points = edges.iter().flat_map(|e| e.path.iter().copied());
        let b = bounds_of(corners.chain(route_points)).unwrap_or(Rect {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        });
        Self {
            direction,
            min_x: b.x,
            min_y: b.y,
            width: b.width,
            height: b.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutGraph {
    pub nodes: Vec<LaidOutNode>,
    pub edges: Vec<RoutedEdge>,
    pub viewport: Viewport,
}

impl LaidOutGraph {
    /// Joins flow-graph node data with layout output. Both must list the same nodes in the
    /// same order, which holds for results produced from [`crate::to_layout_graph`].
    pub fn assemble(graph: &FlowGraph, result: LayoutResult) -> Result<Self> {
        if graph.nodes.len() != result.nodes.len() {
            return Err(PipelineError::MalformedExport {
                message: format!(
                    "flow graph has {} nodes but the layout has {}",
                    graph.nodes.len(),
                    result.nodes.len()
                ),
            });
        }
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for (g, l) in graph.nodes.iter().zip(result.nodes) {
            if g.id != l.id {
                return Err(PipelineError::MalformedExport {
                    message: format!("node order mismatch: `{}` vs `{}`", g.id, l.id),
                });
            }
            nodes.push(LaidOutNode {
                id: l.id,
                label: g.label.clone(),
                level: g.level,
                kind: l.kind,
                rank: l.rank,
                rank_source: l.rank_source,
                position: l.position,
                width: l.bounding_box.width,
                height: l.bounding_box.height,
                metadata: g.metadata.clone(),
                child_ids: g.child_ids.clone(),
            });
        }
        let viewport = Viewport::covering(result.direction, &nodes, &result.edges);
        Ok(Self {
            nodes,
            edges: result.edges,
            viewport,
        })
    }

    pub fn node(&self, id: &str) -> Option<&LaidOutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// One row per node; metadata and child ids are JSON-encoded cells.
    pub fn write_nodes_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(NODE_COLUMNS)?;
        for n in &self.nodes {
            w.write_record([
                n.id.clone(),
                n.label.clone(),
                n.level.to_string(),
                n.kind.as_str().to_string(),
                n.rank.to_string(),
                n.rank_source.as_str().to_string(),
                n.position.x.to_string(),
                n.position.y.to_string(),
                n.width.to_string(),
                n.height.to_string(),
                serde_json::to_string(&n.metadata)?,
                serde_json::to_string(&n.child_ids)?,
            ])?;
        }
        w.flush()?;
        Ok(())
    }

    /// One row per edge; the route is a JSON-encoded list of points.
    pub fn write_edges_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(EDGE_COLUMNS)?;
        for e in &self.edges {
            w.write_record([
                e.source.clone(),
                e.target.clone(),
                e.condition.clone().unwrap_or_default(),
                e.source_anchor.to_string(),
                e.target_anchor.to_string(),
                e.source_handle.clone(),
                e.target_handle.clone(),
                e.bundle_offset.to_string(),
                serde_json::to_string(&e.path)?,
            ])?;
        }
        w.flush()?;
        Ok(())
    }

    /// Reads the two tables written by [`Self::write_nodes_csv`] and [`Self::write_edges_csv`].
    /// The viewport is recomputed.
    pub fn from_csv<N: std::io::Read, E: std::io::Read>(
        nodes: N,
        edges: E,
        direction: Direction,
    ) -> Result<Self> {
        let nodes = read_table(nodes, &NODE_COLUMNS, |row| {
            Ok(LaidOutNode {
                id: row.text("id"),
                label: row.text("label"),
                level: row.text("level").parse()?,
                kind: row.text("kind").parse()?,
                rank: row.parse("rank")?,
                rank_source: row.text("rankSource").parse()?,
                position: Point::new(row.parse("x")?, row.parse("y")?),
                width: row.parse("width")?,
                height: row.parse("height")?,
                metadata: serde_json::from_str(row.get("metadata"))?,
                child_ids: serde_json::from_str(row.get("childIds"))?,
            })
        })?;
        let edges = read_table(edges, &EDGE_COLUMNS, |row| {
            let condition = row.get("condition");
            Ok(RoutedEdge {
                source: row.text("from"),
                target: row.text("to"),
                condition: (!condition.is_empty()).then(|| condition.to_string()),
                path: serde_json::from_str(row.get("path"))?,
                source_anchor: row.get("sourceAnchor").parse::<Side>()?,
                target_anchor: row.get("targetAnchor").parse::<Side>()?,
                source_handle: row.text("sourceHandle"),
                target_handle: row.text("targetHandle"),
                bundle_offset: row.parse("bundleOffset")?,
            })
        })?;
        let viewport = Viewport::covering(direction, &nodes, &edges);
        Ok(Self {
            nodes,
            edges,
            viewport,
        })
    }
}

struct Row<'a> {
    index: usize,
    columns: &'a [usize],
    names: &'a [&'a str],
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn get(&self, name: &str) -> &str {
        self.names
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.record.get(self.columns[i]))
            .unwrap_or("")
    }

    fn text(&self, name: &str) -> String {
        self.get(name).to_string()
    }

    fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let raw = self.get(name);
        raw.parse().map_err(|_| PipelineError::MalformedExport {
            message: format!("row {}: column `{name}` has invalid value `{raw}`", self.index),
        })
    }
}

fn read_table<R, T>(
    reader: R,
    names: &[&str],
    mut build: impl FnMut(&Row<'_>) -> Result<T>,
) -> Result<Vec<T>>
where
    R: std::io::Read,
{
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let idx = headers.iter().position(|h| h == *name).ok_or_else(|| {
            PipelineError::MalformedExport {
                message: format!("missing column `{name}`"),
            }
        })?;
        columns.push(idx);
    }

    let mut out = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        out.push(build(&Row {
            index,
            columns: &columns,
            names,
            record: &record,
        })?);
    }
    Ok(out)
}
