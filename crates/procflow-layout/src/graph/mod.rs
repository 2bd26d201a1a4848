use crate::error::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn validate(&self) -> Result<()> {
        let index = self.index()?;
        for n in &self.nodes {
            if !(n.width.is_finite() && n.height.is_finite() && n.width > 0.0 && n.height > 0.0) {
                return Err(Error::InvalidNodeSize { id: n.id.clone() });
            }
        }
        for e in &self.edges {
            if !index.contains_key(e.source.as_str()) || !index.contains_key(e.target.as_str()) {
                return Err(Error::MissingEndpoint {
                    source_id: e.source.clone(),
                    target_id: e.target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Id → position in `nodes`.
    pub fn index(&self) -> Result<FxHashMap<&str, usize>> {
        let mut index = FxHashMap::default();
        for (i, n) in self.nodes.iter().enumerate() {
            if index.insert(n.id.as_str(), i).is_some() {
                return Err(Error::DuplicateNode { id: n.id.clone() });
            }
        }
        Ok(index)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub metadata: IndexMap<String, String>,
    /// Optional initial position (center) from a previous layout.
    pub prior: Option<Point>,
}

impl Node {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            metadata: IndexMap::new(),
            prior: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_prior(mut self, prior: Point) -> Self {
        self.prior = Some(prior);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub condition: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned box, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn expand(&self, padding: f64) -> Self {
        Self {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + 2.0 * padding,
            height: self.height + 2.0 * padding,
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }

    /// Whether the segment `a → b` passes through the interior of the box (Liang–Barsky clip).
    /// Grazing an edge or a corner does not count.
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        const EPS: f64 = 1e-9;
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        for (p, q) in [
            (-dx, a.x - self.min_x()),
            (dx, self.max_x() - a.x),
            (-dy, a.y - self.min_y()),
            (dy, self.max_y() - a.y),
        ] {
            if p.abs() < EPS {
                if q <= EPS {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 >= t1 {
                return false;
            }
        }
        // Require a real stretch inside, not just a touching point.
        (t1 - t0) * dx.hypot(dy) > EPS
    }
}

/// Bounds of a set of points, `None` when empty.
pub fn bounds_of(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    let mut it = points.into_iter();
    let first = it.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in it {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB", alias = "tb")]
    TopToBottom,
    #[serde(rename = "LR", alias = "lr")]
    LeftToRight,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::TopToBottom => "TB",
            Direction::LeftToRight => "LR",
        }
    }

    /// Side on which incoming edges attach first.
    pub fn entry_side(self) -> Side {
        match self {
            Direction::TopToBottom => Side::Top,
            Direction::LeftToRight => Side::Left,
        }
    }

    /// Side on which outgoing edges attach first.
    pub fn exit_side(self) -> Side {
        match self {
            Direction::TopToBottom => Side::Bottom,
            Direction::LeftToRight => Side::Right,
        }
    }

    /// The two cross sides, in alternation order.
    pub fn cross_sides(self) -> [Side; 2] {
        match self {
            Direction::TopToBottom => [Side::Left, Side::Right],
            Direction::LeftToRight => [Side::Top, Side::Bottom],
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tb" | "td" | "top-to-bottom" => Ok(Direction::TopToBottom),
            "lr" | "left-to-right" => Ok(Direction::LeftToRight),
            other => Err(Error::InvalidOptions {
                message: format!("unknown direction `{other}` (expected tb or lr)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" => Ok(Side::Top),
            "bottom" => Ok(Side::Bottom),
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(Error::InvalidOptions {
                message: format!("unknown side `{other}`"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Normal,
    Validation,
    Distribution,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Normal => "normal",
            NodeKind::Validation => "validation",
            NodeKind::Distribution => "distribution",
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(NodeKind::Normal),
            "validation" => Ok(NodeKind::Validation),
            "distribution" => Ok(NodeKind::Distribution),
            other => Err(Error::InvalidOptions {
                message: format!("unknown node kind `{other}`"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankSource {
    /// Ranked by longest path from a root.
    #[default]
    Reachable,
    /// Not reachable from any root; rank borrowed from the nearest ranked node.
    Fallback,
}

impl RankSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RankSource::Reachable => "reachable",
            RankSource::Fallback => "fallback",
        }
    }
}

impl std::str::FromStr for RankSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reachable" => Ok(RankSource::Reachable),
            "fallback" => Ok(RankSource::Fallback),
            other => Err(Error::InvalidOptions {
                message: format!("unknown rank source `{other}`"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: String,
    /// Center of the node.
    pub position: Point,
    pub rank: usize,
    pub rank_source: RankSource,
    pub bounding_box: Rect,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedEdge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// At least two points; the first is the source anchor, the last the target anchor.
    pub path: Vec<Point>,
    pub source_anchor: Side,
    pub target_anchor: Side,
    pub source_handle: String,
    pub target_handle: String,
    #[serde(default)]
    pub bundle_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub iterations: usize,
    /// Edges that closed a cycle and were ignored for ranking.
    pub back_edges: Vec<EdgeRef>,
    pub fallback_nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub direction: Direction,
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<RoutedEdge>,
    pub report: LayoutReport,
}

impl LayoutResult {
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges between `a` and `b` in either direction.
    pub fn edges_between<'a>(
        &'a self,
        a: &'a str,
        b: &'a str,
    ) -> impl Iterator<Item = &'a RoutedEdge> + 'a {
        self.edges.iter().filter(move |e| {
            (e.source == a && e.target == b) || (e.source == b && e.target == a)
        })
    }
}
