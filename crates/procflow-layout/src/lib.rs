#![forbid(unsafe_code)]

//! Headless layout for process flow graphs.
//!
//! The pipeline is: seeded initial placement → rank assignment (longest path, cycles broken,
//! unrooted nodes ranked next to their closest start position) → ranked force simulation →
//! anchor assignment → obstacle-avoiding routing → parallel-edge bundling. Every step is
//! deterministic given the options' seed; nothing is kept between calls.

pub mod error;
pub mod force;
pub mod graph;
pub mod handles;
pub mod levels;
pub mod options;
pub mod rng;
pub mod routing;

pub use error::{Error, Result};
pub use graph::{
    Direction, Edge, EdgeRef, Graph, LayoutNode, LayoutReport, LayoutResult, Node, NodeKind,
    Point, RankSource, Rect, RoutedEdge, Side, bounds_of,
};
pub use options::LayoutOptions;
pub use rng::{RandomSource, XorShift64Star};

use force::ForceLayout;
use handles::HandleAssigner;
use routing::{EdgeRouter, RouteRequest};

/// Lays out `graph` with the default xorshift random source seeded from `options`.
pub fn layout(graph: &Graph, options: &LayoutOptions) -> Result<LayoutResult> {
    let mut rng = XorShift64Star::new(options.random_seed);
    layout_with_rng(graph, options, &mut rng)
}

pub fn layout_with_rng<R: RandomSource + ?Sized>(
    graph: &Graph,
    options: &LayoutOptions,
    rng: &mut R,
) -> Result<LayoutResult> {
    options.validate()?;
    graph.validate()?;

    let index = graph.index()?;
    let edges: Vec<(usize, usize)> = graph
        .edges
        .iter()
        .map(|e| (index[e.source.as_str()], index[e.target.as_str()]))
        .collect();

    let force = ForceLayout::new(options);
    let start = force.initial_positions(&graph.nodes, rng);
    let ranking = levels::assign_ranks(&start, &edges);
    let back_edges: Vec<EdgeRef> = ranking
        .back_edges
        .iter()
        .map(|&i| EdgeRef {
            source: graph.edges[i].source.clone(),
            target: graph.edges[i].target.clone(),
        })
        .collect();
    for e in &back_edges {
        tracing::warn!(source = %e.source, target = %e.target, "cycle broken at edge");
    }

    let placement = force.run_from(&graph.nodes, &edges, &ranking.ranks, &start, rng);
    let rects: Vec<Rect> = graph
        .nodes
        .iter()
        .zip(&placement.positions)
        .map(|(n, &p)| Rect::from_center(p, n.width, n.height))
        .collect();
    let kinds: Vec<NodeKind> = graph
        .nodes
        .iter()
        .map(|n| NodeKind::classify(&n.metadata, &options.step_type_field))
        .collect();

    let conditions: Vec<Option<&str>> =
        graph.edges.iter().map(|e| e.condition.as_deref()).collect();
    let anchors = HandleAssigner::new(options.direction).assign(&rects, &kinds, &edges, &conditions);

    let requests: Vec<RouteRequest> = edges
        .iter()
        .zip(&anchors)
        .map(|(&(source, target), a)| RouteRequest {
            source,
            target,
            from: a.source.point,
            to: a.target.point,
        })
        .collect();
    let router = EdgeRouter::new(options);
    let mut paths = router.route(&rects, &requests);
    let offsets = router.bundle(&placement.positions, &requests, &mut paths);

    let nodes: Vec<LayoutNode> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| LayoutNode {
            id: n.id.clone(),
            position: placement.positions[i],
            rank: ranking.ranks[i],
            rank_source: ranking.sources[i],
            bounding_box: rects[i],
            kind: kinds[i],
        })
        .collect();
    let fallback_nodes: Vec<String> = nodes
        .iter()
        .filter(|n| n.rank_source == RankSource::Fallback)
        .map(|n| n.id.clone())
        .collect();

    let routed: Vec<RoutedEdge> = graph
        .edges
        .iter()
        .zip(anchors)
        .zip(paths)
        .zip(offsets)
        .map(|(((e, a), path), bundle_offset)| RoutedEdge {
            source: e.source.clone(),
            target: e.target.clone(),
            condition: e.condition.clone(),
            path,
            source_anchor: a.source.side,
            target_anchor: a.target.side,
            source_handle: a.source.handle,
            target_handle: a.target.handle,
            bundle_offset,
        })
        .collect();

    tracing::debug!(
        nodes = nodes.len(),
        edges = routed.len(),
        ranks = ranking.rank_count(),
        back_edges = back_edges.len(),
        fallback = fallback_nodes.len(),
        "layout complete"
    );

    Ok(LayoutResult {
        direction: options.direction,
        nodes,
        edges: routed,
        report: LayoutReport {
            iterations: placement.iterations,
            back_edges,
            fallback_nodes,
        },
    })
}
