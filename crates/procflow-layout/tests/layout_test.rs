use procflow_layout::{
    Direction, Edge, Error, Graph, LayoutOptions, Node, NodeKind, Point, RankSource, Side, layout,
};

fn node(id: &str) -> Node {
    Node::new(id, 180.0, 60.0)
}

fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
    Graph {
        nodes: ids.iter().map(|id| node(id)).collect(),
        edges: edges.iter().map(|(s, t)| Edge::new(*s, *t)).collect(),
    }
}

#[test]
fn identical_inputs_give_identical_layouts() {
    let g = graph(
        &["a", "b", "c", "d", "e"],
        &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")],
    );
    let options = LayoutOptions::default().with_seed(99);
    assert_eq!(layout(&g, &options).unwrap(), layout(&g, &options).unwrap());
}

#[test]
fn ranks_increase_along_every_forward_edge() {
    let g = graph(
        &["a", "b", "c", "d", "e", "f", "x", "y"],
        &[
            ("a", "b"),
            ("b", "c"),
            ("a", "c"),
            ("c", "d"),
            ("d", "b"),
            ("e", "f"),
            ("x", "y"),
            ("y", "x"),
        ],
    );
    let res = layout(&g, &LayoutOptions::default()).unwrap();
    let back: Vec<(&str, &str)> = res
        .report
        .back_edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(back, vec![("d", "b"), ("y", "x")]);
    assert_eq!(res.report.fallback_nodes, vec!["x", "y"]);

    for e in &g.edges {
        let u = res.node(&e.source).unwrap();
        let v = res.node(&e.target).unwrap();
        let is_back = back.contains(&(e.source.as_str(), e.target.as_str()));
        if is_back || v.rank_source == RankSource::Fallback {
            continue;
        }
        assert!(v.rank > u.rank, "{} -> {}", e.source, e.target);
    }
    assert_eq!(res.node("c").unwrap().rank, 2);
    assert_eq!(res.node("d").unwrap().rank, 3);
}

#[test]
fn unrooted_nodes_take_their_rank_from_the_closest_start_position() {
    let at = |id: &str, x: f64, y: f64| node(id).with_prior(Point::new(x, y));
    let g = Graph {
        nodes: vec![
            at("a", 0.0, 0.0),
            at("b", 1000.0, 1000.0),
            at("c", 3000.0, 3000.0),
            at("d", 5000.0, 5000.0),
            at("e", 50.0, 0.0),
            at("f", 100.0, 0.0),
        ],
        edges: [("a", "b"), ("b", "c"), ("c", "d"), ("e", "f"), ("f", "e")]
            .iter()
            .map(|(s, t)| Edge::new(*s, *t))
            .collect(),
    };
    let res = layout(&g, &LayoutOptions::default().with_iterations(0)).unwrap();
    let e = res.node("e").unwrap();
    assert_eq!(e.rank_source, RankSource::Fallback);
    assert_eq!(e.rank, 1);
    assert_eq!(res.node("f").unwrap().rank, 1);
    assert_eq!(res.node("d").unwrap().rank, 3);
}

#[test]
fn every_path_starts_and_ends_at_its_anchors() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c"), ("b", "c")]);
    for direction in [Direction::TopToBottom, Direction::LeftToRight] {
        let res = layout(&g, &LayoutOptions::default().with_direction(direction)).unwrap();
        assert_eq!(res.direction, direction);
        for e in &res.edges {
            assert!(e.path.len() >= 2);
            let src = res.node(&e.source).unwrap().bounding_box;
            let dst = res.node(&e.target).unwrap().bounding_box;
            let first = e.path[0];
            let last = e.path[e.path.len() - 1];
            assert!(first.x >= src.min_x() - 1e-9 && first.x <= src.max_x() + 1e-9);
            assert!(first.y >= src.min_y() - 1e-9 && first.y <= src.max_y() + 1e-9);
            assert!(last.x >= dst.min_x() - 1e-9 && last.x <= dst.max_x() + 1e-9);
            assert!(last.y >= dst.min_y() - 1e-9 && last.y <= dst.max_y() + 1e-9);
        }
    }
}

#[test]
fn validation_nodes_expose_true_and_false_branches() {
    let mut g = graph(&["check", "ok", "ko", "in"], &[]);
    g.nodes[0] = node("check").with_metadata("L4StepType", "Validation");
    g.edges = vec![
        Edge::new("in", "check"),
        Edge::new("check", "ok").with_condition("Yes"),
        Edge::new("check", "ko").with_condition("No"),
    ];
    let res = layout(&g, &LayoutOptions::default()).unwrap();
    assert_eq!(res.node("check").unwrap().kind, NodeKind::Validation);
    assert_eq!(res.edges[0].target_anchor, Side::Top);
    assert_eq!(res.edges[1].source_handle, "true");
    assert_eq!(res.edges[1].source_anchor, Side::Right);
    assert_eq!(res.edges[2].source_handle, "false");
    assert_eq!(res.edges[2].source_anchor, Side::Left);
}

#[test]
fn parallel_edges_get_bundle_offsets() {
    let g = graph(&["a", "b"], &[("a", "b"), ("b", "a"), ("a", "b")]);
    let res = layout(&g, &LayoutOptions::default()).unwrap();
    let offsets: Vec<f64> = res.edges_between("a", "b").map(|e| e.bundle_offset).collect();
    assert_eq!(offsets, vec![-16.0, 0.0, 16.0]);
    assert!(res.edges[0].path.len() >= 3);
    assert_ne!(res.edges[0].path, res.edges[2].path);
}

#[test]
fn missing_endpoint_is_an_error() {
    let g = graph(&["a"], &[("a", "ghost")]);
    let err = layout(&g, &LayoutOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MissingEndpoint { .. }), "{err}");
}

#[test]
fn duplicate_ids_and_bad_options_are_rejected() {
    let g = graph(&["a", "a"], &[]);
    assert!(matches!(
        layout(&g, &LayoutOptions::default()),
        Err(Error::DuplicateNode { .. })
    ));
    let options = LayoutOptions {
        ideal_edge_length: 0.0,
        ..LayoutOptions::default()
    };
    assert!(matches!(
        layout(&graph(&["a"], &[]), &options),
        Err(Error::InvalidOptions { .. })
    ));
}

#[test]
fn empty_graph_lays_out_to_nothing() {
    let res = layout(&Graph::default(), &LayoutOptions::default()).unwrap();
    assert!(res.nodes.is_empty() && res.edges.is_empty());
}

#[test]
fn options_load_from_partial_yaml() {
    let options: LayoutOptions =
        serde_yaml::from_str("direction: LR\nrandomSeed: 5\navoidObstacles: false\n").unwrap();
    assert_eq!(options.direction, Direction::LeftToRight);
    assert_eq!(options.random_seed, 5);
    assert!(!options.avoid_obstacles);
    assert_eq!(options.iterations, LayoutOptions::default().iterations);
}

#[test]
fn result_serializes_with_camel_case_fields() {
    let g = graph(&["a", "b"], &[("a", "b")]);
    let res = layout(&g, &LayoutOptions::default()).unwrap();
    let v = serde_json::to_value(&res).unwrap();
    assert_eq!(v["direction"], "TB");
    assert_eq!(v["nodes"][0]["rankSource"], "reachable");
    assert_eq!(v["edges"][0]["sourceHandle"], "source-0");
    assert_eq!(v["report"]["iterations"], 110);
}
