use super::{rows, scenario_rows};
use crate::*;
use serde_json::json;

#[test]
fn scenario_rows_build_one_domain_with_two_processes() {
    let build = build_hierarchy(&scenario_rows(), &LevelSchema::standard());
    assert!(build.diagnostics.is_empty(), "{:?}", build.diagnostics);

    let tree = &build.tree;
    let roots: Vec<NodeId> = tree.roots().collect();
    assert_eq!(roots.len(), 1);
    let d1 = tree.node(roots[0]);
    assert_eq!(d1.id, "D1");
    assert_eq!(d1.name, "Domain1");
    assert_eq!(d1.level, Level::L0);
    assert_eq!(d1.children.keys().collect::<Vec<_>>(), vec!["P1", "P2"]);

    let p2 = tree.find("P2").unwrap();
    let rel = p2.relationships.as_ref().unwrap();
    assert_eq!(rel.predecessors().collect::<Vec<_>>(), vec!["P1"]);
    assert_eq!(rel.conditions(), vec![Some("ok")]);
}

#[test]
fn duplicate_rows_merge_metadata_without_overwriting() {
    let schema = LevelSchema::standard().with_metadata_columns(Level::L4, ["A", "B"]);
    let build = build_hierarchy(
        &rows(json!([
            {"L0": "D1", "L4": "P1", "A": "x"},
            {"L0": "D1", "L4": "P1", "B": "y", "L4name": "Late name"},
            {"L0": "D1", "L4": "P1", "A": "changed"}
        ])),
        &schema,
    );

    assert_eq!(build.tree.len(), 2);
    let p1 = build.tree.find("P1").unwrap();
    assert_eq!(
        p1.metadata,
        [("A", "x"), ("B", "y")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<indexmap::IndexMap<_, _>>()
    );
    assert_eq!(p1.name, "Late name");
    assert_eq!(
        build.diagnostics.iter().cloned().collect::<Vec<_>>(),
        vec![Diagnostic::DuplicateIdentifierConflict {
            id: "P1".into(),
            field: "A".into(),
            kept: "x".into(),
            ignored: "changed".into(),
        }]
    );
}

#[test]
fn process_node_reached_from_two_parents_is_shared() {
    let build = build_hierarchy(
        &rows(json!([
            {"L0": "D1", "L4": "P1", "L5": "S1", "L5name": "Shared"},
            {"L0": "D1", "L4": "P2", "L5": "S1"}
        ])),
        &LevelSchema::standard(),
    );
    let tree = &build.tree;
    let s1 = tree.get("S1").unwrap();
    let p1 = tree.get("P1").unwrap();
    let p2 = tree.get("P2").unwrap();
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.children(p1).collect::<Vec<_>>(), vec![s1]);
    assert_eq!(tree.children(p2).collect::<Vec<_>>(), vec![s1]);
    assert_eq!(tree.parent(s1), Some(p1));
    assert_eq!(tree.descendants(tree.get("D1").unwrap()).len(), 4);
    assert!(build.diagnostics.is_empty());
}

#[test]
fn hierarchy_node_keeps_its_first_parent() {
    let build = build_hierarchy(
        &rows(json!([
            {"L0": "D1", "L1": "B1", "L2": "J1"},
            {"L0": "D2", "L1": "B1", "L2": "J2"}
        ])),
        &LevelSchema::standard(),
    );
    let tree = &build.tree;
    let b1 = tree.get("B1").unwrap();
    assert_eq!(tree.parent(b1), tree.get("D1"));
    assert!(tree.node(tree.get("D2").unwrap()).children.is_empty());
    // Descent continues through the existing node.
    assert_eq!(tree.parent(tree.get("J2").unwrap()), Some(b1));
    assert_eq!(build.diagnostics.count("parentConflict"), 1);
}

#[test]
fn id_reused_at_another_level_stops_the_row() {
    let build = build_hierarchy(
        &rows(json!([
            {"L0": "D1", "L1": "X"},
            {"L0": "D1", "L4": "X", "L5": "S1"}
        ])),
        &LevelSchema::standard(),
    );
    assert_eq!(build.tree.find("X").unwrap().level, Level::L1);
    assert!(build.tree.get("S1").is_none());
    assert_eq!(build.diagnostics.count("levelConflict"), 1);
}

#[test]
fn rejected_and_gapped_rows_are_reported_not_fatal() {
    let build = build_hierarchy(
        &rows(json!([
            {"L0": "  ", "L4": "P0"},
            {"L0": "D1", "L1": "B1", "L3": "A1", "L4": "P1"}
        ])),
        &LevelSchema::standard(),
    );
    assert!(build.tree.get("P0").is_none());
    assert!(build.tree.get("A1").is_none());
    // The process chain hangs under the deepest hierarchy node reached.
    let p1 = build.tree.get("P1").unwrap();
    assert_eq!(build.tree.parent(p1), build.tree.get("B1"));
    assert_eq!(
        build.diagnostics.summary().into_iter().collect::<Vec<_>>(),
        vec![("rowRejected", 1), ("missingIdentifier", 1)]
    );
}

#[test]
fn malformed_predecessors_become_an_empty_list() {
    let build = build_hierarchy(
        &rows(json!([
            {"L0": "D1", "L4": "P1", "L4Predecessor": "[\"P0\""}
        ])),
        &LevelSchema::standard(),
    );
    let p1 = build.tree.find("P1").unwrap();
    assert!(p1.relationships.as_ref().unwrap().is_empty());
    assert_eq!(build.diagnostics.count("malformedPredecessors"), 1);
}

#[test]
fn tree_json_is_nested_by_id() {
    let build = build_hierarchy(&scenario_rows(), &LevelSchema::standard());
    let v = serde_json::to_value(&build.tree).unwrap();
    assert_eq!(
        v,
        json!({
            "D1": {
                "id": "D1",
                "name": "Domain1",
                "level": "L0",
                "metadata": {},
                "relationships": null,
                "children": {
                    "P1": {
                        "id": "P1",
                        "name": "Step1",
                        "level": "L4",
                        "metadata": {},
                        "relationships": {"predecessors": [], "conditions": []},
                        "children": {}
                    },
                    "P2": {
                        "id": "P2",
                        "name": "Step2",
                        "level": "L4",
                        "metadata": {},
                        "relationships": {"predecessors": ["P1"], "conditions": ["ok"]},
                        "children": {}
                    }
                }
            }
        })
    );
}
