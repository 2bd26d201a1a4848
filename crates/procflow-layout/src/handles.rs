//! Node classification and per-edge anchor (handle) assignment.

use crate::graph::{Direction, NodeKind, Point, Rect, Side};
use indexmap::IndexMap;

const TRUE_WORDS: &[&str] = &[
    "true", "yes", "y", "ok", "pass", "passed", "valid", "approved", "accept", "accepted",
    "success", "1",
];
const FALSE_WORDS: &[&str] = &[
    "false", "no", "n", "fail", "failed", "invalid", "rejected", "reject", "error", "0",
];

impl NodeKind {
    /// Reads the step type from the first metadata key that equals `step_type_field` or ends
    /// with it (case-insensitive).
    pub fn classify(metadata: &IndexMap<String, String>, step_type_field: &str) -> Self {
        let field = step_type_field.to_ascii_lowercase();
        for (key, value) in metadata {
            if !key.to_ascii_lowercase().ends_with(&field) {
                continue;
            }
            let value = value.to_ascii_lowercase();
            if value.contains("validation") {
                return NodeKind::Validation;
            }
            if value.contains("distribution") {
                return NodeKind::Distribution;
            }
        }
        NodeKind::Normal
    }
}

/// Branch a condition label selects on a validation node, if recognisable.
pub fn condition_branch(condition: &str) -> Option<bool> {
    let c = condition.trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&c.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&c.as_str()) {
        Some(false)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub side: Side,
    pub handle: String,
    pub point: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAnchors {
    pub source: Anchor,
    pub target: Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    In,
    Out,
}

pub struct HandleAssigner {
    direction: Direction,
}

impl HandleAssigner {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    /// One anchor pair per edge, in edge order.
    pub fn assign(
        &self,
        rects: &[Rect],
        kinds: &[NodeKind],
        edges: &[(usize, usize)],
        conditions: &[Option<&str>],
    ) -> Vec<EdgeAnchors> {
        let mut incoming = vec![0usize; rects.len()];
        let mut outgoing = vec![0usize; rects.len()];
        // Next fallback branch for unrecognised conditions, per node.
        let mut next_branch = vec![true; rects.len()];

        edges
            .iter()
            .enumerate()
            .map(|(i, &(u, v))| {
                let source = if kinds[u] == NodeKind::Validation {
                    let branch = conditions
                        .get(i)
                        .copied()
                        .flatten()
                        .and_then(condition_branch)
                        .unwrap_or_else(|| {
                            let b = next_branch[u];
                            next_branch[u] = !b;
                            b
                        });
                    self.branch_anchor(&rects[u], branch)
                } else {
                    let k = outgoing[u];
                    outgoing[u] += 1;
                    self.flow_anchor(&rects[u], Flow::Out, k)
                };

                let target = if kinds[v] == NodeKind::Validation {
                    self.flow_anchor(&rects[v], Flow::In, 0)
                } else {
                    let k = incoming[v];
                    incoming[v] += 1;
                    self.flow_anchor(&rects[v], Flow::In, k)
                };

                EdgeAnchors { source, target }
            })
            .collect()
    }

    /// Validation outputs: `false` on the first cross side, `true` on the second.
    fn branch_anchor(&self, rect: &Rect, branch: bool) -> Anchor {
        let [false_side, true_side] = self.direction.cross_sides();
        let side = if branch { true_side } else { false_side };
        Anchor {
            side,
            handle: branch.to_string(),
            point: side_midpoint(rect, side),
        }
    }

    /// The first anchor sits mid-way on the primary side; later ones alternate between the
    /// cross sides, moving further toward the entry (or exit) end each round.
    fn flow_anchor(&self, rect: &Rect, flow: Flow, k: usize) -> Anchor {
        let (primary, prefix) = match flow {
            Flow::In => (self.direction.entry_side(), "target"),
            Flow::Out => (self.direction.exit_side(), "source"),
        };
        let handle = format!("{prefix}-{k}");
        if k == 0 {
            return Anchor {
                side: primary,
                handle,
                point: side_midpoint(rect, primary),
            };
        }

        let slot = k - 1;
        let side = self.direction.cross_sides()[slot % 2];
        let round = (slot / 2) as f64;
        let fraction = (round + 1.0) / (round + 2.0);
        let sign = match flow {
            Flow::In => -1.0,
            Flow::Out => 1.0,
        };
        let c = rect.center();
        let mid = side_midpoint(rect, side);
        let point = match self.direction {
            Direction::TopToBottom => Point::new(mid.x, c.y + sign * rect.height / 2.0 * fraction),
            Direction::LeftToRight => Point::new(c.x + sign * rect.width / 2.0 * fraction, mid.y),
        };
        Anchor {
            side,
            handle,
            point,
        }
    }
}

pub fn side_midpoint(rect: &Rect, side: Side) -> Point {
    let c = rect.center();
    match side {
        Side::Top => Point::new(c.x, rect.min_y()),
        Side::Bottom => Point::new(c.x, rect.max_y()),
        Side::Left => Point::new(rect.min_x(), c.y),
        Side::Right => Point::new(rect.max_x(), c.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn boxes(n: usize) -> Vec<Rect> {
        (0..n)
            .map(|i| Rect::from_center(Point::new(i as f64 * 300.0, 0.0), 180.0, 60.0))
            .collect()
    }

    #[test]
    fn classification_reads_the_step_type_field() {
        assert_eq!(
            NodeKind::classify(&meta(&[("L4StepType", "Validation check")]), "StepType"),
            NodeKind::Validation
        );
        assert_eq!(
            NodeKind::classify(&meta(&[("steptype", "DISTRIBUTION")]), "StepType"),
            NodeKind::Distribution
        );
        assert_eq!(
            NodeKind::classify(&meta(&[("Description", "validation")]), "StepType"),
            NodeKind::Normal
        );
        assert_eq!(NodeKind::classify(&meta(&[]), "StepType"), NodeKind::Normal);
    }

    #[test]
    fn validation_node_has_one_target_and_two_branch_sources() {
        let rects = boxes(5);
        let kinds = [
            NodeKind::Validation,
            NodeKind::Normal,
            NodeKind::Normal,
            NodeKind::Normal,
            NodeKind::Normal,
        ];
        let edges = [(4, 0), (0, 1), (0, 2), (0, 3), (1, 0)];
        let conditions = [None, Some("No"), Some("maybe"), Some("later"), None];
        let got = HandleAssigner::new(Direction::TopToBottom).assign(
            &rects,
            &kinds,
            &edges,
            &conditions,
        );

        assert_eq!(got[0].target.handle, "target-0");
        assert_eq!(got[4].target.handle, "target-0");
        assert_eq!(got[0].target.side, Side::Top);

        assert_eq!((got[1].source.handle.as_str(), got[1].source.side), ("false", Side::Left));
        // Unrecognised conditions alternate, starting with `true`.
        assert_eq!((got[2].source.handle.as_str(), got[2].source.side), ("true", Side::Right));
        assert_eq!((got[3].source.handle.as_str(), got[3].source.side), ("false", Side::Left));
        assert_eq!(got[1].source.point, Point::new(-90.0, 0.0));
    }

    #[test]
    fn lr_validation_branches_use_top_and_bottom() {
        let rects = boxes(3);
        let kinds = [NodeKind::Validation, NodeKind::Normal, NodeKind::Normal];
        let got = HandleAssigner::new(Direction::LeftToRight).assign(
            &rects,
            &kinds,
            &[(0, 1), (0, 2)],
            &[Some("yes"), Some("false")],
        );
        assert_eq!(got[0].source.side, Side::Bottom);
        assert_eq!(got[1].source.side, Side::Top);
        assert_eq!(got[0].target.side, Side::Left);
    }

    #[test]
    fn normal_fan_out_alternates_cross_sides_at_growing_offsets() {
        let rects = boxes(5);
        let kinds = [NodeKind::Normal; 5];
        let edges = [(0, 1), (0, 2), (0, 3), (0, 4)];
        let got = HandleAssigner::new(Direction::TopToBottom).assign(
            &rects,
            &kinds,
            &edges,
            &[None; 4],
        );
        let sources: Vec<(&str, Side)> = got
            .iter()
            .map(|a| (a.source.handle.as_str(), a.source.side))
            .collect();
        assert_eq!(
            sources,
            vec![
                ("source-0", Side::Bottom),
                ("source-1", Side::Left),
                ("source-2", Side::Right),
                ("source-3", Side::Left),
            ]
        );
        assert_eq!(got[0].source.point, Point::new(0.0, 30.0));
        // Outgoing cross anchors sit in the exit (lower) half and move outward.
        assert_eq!(got[1].source.point, Point::new(-90.0, 15.0));
        assert_eq!(got[2].source.point, Point::new(90.0, 15.0));
        assert_eq!(got[3].source.point.x, -90.0);
        assert!((got[3].source.point.y - 20.0).abs() < 1e-9);
        assert!(got.iter().all(|a| a.target.handle == "target-0"));
    }

    #[test]
    fn fan_in_uses_the_entry_half() {
        let rects = boxes(3);
        let kinds = [NodeKind::Normal; 3];
        let got = HandleAssigner::new(Direction::TopToBottom).assign(
            &rects,
            &kinds,
            &[(1, 0), (2, 0)],
            &[None, None],
        );
        assert_eq!(got[0].target.side, Side::Top);
        assert_eq!(got[1].target.side, Side::Left);
        assert_eq!(got[1].target.handle, "target-1");
        assert!(got[1].target.point.y < 0.0);
    }

    #[test]
    fn condition_words() {
        assert_eq!(condition_branch(" Yes "), Some(true));
        assert_eq!(condition_branch("rejected"), Some(false));
        assert_eq!(condition_branch("escalate"), None);
    }
}
