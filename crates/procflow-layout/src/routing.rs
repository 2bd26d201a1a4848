//! Obstacle-avoiding edge routing and parallel-edge bundling.

use crate::graph::{Point, Rect};
use crate::options::LayoutOptions;
use indexmap::IndexMap;
use nalgebra::Vector2;

/// Points closer than this are merged.
const DUPLICATE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub source: usize,
    pub target: usize,
    pub from: Point,
    pub to: Point,
}

pub struct EdgeRouter<'a> {
    options: &'a LayoutOptions,
}

impl<'a> EdgeRouter<'a> {
    pub fn new(options: &'a LayoutOptions) -> Self {
        Self { options }
    }

    pub fn route(&self, rects: &[Rect], requests: &[RouteRequest]) -> Vec<Vec<Point>> {
        requests.iter().map(|r| self.route_one(rects, r)).collect()
    }

    /// Straight when nothing is in the way; otherwise walks around each obstacle's padded box,
    /// nearest obstacle first, through as many corners as it takes to see the target again.
    pub fn route_one(&self, rects: &[Rect], req: &RouteRequest) -> Vec<Point> {
        let (a, b) = (req.from, req.to);
        if !self.options.avoid_obstacles {
            return vec![a, b];
        }

        let mut hits: Vec<(f64, Rect)> = rects
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != req.source && k != req.target)
            .map(|(_, r)| r.expand(self.options.routing_padding))
            .filter(|r| r.intersects_segment(a, b))
            .map(|r| (a.distance(r.center()), r))
            .collect();
        if hits.is_empty() {
            return vec![a, b];
        }
        hits.sort_by(|x, y| x.0.total_cmp(&y.0));

        let horizontal = (b.x - a.x).abs() >= (b.y - a.y).abs();
        let mut path = vec![a];
        for (_, r) in hits {
            let prev = path.last().copied().unwrap_or(a);
            if !r.intersects_segment(prev, b) {
                continue;
            }
            let c = r.center();
            // Pass above/below (or left/right) on the side the path is currently on.
            let clockwise = if horizontal {
                (prev.y <= c.y) == (b.x >= a.x)
            } else {
                (prev.x <= c.x) != (b.y >= a.y)
            };
            path.extend(detour(&r, prev, b, clockwise));
        }
        path.push(b);

        tracing::trace!(
            source = req.source,
            target = req.target,
            points = path.len(),
            "edge detoured"
        );
        simplify(&path, self.options.collinear_threshold)
    }

    /// Offsets edges that share an unordered endpoint pair by
    /// `(index - (count - 1) / 2) * bundle_spacing`, perpendicular to the direction from the
    /// lower-indexed endpoint to the higher one. Returns the offset of every edge.
    pub fn bundle(
        &self,
        centers: &[Point],
        requests: &[RouteRequest],
        paths: &mut [Vec<Point>],
    ) -> Vec<f64> {
        let mut groups: IndexMap<(usize, usize), Vec<usize>> = IndexMap::new();
        for (i, r) in requests.iter().enumerate() {
            let key = (r.source.min(r.target), r.source.max(r.target));
            groups.entry(key).or_default().push(i);
        }

        let mut offsets = vec![0.0; requests.len()];
        for ((lo, hi), members) in groups {
            if members.len() < 2 {
                continue;
            }
            let d = Vector2::new(centers[hi].x - centers[lo].x, centers[hi].y - centers[lo].y);
            let perp = if d.norm() < f64::EPSILON {
                Vector2::new(1.0, 0.0)
            } else {
                Vector2::new(-d.y, d.x).normalize()
            };
            let mid = (members.len() - 1) as f64 / 2.0;
            for (slot, &ei) in members.iter().enumerate() {
                let offset = (slot as f64 - mid) * self.options.bundle_spacing;
                offsets[ei] = offset;
                if offset != 0.0 {
                    shift_interior(&mut paths[ei], perp * offset);
                }
            }
        }
        offsets
    }
}

/// Corners of `r` in clockwise order (y grows downward).
fn corners(r: &Rect) -> [Point; 4] {
    [
        Point::new(r.min_x(), r.min_y()),
        Point::new(r.max_x(), r.min_y()),
        Point::new(r.max_x(), r.max_y()),
        Point::new(r.min_x(), r.max_y()),
    ]
}

/// Corners leading from `from` around `r` to a corner that sees `to`. Consecutive corners
/// share a box side, so only the first and last legs need checking.
fn detour(r: &Rect, from: Point, to: Point, clockwise: bool) -> Vec<Point> {
    let cs = corners(r);
    let step = |i: usize| if clockwise { (i + 1) % 4 } else { (i + 3) % 4 };
    let visible = |p: Point, q: Point| !r.intersects_segment(p, q);

    // Last corner visible from `from` before the walk turns out of sight.
    let first = (0..4)
        .find(|&i| visible(from, cs[i]) && !visible(from, cs[step(i)]))
        .or_else(|| (0..4).find(|&i| visible(from, cs[i])))
        .unwrap_or_else(|| {
            (0..4)
                .min_by(|&i, &j| from.distance(cs[i]).total_cmp(&from.distance(cs[j])))
                .unwrap_or(0)
        });

    let mut out = Vec::with_capacity(4);
    let mut i = first;
    for _ in 0..4 {
        out.push(cs[i]);
        if visible(cs[i], to) {
            break;
        }
        i = step(i);
    }
    out
}

fn shift_interior(path: &mut Vec<Point>, shift: Vector2<f64>) {
    if path.len() == 2 {
        let (a, b) = (path[0], path[1]);
        let mid = Point::new((a.x + b.x) / 2.0 + shift.x, (a.y + b.y) / 2.0 + shift.y);
        path.insert(1, mid);
        return;
    }
    let last = path.len() - 1;
    for p in &mut path[1..last] {
        p.x += shift.x;
        p.y += shift.y;
    }
}

/// Drops repeated points and interior points where the path turns by less than `threshold`
/// radians. The endpoints are always kept.
pub fn simplify(points: &[Point], threshold: f64) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_some_and(|q| q.distance(p) < DUPLICATE_EPS) {
            continue;
        }
        out.push(p);
    }

    let mut i = 1;
    while out.len() > 2 && i + 1 < out.len() {
        if turn_angle(out[i - 1], out[i], out[i + 1]) < threshold {
            out.remove(i);
            i = i.saturating_sub(1).max(1);
        } else {
            i += 1;
        }
    }

    match (points.first(), out.len()) {
        (Some(&first), 1) => vec![first, points.last().copied().unwrap_or(first)],
        _ => out,
    }
}

fn turn_angle(p0: Point, p1: Point, p2: Point) -> f64 {
    let (ax, ay) = (p1.x - p0.x, p1.y - p0.y);
    let (bx, by) = (p2.x - p1.x, p2.y - p1.y);
    (ax * by - ay * bx).atan2(ax * bx + ay * by).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_at(x: f64, y: f64) -> Rect {
        Rect::from_center(Point::new(x, y), 180.0, 60.0)
    }

    fn segments_hit(path: &[Point], r: &Rect) -> bool {
        path.windows(2).any(|w| r.intersects_segment(w[0], w[1]))
    }

    #[test]
    fn clear_line_stays_straight() {
        let options = LayoutOptions::default();
        let rects = [rect_at(0.0, 0.0), rect_at(0.0, 400.0), rect_at(400.0, 200.0)];
        let req = RouteRequest {
            source: 0,
            target: 1,
            from: Point::new(0.0, 30.0),
            to: Point::new(0.0, 370.0),
        };
        let path = EdgeRouter::new(&options).route_one(&rects, &req);
        assert_eq!(path, vec![req.from, req.to]);
    }

    #[test]
    fn blocking_node_is_detoured_around() {
        let options = LayoutOptions::default();
        let rects = [rect_at(0.0, 0.0), rect_at(0.0, 400.0), rect_at(0.0, 200.0)];
        let req = RouteRequest {
            source: 0,
            target: 1,
            from: Point::new(0.0, 30.0),
            to: Point::new(0.0, 370.0),
        };
        let path = EdgeRouter::new(&options).route_one(&rects, &req);
        assert!(path.len() >= 3, "{path:?}");
        assert_eq!(path.first(), Some(&req.from));
        assert_eq!(path.last(), Some(&req.to));
        assert!(!segments_hit(&path, &rects[2]), "{path:?}");
        assert!(!segments_hit(&path, &rects[2].expand(options.routing_padding)));
    }

    #[test]
    fn horizontal_runs_detour_vertically() {
        let options = LayoutOptions::default();
        let rects = [rect_at(0.0, 0.0), rect_at(500.0, 0.0), rect_at(250.0, 0.0)];
        let req = RouteRequest {
            source: 0,
            target: 1,
            from: Point::new(90.0, 0.0),
            to: Point::new(410.0, 0.0),
        };
        let path = EdgeRouter::new(&options).route_one(&rects, &req);
        assert_eq!(
            path,
            vec![
                Point::new(90.0, 0.0),
                Point::new(140.0, -50.0),
                Point::new(360.0, -50.0),
                Point::new(410.0, 0.0),
            ]
        );
    }

    #[test]
    fn near_diagonal_edge_does_not_cut_back_through_the_obstacle() {
        let options = LayoutOptions::default();
        let rects = [
            rect_at(0.0, 0.0),
            rect_at(-138.24, 181.92),
            rect_at(-69.12, 90.96),
        ];
        let req = RouteRequest {
            source: 0,
            target: 1,
            from: Point::new(0.0, 30.0),
            to: Point::new(-138.24, 151.92),
        };
        let path = EdgeRouter::new(&options).route_one(&rects, &req);
        assert_eq!(path.first(), Some(&req.from));
        assert_eq!(path.last(), Some(&req.to));
        assert!(!segments_hit(&path, &rects[2]), "{path:?}");
    }

    #[test]
    fn random_single_obstacles_are_always_avoided() {
        use crate::rng::{RandomSource, XorShift64Star};

        let options = LayoutOptions::default();
        let router = EdgeRouter::new(&options);
        let mut rng = XorShift64Star::new(42);
        let mut checked = 0;
        for _ in 0..20_000 {
            let bx = rng.next_f64_signed() * 600.0;
            let by = rng.next_f64_signed() * 600.0;
            let rects = [
                rect_at(0.0, 0.0),
                rect_at(bx, by),
                rect_at(bx / 2.0, by / 2.0),
            ];
            let padded = rects[2].expand(options.routing_padding);
            if padded.overlaps(&rects[0]) || padded.overlaps(&rects[1]) {
                continue;
            }
            let req = RouteRequest {
                source: 0,
                target: 1,
                from: Point::new(0.0, 30.0),
                to: Point::new(bx, by - 30.0),
            };
            let path = router.route_one(&rects, &req);
            assert_eq!(path.first(), Some(&req.from));
            assert_eq!(path.last(), Some(&req.to));
            assert!(!segments_hit(&path, &rects[2]), "B=({bx},{by}): {path:?}");
            checked += 1;
        }
        assert!(checked > 1_000, "only {checked} cases");
    }

    #[test]
    fn avoidance_can_be_disabled() {
        let options = LayoutOptions {
            avoid_obstacles: false,
            ..LayoutOptions::default()
        };
        let rects = [rect_at(0.0, 0.0), rect_at(0.0, 400.0), rect_at(0.0, 200.0)];
        let req = RouteRequest {
            source: 0,
            target: 1,
            from: Point::new(0.0, 30.0),
            to: Point::new(0.0, 370.0),
        };
        assert_eq!(EdgeRouter::new(&options).route_one(&rects, &req).len(), 2);
    }

    #[test]
    fn simplify_removes_duplicates_and_collinear_points() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0001),
            Point::new(30.0, 0.0),
            Point::new(30.0, 10.0),
        ];
        let got = simplify(&pts, 0.02);
        assert_eq!(
            got,
            vec![Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(30.0, 10.0)]
        );
        let same = [Point::new(1.0, 1.0), Point::new(1.0, 1.0)];
        assert_eq!(simplify(&same, 0.02).len(), 2);
    }

    #[test]
    fn parallel_edges_are_offset_symmetrically() {
        let options = LayoutOptions::default();
        let centers = [Point::new(0.0, 0.0), Point::new(0.0, 300.0)];
        let down = RouteRequest {
            source: 0,
            target: 1,
            from: Point::new(0.0, 30.0),
            to: Point::new(0.0, 270.0),
        };
        let up = RouteRequest {
            source: 1,
            target: 0,
            from: Point::new(0.0, 270.0),
            to: Point::new(0.0, 30.0),
        };
        let requests = [down, up, down];
        let mut paths: Vec<Vec<Point>> = requests.iter().map(|r| vec![r.from, r.to]).collect();
        let offsets = EdgeRouter::new(&options).bundle(&centers, &requests, &mut paths);

        assert_eq!(offsets, vec![-16.0, 0.0, 16.0]);
        assert_eq!(paths[1].len(), 2);
        assert_eq!(paths[0].len(), 3);
        assert_eq!(paths[2].len(), 3);
        // Canonical direction is +y, so the perpendicular is -x.
        assert_eq!(paths[0][1], Point::new(16.0, 150.0));
        assert_eq!(paths[2][1], Point::new(-16.0, 150.0));
    }
}
