//! Ranked force-directed placement.

use crate::graph::{Direction, Node, Point};
use crate::options::LayoutOptions;
use crate::rng::RandomSource;
use nalgebra::Vector2;

/// Grid cell size relative to the largest node dimension.
const GRID_SPACING_FACTOR: f64 = 1.5;
/// Final-step movement above which the run is logged as unsettled.
const SETTLED_DISPLACEMENT: f64 = 1.0;

#[derive(Debug, Clone)]
struct SimNode {
    width: f64,
    height: f64,
    rank: usize,
    pos: Vector2<f64>,
}

impl SimNode {
    /// Extent along the cross axis, used for same-rank spreading.
    fn cross_size(&self, direction: Direction) -> f64 {
        match direction {
            Direction::TopToBottom => self.width,
            Direction::LeftToRight => self.height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Placement {
    pub positions: Vec<Point>,
    pub iterations: usize,
}

pub struct ForceLayout<'a> {
    options: &'a LayoutOptions,
    /// Index of the rank axis in a position vector.
    axis: usize,
    cross: usize,
}

impl<'a> ForceLayout<'a> {
    pub fn new(options: &'a LayoutOptions) -> Self {
        let (axis, cross) = match options.direction {
            Direction::TopToBottom => (1, 0),
            Direction::LeftToRight => (0, 1),
        };
        Self {
            options,
            axis,
            cross,
        }
    }

    /// Seeds with [`Self::initial_positions`] and simulates.
    pub fn run<R: RandomSource + ?Sized>(
        &self,
        nodes: &[Node],
        edges: &[(usize, usize)],
        ranks: &[usize],
        rng: &mut R,
    ) -> Placement {
        let start = self.initial_positions(nodes, rng);
        self.run_from(nodes, edges, ranks, &start, rng)
    }

    /// Simulates from `start`, one center per node.
    pub fn run_from<R: RandomSource + ?Sized>(
        &self,
        nodes: &[Node],
        edges: &[(usize, usize)],
        ranks: &[usize],
        start: &[Point],
        rng: &mut R,
    ) -> Placement {
        let mut sim: Vec<SimNode> = nodes
            .iter()
            .zip(ranks)
            .zip(start)
            .map(|((n, &rank), p)| SimNode {
                width: n.width,
                height: n.height,
                rank,
                pos: Vector2::new(p.x, p.y),
            })
            .collect();
        let iterations = self.options.iterations;
        let mut forces = vec![Vector2::zeros(); sim.len()];
        let mut last_movement = 0.0_f64;

        for it in 0..iterations {
            forces.iter_mut().for_each(|f| *f = Vector2::zeros());
            self.accumulate_pair_forces(&sim, &mut forces, rng);
            self.accumulate_springs(&sim, edges, &mut forces);
            self.accumulate_rank_alignment(&sim, &mut forces);
            last_movement = self.integrate(&mut sim, &forces, self.damping(it));
        }

        if iterations > 0 && last_movement > SETTLED_DISPLACEMENT {
            tracing::debug!(
                iterations,
                last_movement,
                "iteration budget exhausted before the layout settled"
            );
        }

        Placement {
            positions: sim.iter().map(|n| Point::new(n.pos.x, n.pos.y)).collect(),
            iterations,
        }
    }

    /// Prior positions when given, otherwise a square grid; both jittered.
    pub fn initial_positions<R: RandomSource + ?Sized>(
        &self,
        nodes: &[Node],
        rng: &mut R,
    ) -> Vec<Point> {
        let cols = (nodes.len() as f64).sqrt().ceil().max(1.0) as usize;
        let largest = nodes
            .iter()
            .map(|n| n.width.max(n.height))
            .fold(0.0, f64::max);
        let spacing = largest * GRID_SPACING_FACTOR;
        let jitter = self.options.jitter;

        nodes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let base = match n.prior {
                    Some(p) => Vector2::new(p.x, p.y),
                    None => Vector2::new((i % cols) as f64 * spacing, (i / cols) as f64 * spacing),
                };
                let pos = base + Vector2::new(rng.next_f64_signed(), rng.next_f64_signed()) * jitter;
                Point::new(pos.x, pos.y)
            })
            .collect()
    }

    fn damping(&self, iteration: usize) -> f64 {
        let o = self.options;
        let span = o.iterations.saturating_sub(1).max(1) as f64;
        let t = (iteration as f64 / span).min(1.0);
        o.initial_damping + (o.final_damping - o.initial_damping) * t
    }

    /// Repulsion for every unordered pair, plus same-rank spreading on the cross axis.
    fn accumulate_pair_forces<R: RandomSource + ?Sized>(
        &self,
        sim: &[SimNode],
        forces: &mut [Vector2<f64>],
        rng: &mut R,
    ) {
        let o = self.options;
        let direction = o.direction;
        for i in 0..sim.len() {
            for j in (i + 1)..sim.len() {
                let mut delta = sim[i].pos - sim[j].pos;
                let mut d = delta.norm();
                if d < f64::EPSILON {
                    // Coincident nodes: separate along a seeded direction.
                    delta = Vector2::new(rng.next_f64_signed(), rng.next_f64_signed());
                    if delta.norm() < f64::EPSILON {
                        delta = Vector2::new(1.0, 0.0);
                    }
                    d = 0.0;
                }
                let dir = delta.normalize();
                let magnitude = if d < o.min_node_distance {
                    2.0 * o.close_repulsion * o.min_node_distance / d.max(1.0)
                } else {
                    o.repulsion_strength / (d * d)
                };
                forces[i] += dir * magnitude;
                forces[j] -= dir * magnitude;

                if sim[i].rank != sim[j].rank {
                    continue;
                }
                let gap = sim[i].pos[self.cross] - sim[j].pos[self.cross];
                let limit = (sim[i].cross_size(direction) + sim[j].cross_size(direction)) / 2.0;
                if gap.abs() >= limit {
                    continue;
                }
                let push = (limit - gap.abs()) * o.same_rank_push;
                // Ties push the earlier node toward the lower coordinate.
                let sign = if gap > 0.0 { 1.0 } else { -1.0 };
                forces[i][self.cross] += sign * push;
                forces[j][self.cross] -= sign * push;
            }
        }
    }

    fn accumulate_springs(
        &self,
        sim: &[SimNode],
        edges: &[(usize, usize)],
        forces: &mut [Vector2<f64>],
    ) {
        let o = self.options;
        for &(u, v) in edges {
            if u == v {
                continue;
            }
            let delta = sim[v].pos - sim[u].pos;
            let d = delta.norm();
            if d < f64::EPSILON {
                continue;
            }
            let f = delta / d * ((d - o.ideal_edge_length) * o.attraction);
            forces[u] += f;
            forces[v] -= f;
        }
    }

    fn accumulate_rank_alignment(&self, sim: &[SimNode], forces: &mut [Vector2<f64>]) {
        let o = self.options;
        for (n, f) in sim.iter().zip(forces.iter_mut()) {
            let target = n.rank as f64 * o.ideal_edge_length;
            let diff = target - n.pos[self.axis];
            let strength = if diff.abs() > o.ideal_edge_length / 2.0 {
                o.rank_alignment_far
            } else {
                o.rank_alignment
            };
            f[self.axis] += diff * strength;
        }
    }

    /// Applies damped forces with a per-axis cap; returns the largest step taken.
    fn integrate(&self, sim: &mut [SimNode], forces: &[Vector2<f64>], damping: f64) -> f64 {
        let max_d = self.options.max_displacement;
        let mut largest = 0.0_f64;
        for (n, f) in sim.iter_mut().zip(forces) {
            let mut step = f * damping;
            for k in 0..2 {
                if step[k].abs() > max_d {
                    step[k] = max_d * step[k].signum();
                }
            }
            n.pos += step;
            largest = largest.max(step.norm());
        }
        largest
    }
}
