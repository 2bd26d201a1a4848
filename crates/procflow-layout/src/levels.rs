//! Rank assignment: longest path from the roots after breaking cycles.
//!
//! Works on node indices. Edges are `(source, target)` pairs into the node list; `positions`
//! holds each node's initial center and decides where unrooted nodes borrow their rank from.

use crate::graph::{Point, RankSource};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub ranks: Vec<usize>,
    pub sources: Vec<RankSource>,
    /// Indices (into the edge list) of edges that closed a cycle and were not ranked.
    pub back_edges: Vec<usize>,
}

impl Ranking {
    pub fn rank_count(&self) -> usize {
        self.ranks.iter().max().map_or(0, |r| r + 1)
    }
}

pub fn assign_ranks(positions: &[Point], edges: &[(usize, usize)]) -> Ranking {
    let node_count = positions.len();
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut has_incoming = vec![false; node_count];
    for (i, &(u, v)) in edges.iter().enumerate() {
        out_edges[u].push(i);
        if u != v {
            has_incoming[v] = true;
        }
    }
    let roots: Vec<usize> = (0..node_count).filter(|&v| !has_incoming[v]).collect();

    let is_back = find_back_edges(node_count, edges, &out_edges, &roots);
    let back_edges: Vec<usize> = (0..edges.len()).filter(|&i| is_back[i]).collect();

    // Reachability over forward edges, then Kahn restricted to the reachable part.
    let mut reachable = vec![false; node_count];
    let mut queue: VecDeque<usize> = roots.iter().copied().collect();
    for &r in &roots {
        reachable[r] = true;
    }
    while let Some(u) = queue.pop_front() {
        for &ei in &out_edges[u] {
            let v = edges[ei].1;
            if !is_back[ei] && !reachable[v] {
                reachable[v] = true;
                queue.push_back(v);
            }
        }
    }

    let mut pending = vec![0usize; node_count];
    for (i, &(u, v)) in edges.iter().enumerate() {
        if !is_back[i] && reachable[u] {
            pending[v] += 1;
        }
    }

    let mut ranks = vec![0usize; node_count];
    let mut queue: VecDeque<usize> = roots.iter().copied().collect();
    while let Some(u) = queue.pop_front() {
        for &ei in &out_edges[u] {
            if is_back[ei] {
                continue;
            }
            let v = edges[ei].1;
            ranks[v] = ranks[v].max(ranks[u] + 1);
            pending[v] -= 1;
            if pending[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    let ranked: Vec<usize> = (0..node_count).filter(|&v| reachable[v]).collect();
    let mut sources = vec![RankSource::Reachable; node_count];
    for v in 0..node_count {
        if reachable[v] {
            continue;
        }
        sources[v] = RankSource::Fallback;
        ranks[v] = nearest_ranked(positions, v, &ranked).map_or(0, |n| ranks[n] + 1);
    }

    Ranking {
        ranks,
        sources,
        back_edges,
    }
}

/// Ranked node whose initial center is closest to `v`'s; ties go to the earlier node.
fn nearest_ranked(positions: &[Point], v: usize, ranked: &[usize]) -> Option<usize> {
    let mut best: Option<(f64, usize)> = None;
    for &u in ranked {
        let d = positions[v].distance(positions[u]);
        if best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, u));
        }
    }
    best.map(|(_, u)| u)
}

/// Iterative DFS from the roots, then from every unvisited node in order. An edge into a node
/// still on the DFS stack closes a cycle. Self-loops always count as back edges.
fn find_back_edges(
    node_count: usize,
    edges: &[(usize, usize)],
    out_edges: &[Vec<usize>],
    roots: &[usize],
) -> Vec<bool> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut is_back = vec![false; edges.len()];
    let mut mark = vec![Mark::New; node_count];
    let starts = roots.iter().copied().chain(0..node_count);
    for start in starts {
        if mark[start] != Mark::New {
            continue;
        }
        mark[start] = Mark::Active;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        while let Some(top) = stack.last_mut() {
            let (u, next) = *top;
            let Some(&ei) = out_edges[u].get(next) else {
                mark[u] = Mark::Done;
                stack.pop();
                continue;
            };
            top.1 += 1;
            let v = edges[ei].1;
            match mark[v] {
                Mark::Active => is_back[ei] = true,
                Mark::New => {
                    mark[v] = Mark::Active;
                    stack.push((v, 0));
                }
                Mark::Done => {}
            }
        }
    }
    is_back
}
