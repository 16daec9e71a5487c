//! Single-source shortest paths over search weights.
//!
//! Weights are non-negative by construction (`-ln(1 - f)` for `0 < f < 1`,
//! infinity otherwise), so Dijkstra applies directly.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::trace;

use crate::graph::CurrencyGraph;

/// Frontier entry, ordered so the heap pops the cheapest node first.
#[derive(Debug, Clone, Copy)]
struct State {
    cost: f64,
    node: NodeIndex,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

/// Result of a shortest-path search, indexed by node.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    start: NodeIndex,
    costs: Vec<f64>,
    predecessors: Vec<Option<(NodeIndex, EdgeIndex)>>,
}

impl ShortestPaths {
    pub fn start(&self) -> NodeIndex {
        self.start
    }

    /// Minimum total weight from the start, infinity when unreachable.
    pub fn cost(&self, node: NodeIndex) -> f64 {
        self.costs.get(node.index()).copied().unwrap_or(f64::INFINITY)
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn is_reachable(&self, node: NodeIndex) -> bool {
        self.cost(node).is_finite()
    }

    /// Node the cheapest path to `node` arrives from.
    pub fn predecessor(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.predecessor_entry(node).map(|(prev, _)| prev)
    }

    /// Edge the cheapest path to `node` arrives through.
    pub fn predecessor_edge(&self, node: NodeIndex) -> Option<EdgeIndex> {
        self.predecessor_entry(node).map(|(_, edge)| edge)
    }

    fn predecessor_entry(&self, node: NodeIndex) -> Option<(NodeIndex, EdgeIndex)> {
        self.predecessors.get(node.index()).copied().flatten()
    }

    /// Walk predecessors back from `target` and return the path start-first.
    ///
    /// `None` when `target` is not the start and has no predecessor. A
    /// single-node path means no conversion is needed.
    pub fn reconstruct_path(&self, target: NodeIndex) -> Option<Vec<NodeIndex>> {
        if target != self.start && self.predecessor(target).is_none() {
            return None;
        }

        let mut path = vec![target];
        let mut current = target;
        while let Some(prev) = self.predecessor(current) {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        Some(path)
    }
}

/// Dijkstra from `start` over the current edge weights.
///
/// Edges with an infinite weight are never relaxed. Stale frontier entries
/// are skipped rather than reprocessed.
pub fn shortest_paths(graph: &CurrencyGraph, start: NodeIndex) -> ShortestPaths {
    let n = graph.node_count();
    let mut costs = vec![f64::INFINITY; n];
    let mut predecessors = vec![None; n];
    let mut heap = BinaryHeap::new();

    if start.index() < n {
        costs[start.index()] = 0.0;
        heap.push(State { cost: 0.0, node: start });
    }

    while let Some(State { cost, node }) = heap.pop() {
        if cost > costs[node.index()] {
            continue;
        }

        for (edge, next, conversion) in graph.outgoing(node) {
            let weight = conversion.search_weight();
            if !weight.is_finite() {
                continue;
            }

            let candidate = cost + weight;
            if candidate < costs[next.index()] {
                trace!(from = node.index(), to = next.index(), cost = candidate, "Relaxed edge");
                costs[next.index()] = candidate;
                predecessors[next.index()] = Some((node, edge));
                heap.push(State {
                    cost: candidate,
                    node: next,
                });
            }
        }
    }

    ShortestPaths {
        start,
        costs,
        predecessors,
    }
}
