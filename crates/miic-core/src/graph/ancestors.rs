//! Ancestor sets over the directed part of an adjacency structure.
//!
//! # Edge Direction
//!
//! Only parent relations (`p → c`, code `2` at `(p, c)`) are followed.
//! Undirected and bidirected edges never make one variable an ancestor of
//! another.
//!
//! # Algorithm
//!
//! For each node, a breadth-first walk backwards along parent edges: the
//! visited set is seeded with the node itself, each popped frontier node
//! contributes its direct parents, and unseen parents join both the result
//! and the frontier. The index is always rebuilt from scratch; graphs here
//! have tens to hundreds of nodes.

use std::collections::{HashMap, VecDeque};

use fixedbitset::FixedBitSet;
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::adjacency::AdjacencyMatrix;

/// Ancestor sets for every variable of one adjacency structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorIndex {
    ancestors: Vec<FixedBitSet>,
}

impl AncestorIndex {
    /// Build the index for the current directed edges of `adj`.
    #[must_use]
    pub fn compute(adj: &AdjacencyMatrix) -> Self {
        Self::from_graph(&adj.parent_graph())
    }

    /// Build the index as if the edge between `x` and `y` were absent.
    ///
    /// Used when judging whether a directed edge may be reversed: the edge
    /// itself must not count as evidence that one endpoint is an ancestor of
    /// the other.
    #[must_use]
    pub fn compute_without_edge(adj: &AdjacencyMatrix, x: usize, y: usize) -> Self {
        let mut graph = adj.parent_graph();
        for (from, to) in [(x, y), (y, x)] {
            if let Some(edge) = graph.find_edge(NodeIndex::new(from), NodeIndex::new(to)) {
                graph.remove_edge(edge);
            }
        }
        Self::from_graph(&graph)
    }

    fn from_graph(graph: &DiGraph<usize, ()>) -> Self {
        let n = graph.node_count();
        let mut ancestors = Vec::with_capacity(n);

        for target in 0..n {
            let mut found = FixedBitSet::with_capacity(n);
            let mut visited = FixedBitSet::with_capacity(n);
            visited.insert(target);
            let mut frontier: VecDeque<usize> = VecDeque::from([target]);

            while let Some(current) = frontier.pop_front() {
                for parent in graph.neighbors_directed(NodeIndex::new(current), Direction::Incoming) {
                    let p = parent.index();
                    if !visited.put(p) {
                        found.insert(p);
                        frontier.push_back(p);
                    }
                }
            }

            ancestors.push(found);
        }

        Self { ancestors }
    }

    /// Whether `candidate` is a (strict) ancestor of `node`.
    #[must_use]
    pub fn is_ancestor(&self, candidate: usize, node: usize) -> bool {
        self.ancestors[node].contains(candidate)
    }

    /// Ancestors of `node` in index order.
    #[must_use]
    pub fn ancestors_of(&self, node: usize) -> Vec<usize> {
        self.ancestors[node].ones().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ancestors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }
}

/// Find one directed cycle among the parent relations of `adj`.
///
/// Returns the labels along the cycle with the first label repeated at the
/// end (`A -> B -> C -> A`), or `None` when the directed part is acyclic.
/// The cycle reported is the one through the smallest-index node of the
/// first cyclic strongly connected component, so the answer is stable.
#[must_use]
pub fn find_directed_cycle(adj: &AdjacencyMatrix) -> Option<Vec<String>> {
    let graph = adj.parent_graph();

    let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .collect();
    for component in &mut components {
        component.sort_unstable();
    }
    components.sort_unstable();

    let component = components.first()?;
    let start = component[0];

    // BFS inside the component from `start` until an edge closes back on it.
    let mut queue: VecDeque<NodeIndex> = VecDeque::from([start]);
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut visited = FixedBitSet::with_capacity(graph.node_count());
    visited.insert(start.index());

    while let Some(current) = queue.pop_front() {
        let mut outgoing: Vec<NodeIndex> = graph
            .edges_directed(current, Direction::Outgoing)
            .map(|edge| edge.target())
            .filter(|next| component.binary_search(next).is_ok())
            .collect();
        outgoing.sort_unstable();

        for next in outgoing {
            if next == start {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&prev) = parent.get(&cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                let mut labels: Vec<String> =
                    path.iter().map(|idx| adj.label(idx.index()).to_string()).collect();
                labels.push(adj.label(start.index()).to_string());
                return Some(labels);
            }
            if !visited.put(next.index()) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;

    fn matrix(names: &[&str], parent_edges: &[(usize, usize)]) -> AdjacencyMatrix {
        let mut adj =
            AdjacencyMatrix::new(names.iter().map(|s| (*s).to_string()).collect()).expect("labels");
        for &(p, c) in parent_edges {
            adj.set(p, c, EdgeKind::ParentOf);
        }
        adj
    }

    #[test]
    fn chain_ancestors() {
        // A -> B -> C -> D
        let adj = matrix(&["A", "B", "C", "D"], &[(0, 1), (1, 2), (2, 3)]);
        let index = AncestorIndex::compute(&adj);

        assert_eq!(index.ancestors_of(0), Vec::<usize>::new());
        assert_eq!(index.ancestors_of(1), vec![0]);
        assert_eq!(index.ancestors_of(3), vec![0, 1, 2]);
        assert!(index.is_ancestor(0, 3));
        assert!(!index.is_ancestor(3, 0));
    }

    #[test]
    fn undirected_and_bidirected_edges_are_ignored() {
        let mut adj = matrix(&["A", "B", "C"], &[]);
        adj.set(0, 1, EdgeKind::Undirected);
        adj.set(1, 2, EdgeKind::Bidirected);
        let index = AncestorIndex::compute(&adj);
        for node in 0..3 {
            assert!(index.ancestors_of(node).is_empty());
        }
    }

    #[test]
    fn diamond_ancestors_are_deduplicated() {
        // A -> B, A -> C, B -> D, C -> D
        let adj = matrix(&["A", "B", "C", "D"], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let index = AncestorIndex::compute(&adj);
        assert_eq!(index.ancestors_of(3), vec![0, 1, 2]);
    }

    #[test]
    fn removing_an_edge_drops_only_paths_through_it() {
        // A -> B directly and A -> C -> B.
        let adj = matrix(&["A", "B", "C"], &[(0, 1), (0, 2), (2, 1)]);
        let without_direct = AncestorIndex::compute_without_edge(&adj, 0, 1);
        assert!(without_direct.is_ancestor(0, 1), "A still reaches B via C");

        let chain = matrix(&["A", "B"], &[(0, 1)]);
        let without = AncestorIndex::compute_without_edge(&chain, 1, 0);
        assert!(!without.is_ancestor(0, 1));
    }

    #[test]
    fn cycle_is_reported_as_path() {
        let mut adj = matrix(&["A", "B", "C", "D"], &[(0, 1), (1, 2), (2, 3)]);
        assert!(find_directed_cycle(&adj).is_none());

        // D -> B closes B -> C -> D -> B.
        adj.set(3, 1, EdgeKind::ParentOf);
        let cycle = find_directed_cycle(&adj).expect("cycle present");
        assert_eq!(cycle, vec!["B", "C", "D", "B"]);
    }
}
