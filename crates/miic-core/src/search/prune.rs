//! Step 1: edge pruning driven by per-node conditioning-set searches.
//!
//! # Pipeline
//!
//! ```text
//! AdjacencyMatrix
//!        ↓  sweep: every node T runs best_conditioning_set(T, N(T))
//! PruneVotes (T flags each neighbor outside its best set)
//!        ↓  merge: both sides flagged → remove, one side → undirected
//! AdjacencyMatrix            (repeat until a sweep changes nothing)
//!        ↓  orient_flagged: one-sided flag f→o, unless it closes a cycle
//!        ↓  resolve_undirected: remaining `—` edges oriented by ancestry
//! AdjacencyMatrix (Step-1 result)
//! ```
//!
//! Votes from one sweep are all computed against the same snapshot and only
//! then merged, so node order inside a sweep does not affect the result.
//!
//! A node whose search fails with a computation error casts no votes for
//! that sweep: it keeps all of its edges.

use fixedbitset::FixedBitSet;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::subset::best_conditioning_set;
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchStep};
use crate::graph::{AdjacencyMatrix, AncestorIndex, EdgeKind};
use crate::score::ScoreCache;

/// Summary of one Step-1 run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Full node sweeps performed.
    pub sweeps: usize,
    /// Edges removed because both endpoints flagged each other.
    pub removed_edges: usize,
    /// Edges oriented away from the node that flagged them.
    pub oriented_by_votes: usize,
    /// Undirected edges oriented by the ancestry rule.
    pub resolved_undirected: usize,
    /// Node searches abandoned because of a computation error.
    pub failed_searches: usize,
    /// Whether a fixed point was reached within the sweep ceiling.
    pub converged: bool,
}

/// Side table of removal proposals: `flags(t, n)` means node `t` does not
/// keep neighbor `n` in its best conditioning set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneVotes {
    flags: Vec<FixedBitSet>,
}

impl PruneVotes {
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            flags: (0..n).map(|_| FixedBitSet::with_capacity(n)).collect(),
        }
    }

    pub fn flag(&mut self, from: usize, to: usize) {
        self.flags[from].insert(to);
    }

    #[must_use]
    pub fn flags(&self, from: usize, to: usize) -> bool {
        self.flags[from].contains(to)
    }
}

/// Run Step 1 to a fixed point and orient what survives.
///
/// # Errors
///
/// Returns [`SearchError::NonConvergence`] when the sweep ceiling is hit and
/// `config.strict_convergence` is set. Computation errors are absorbed per
/// node and never returned.
#[instrument(skip_all, fields(nodes = seed.len()))]
pub fn prune(
    seed: &AdjacencyMatrix,
    cache: &mut ScoreCache<'_>,
    config: &SearchConfig,
) -> Result<(AdjacencyMatrix, PruneReport), SearchError> {
    let mut report = PruneReport::default();
    let mut current = seed.clone();
    let mut votes;

    loop {
        report.sweeps += 1;
        let (sweep_votes, failed) = cast_votes(&current, cache, config.exhaustive_limit)?;
        report.failed_searches += failed;
        let (next, removed) = merge_votes(&current, &sweep_votes);
        report.removed_edges += removed;
        votes = sweep_votes;

        debug!(
            sweep = report.sweeps,
            removed,
            edges = next.edge_count(),
            "pruning sweep"
        );

        if next == current {
            report.converged = true;
            break;
        }
        current = next;

        if report.sweeps >= config.max_prune_sweeps {
            if config.strict_convergence {
                return Err(SearchError::NonConvergence {
                    step: SearchStep::Pruning,
                    iterations: report.sweeps,
                });
            }
            warn!(
                sweeps = report.sweeps,
                "pruning hit the sweep ceiling; keeping the last structure"
            );
            break;
        }
    }

    let (oriented, by_votes) = orient_flagged(&current, &votes);
    report.oriented_by_votes = by_votes;
    let (resolved, by_ancestry) = resolve_undirected(&oriented);
    report.resolved_undirected = by_ancestry;

    info!(
        sweeps = report.sweeps,
        removed = report.removed_edges,
        oriented = report.oriented_by_votes,
        resolved = report.resolved_undirected,
        converged = report.converged,
        "step 1 complete"
    );

    Ok((resolved, report))
}

/// One sweep: every node with neighbors proposes which edges it can drop.
///
/// Returns the votes and the number of nodes whose search failed.
///
/// # Errors
///
/// Only non-computation errors are returned; none arise from the cache today.
pub fn cast_votes(
    adj: &AdjacencyMatrix,
    cache: &mut ScoreCache<'_>,
    exhaustive_limit: usize,
) -> Result<(PruneVotes, usize), SearchError> {
    let n = adj.len();
    let mut votes = PruneVotes::new(n);
    let mut failed = 0;

    for target in 0..n {
        let neighbors = adj.neighbors(target);
        if neighbors.is_empty() {
            continue;
        }

        match best_conditioning_set(cache, target, &neighbors, exhaustive_limit) {
            Ok(choice) => {
                for &neighbor in &neighbors {
                    if !choice.contains(neighbor) {
                        votes.flag(target, neighbor);
                    }
                }
            }
            Err(err) if err.is_computation() => {
                warn!(
                    node = adj.label(target),
                    error = %err,
                    "conditioning-set search failed; node keeps its edges this sweep"
                );
                failed += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok((votes, failed))
}

/// Apply one sweep's votes: mutual flags delete the edge, a one-sided flag
/// downgrades it to undirected, unflagged edges keep their mark.
#[must_use]
pub fn merge_votes(adj: &AdjacencyMatrix, votes: &PruneVotes) -> (AdjacencyMatrix, usize) {
    let mut next = adj.clone();
    let mut removed = 0;

    for (i, j, _) in adj.edges() {
        match (votes.flags(i, j), votes.flags(j, i)) {
            (true, true) => {
                next.set(i, j, EdgeKind::None);
                removed += 1;
            }
            (true, false) | (false, true) => next.set(i, j, EdgeKind::Undirected),
            (false, false) => {}
        }
    }

    (next, removed)
}

/// Orient each one-sided flagged edge away from the flagging node.
///
/// An orientation that would close a directed cycle is skipped; the edge
/// stays undirected for [`resolve_undirected`]. Edges are visited in index
/// order and ancestry is recomputed after every orientation.
#[must_use]
pub fn orient_flagged(adj: &AdjacencyMatrix, votes: &PruneVotes) -> (AdjacencyMatrix, usize) {
    let mut out = adj.clone();
    let mut oriented = 0;
    let mut ancestors = AncestorIndex::compute(&out);

    for (i, j, _) in adj.edges() {
        let (from, to) = match (votes.flags(i, j), votes.flags(j, i)) {
            (true, false) => (i, j),
            (false, true) => (j, i),
            _ => continue,
        };
        if ancestors.is_ancestor(to, from) {
            debug!(
                from = adj.label(from),
                to = adj.label(to),
                "flag orientation would close a cycle; left undirected"
            );
            continue;
        }
        out.set(from, to, EdgeKind::ParentOf);
        oriented += 1;
        ancestors = AncestorIndex::compute(&out);
    }

    (out, oriented)
}

/// Orient every remaining undirected edge without creating a cycle.
///
/// Nodes are processed by decreasing undirected degree (ties by index); for
/// each undirected edge `node — neighbor` the edge points away from whichever
/// endpoint is already an ancestor of the other, and `node → neighbor` when
/// neither is.
#[must_use]
pub fn resolve_undirected(adj: &AdjacencyMatrix) -> (AdjacencyMatrix, usize) {
    let mut out = adj.clone();
    let mut resolved = 0;

    let mut order: Vec<(usize, usize)> = (0..adj.len())
        .map(|node| (adj.undirected_neighbors(node).len(), node))
        .filter(|&(degree, _)| degree > 0)
        .collect();
    order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    for (_, node) in order {
        for neighbor in out.undirected_neighbors(node) {
            let ancestors = AncestorIndex::compute(&out);
            if ancestors.is_ancestor(neighbor, node) {
                out.set(neighbor, node, EdgeKind::ParentOf);
            } else {
                out.set(node, neighbor, EdgeKind::ParentOf);
            }
            resolved += 1;
        }
    }

    (out, resolved)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::find_directed_cycle;
    use crate::score::TableOracle;

    fn labels(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn undirected(names: &[&str], edges: &[(usize, usize)]) -> AdjacencyMatrix {
        let mut adj = AdjacencyMatrix::new(labels(names)).expect("labels");
        for &(a, b) in edges {
            adj.set(a, b, EdgeKind::Undirected);
        }
        adj
    }

    #[test]
    fn merge_removes_mutual_and_downgrades_one_sided() {
        let mut adj = undirected(&["A", "B", "C"], &[(0, 1)]);
        adj.set(1, 2, EdgeKind::Bidirected);
        adj.set(0, 2, EdgeKind::ParentOf);

        let mut votes = PruneVotes::new(3);
        votes.flag(0, 1);
        votes.flag(1, 0);
        votes.flag(2, 1);

        let (next, removed) = merge_votes(&adj, &votes);
        assert_eq!(removed, 1);
        assert_eq!(next.get(0, 1), EdgeKind::None);
        assert_eq!(next.get(1, 2), EdgeKind::Undirected);
        assert_eq!(next.get(0, 2), EdgeKind::ParentOf, "unflagged edge keeps its mark");
    }

    #[test]
    fn one_sided_flags_point_away_from_the_flagger() {
        let adj = undirected(&["A", "B", "C"], &[(0, 1), (1, 2)]);
        let mut votes = PruneVotes::new(3);
        votes.flag(0, 1); // A does not need B: A → B
        votes.flag(2, 1); // C does not need B: C → B

        let (out, oriented) = orient_flagged(&adj, &votes);
        assert_eq!(oriented, 2);
        assert_eq!(out.get(0, 1), EdgeKind::ParentOf);
        assert_eq!(out.get(2, 1), EdgeKind::ParentOf);
    }

    #[test]
    fn cyclic_flags_leave_one_edge_for_resolution() {
        // A flags B, B flags C, C flags A would orient A → B → C → A.
        let adj = undirected(&["A", "B", "C"], &[(0, 1), (1, 2), (0, 2)]);
        let mut votes = PruneVotes::new(3);
        votes.flag(0, 1);
        votes.flag(1, 2);
        votes.flag(2, 0);

        // Index order: A → B, then C → A, then B → C is refused.
        let (out, oriented) = orient_flagged(&adj, &votes);
        assert_eq!(oriented, 2);
        assert_eq!(out.get(0, 1), EdgeKind::ParentOf);
        assert_eq!(out.get(2, 0), EdgeKind::ParentOf);
        assert_eq!(out.get(1, 2), EdgeKind::Undirected);

        let (resolved, count) = resolve_undirected(&out);
        assert_eq!(count, 1);
        assert_eq!(resolved.get(2, 1), EdgeKind::ParentOf, "C is already an ancestor of B");
        assert!(find_directed_cycle(&resolved).is_none());
    }

    #[test]
    fn resolution_follows_degree_then_index() {
        // Star around C plus A — B: C has the highest undirected degree.
        let adj = undirected(&["A", "B", "C", "D"], &[(0, 1), (2, 0), (2, 1), (2, 3)]);
        let (out, count) = resolve_undirected(&adj);
        assert_eq!(count, 4);
        assert_eq!(out.children(2), vec![0, 1, 3]);
        assert_eq!(out.get(0, 1), EdgeKind::ParentOf);
        assert!(find_directed_cycle(&out).is_none());
    }

    #[test]
    fn resolution_respects_existing_ancestry() {
        // B → A already; B — C — A undirected. C goes first (degree 2).
        let mut adj = undirected(&["A", "B", "C"], &[(1, 2), (2, 0)]);
        adj.set(1, 0, EdgeKind::ParentOf);
        let (out, _) = resolve_undirected(&adj);
        assert_eq!(out.get(2, 0), EdgeKind::ParentOf);
        assert_eq!(out.get(2, 1), EdgeKind::ParentOf);

        // B → A → C: C → B would close a cycle.
        let mut adj = undirected(&["A", "B", "C"], &[(1, 2)]);
        adj.set(0, 2, EdgeKind::ParentOf);
        adj.set(1, 0, EdgeKind::ParentOf);
        let (out, _) = resolve_undirected(&adj);
        assert_eq!(out.get(1, 2), EdgeKind::ParentOf, "B is an ancestor of C");
        assert!(find_directed_cycle(&out).is_none());
    }

    #[test]
    fn prune_drops_edge_explained_by_common_neighbor() {
        // Chain A — B — C plus spurious A — C. Each endpoint prefers B.
        let oracle = TableOracle::new()
            .with_fallback(-0.1)
            .with("A", "B", &[], 0.6)
            .with("B", "C", &[], 0.6)
            .with("A", "C", &[], 0.2)
            .with("B", "C", &["A"], 0.5)
            .with("A", "B", &["C"], 0.5);
        let names = labels(&["A", "B", "C"]);
        let mut cache = ScoreCache::new(&oracle, &names);
        let seed = AdjacencyMatrix::complete(names.clone()).expect("labels");

        let (out, report) = prune(&seed, &mut cache, &SearchConfig::default()).expect("prune");

        assert!(report.converged);
        assert_eq!(report.removed_edges, 1);
        assert_eq!(out.get(0, 2), EdgeKind::None);
        assert_eq!(out.edge_count(), 2);
        assert!(out.undirected_neighbors(1).is_empty(), "everything oriented");
        assert!(find_directed_cycle(&out).is_none());
    }

    #[test]
    fn failing_node_keeps_its_edges() {
        // A — B cannot be scored, so A and B cast no votes. C needs nobody.
        let oracle = |x: &str, y: &str, _: &[&str]| -> anyhow::Result<f64> {
            if (x, y) == ("A", "B") {
                anyhow::bail!("degenerate column")
            }
            Ok(-0.3)
        };
        let names = labels(&["A", "B", "C"]);
        let mut cache = ScoreCache::new(&oracle, &names);
        let seed = AdjacencyMatrix::complete(names.clone()).expect("labels");

        let (out, report) = prune(&seed, &mut cache, &SearchConfig::default()).expect("prune");
        assert!(report.converged);
        assert_eq!(report.sweeps, 1);
        assert_eq!(report.failed_searches, 2);
        assert_eq!(report.removed_edges, 0);
        assert_eq!(out.edge_count(), 3);
        assert_eq!(out.get(2, 0), EdgeKind::ParentOf);
        assert_eq!(out.get(2, 1), EdgeKind::ParentOf);
        assert_eq!(out.get(0, 1), EdgeKind::ParentOf);
    }

    #[test]
    fn strict_ceiling_reports_non_convergence() {
        let oracle = TableOracle::new().with_fallback(-1.0);
        let names = labels(&["A", "B", "C"]);
        let mut cache = ScoreCache::new(&oracle, &names);
        let seed = AdjacencyMatrix::complete(names.clone()).expect("labels");
        let config = SearchConfig {
            max_prune_sweeps: 1,
            strict_convergence: true,
            ..SearchConfig::default()
        };

        let err = prune(&seed, &mut cache, &config).expect_err("needs two sweeps");
        assert_eq!(
            err,
            SearchError::NonConvergence {
                step: SearchStep::Pruning,
                iterations: 1
            }
        );

        let lenient = SearchConfig {
            strict_convergence: false,
            ..config
        };
        let (out, report) = prune(&seed, &mut cache, &lenient).expect("lenient");
        assert!(!report.converged);
        assert_eq!(out.edge_count(), 0);
    }
}
