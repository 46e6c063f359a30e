//! Step 2: greedy edge re-orientation with tabu and structure history.
//!
//! # Loop
//!
//! ```text
//! Scoring    compute_edge_deltas(current)      one EdgeDelta per edge
//!    ↓
//! Selecting  select_move(deltas, history, tabu)
//!    ↓           delta < 0, most improving first
//!    ↓           skip: result already in history (not tabu-listed)
//!    ↓           skip: equal to the latest tabu entry
//! Applying   set the edge, record fingerprint and tabu entry
//!    ↓
//! Scoring    ... until no move is acceptable
//! ```
//!
//! # Edge scores
//!
//! For an edge `(X, Y)` with `Pa'_X = parents(X) \ {Y}` and
//! `Pa'_Y = parents(Y) \ {X}`:
//!
//! | op | result  | score                               |
//! |----|---------|-------------------------------------|
//! | 1  | `X ← Y` | `−I(Y; X \| Pa'_X)`                 |
//! | 2  | `X → Y` | `−I(X; Y \| Pa'_Y)`                 |
//! | 3  | `X ↔ Y` | `−I(X; Y \| Pa'_X ∪ Pa'_Y)`         |
//!
//! Lower is better. The delta of an edge is the best non-blocked score minus
//! the score of its current orientation; an undirected edge is credited with
//! the better of its two directed scores.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchStep};
use crate::graph::{AdjacencyMatrix, AncestorIndex, EdgeKind};
use crate::score::ScoreCache;

/// A re-orientation of one edge `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Op 1: `x ← y`.
    IntoX,
    /// Op 2: `x → y`.
    IntoY,
    /// Op 3: `x ↔ y`.
    Bidirected,
}

impl Orientation {
    pub const ALL: [Self; 3] = [Self::IntoX, Self::IntoY, Self::Bidirected];

    /// Numeric operation code (1, 2 or 3).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::IntoX => 1,
            Self::IntoY => 2,
            Self::Bidirected => 3,
        }
    }

    /// The mark the edge carries at `(x, y)` after the move.
    #[must_use]
    pub const fn kind(self) -> EdgeKind {
        match self {
            Self::IntoX => EdgeKind::ChildOf,
            Self::IntoY => EdgeKind::ParentOf,
            Self::Bidirected => EdgeKind::Bidirected,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::IntoX => 0,
            Self::IntoY => 1,
            Self::Bidirected => 2,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IntoX => "x<-y",
            Self::IntoY => "x->y",
            Self::Bidirected => "x<->y",
        })
    }
}

/// Scoring result for one edge. `op == None` is "op 0": no move suggested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeDelta {
    pub x: usize,
    pub y: usize,
    pub op: Option<Orientation>,
    pub delta: f64,
}

impl EdgeDelta {
    const fn no_move(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            op: None,
            delta: 0.0,
        }
    }

    /// Whether applying this delta would improve the score.
    #[must_use]
    pub fn improves(&self) -> bool {
        self.op.is_some() && self.delta < 0.0
    }
}

/// An applied move. Only the most recent one is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TabuEntry {
    pub x: usize,
    pub y: usize,
    pub op: Orientation,
}

/// Every move applied in a run, newest last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabuList {
    entries: Vec<TabuEntry>,
}

impl TabuList {
    pub fn push(&mut self, entry: TabuEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn latest(&self) -> Option<&TabuEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn is_tabu(&self, x: usize, y: usize, op: Orientation) -> bool {
        self.latest() == Some(&TabuEntry { x, y, op })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A move chosen by [`select_move`], with the structure it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedMove {
    pub entry: TabuEntry,
    pub delta: f64,
    pub next: AdjacencyMatrix,
}

/// Summary of one Step-2 run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrientReport {
    /// Scoring passes performed.
    pub iterations: usize,
    /// Moves applied.
    pub accepted_moves: usize,
    /// Candidate moves skipped because their result was already visited.
    pub skipped_revisits: usize,
    /// Candidate moves skipped because they repeat the latest move.
    pub skipped_tabu: usize,
    /// Edge scorings abandoned because of a computation error.
    pub failed_edges: usize,
    /// Whether the search stopped on its own rather than at the ceiling.
    pub converged: bool,
}

/// Run Step 2 from `start` until no acceptable move remains.
///
/// # Errors
///
/// Returns [`SearchError::NonConvergence`] when `max_orientation_moves` is
/// exhausted with `config.strict_convergence` set.
#[instrument(skip_all, fields(edges = start.edge_count()))]
pub fn orient(
    start: &AdjacencyMatrix,
    cache: &mut ScoreCache<'_>,
    config: &SearchConfig,
) -> Result<(AdjacencyMatrix, OrientReport), SearchError> {
    let mut report = OrientReport::default();
    let mut current = start.clone();
    let mut history = HashSet::from([current.fingerprint()]);
    let mut tabu = TabuList::default();

    loop {
        report.iterations += 1;
        let (deltas, failed) = compute_edge_deltas(&current, cache);
        report.failed_edges += failed;

        let Some(chosen) = select_move(&current, &deltas, &history, &tabu, &mut report) else {
            report.converged = true;
            break;
        };

        if report.accepted_moves >= config.max_orientation_moves {
            if config.strict_convergence {
                return Err(SearchError::NonConvergence {
                    step: SearchStep::Orientation,
                    iterations: report.accepted_moves,
                });
            }
            warn!(
                moves = report.accepted_moves,
                "orientation hit the move ceiling; keeping the last structure"
            );
            break;
        }

        debug!(
            x = current.label(chosen.entry.x),
            y = current.label(chosen.entry.y),
            op = %chosen.entry.op,
            delta = chosen.delta,
            "accepted move"
        );
        history.insert(chosen.next.fingerprint());
        tabu.push(chosen.entry);
        report.accepted_moves += 1;
        current = chosen.next;
    }

    info!(
        iterations = report.iterations,
        moves = report.accepted_moves,
        converged = report.converged,
        "step 2 complete"
    );

    Ok((current, report))
}

/// Score every edge of `adj`. Returns the deltas in edge order and the
/// number of edges whose scoring failed.
pub fn compute_edge_deltas(
    adj: &AdjacencyMatrix,
    cache: &mut ScoreCache<'_>,
) -> (Vec<EdgeDelta>, usize) {
    let mut failed = 0;
    let deltas = adj
        .edges()
        .into_iter()
        .map(|(x, y, _)| match edge_delta(adj, cache, x, y) {
            Ok(delta) => delta,
            Err(err) => {
                warn!(
                    x = adj.label(x),
                    y = adj.label(y),
                    error = %err,
                    "edge scoring failed; no move suggested"
                );
                failed += 1;
                EdgeDelta::no_move(x, y)
            }
        })
        .collect();
    (deltas, failed)
}

/// Score the three orientations of edge `(x, y)` against its current one.
///
/// # Errors
///
/// Propagates the first failing information term.
pub fn edge_delta(
    adj: &AdjacencyMatrix,
    cache: &mut ScoreCache<'_>,
    x: usize,
    y: usize,
) -> Result<EdgeDelta, SearchError> {
    let pa_x: Vec<usize> = adj.parents(x).into_iter().filter(|&p| p != y).collect();
    let pa_y: Vec<usize> = adj.parents(y).into_iter().filter(|&p| p != x).collect();
    if pa_x.is_empty() && pa_y.is_empty() {
        return Ok(EdgeDelta::no_move(x, y));
    }

    let mut pa_both = pa_x.clone();
    pa_both.extend_from_slice(&pa_y);

    let scores = [
        -cache.get_or_compute(y, x, &pa_x)?,
        -cache.get_or_compute(x, y, &pa_y)?,
        -cache.get_or_compute(x, y, &pa_both)?,
    ];
    if same(scores[0], scores[1]) && same(scores[1], scores[2]) {
        return Ok(EdgeDelta::no_move(x, y));
    }

    let current = match adj.get(x, y) {
        EdgeKind::ChildOf => scores[0],
        EdgeKind::ParentOf => scores[1],
        EdgeKind::Bidirected => scores[2],
        EdgeKind::Undirected | EdgeKind::None => scores[0].min(scores[1]),
    };

    let blocked = blocked_orientations(adj, x, y);
    let mut best: Option<(Orientation, f64)> = None;
    for op in Orientation::ALL {
        if blocked[op.slot()] {
            continue;
        }
        let score = scores[op.slot()];
        if best.is_none_or(|(_, top)| score < top) {
            best = Some((op, score));
        }
    }

    Ok(match best {
        Some((op, score)) => {
            let delta = score - current;
            if delta.is_nan() {
                EdgeDelta::no_move(x, y)
            } else {
                EdgeDelta {
                    x,
                    y,
                    op: Some(op),
                    delta,
                }
            }
        }
        None => EdgeDelta::no_move(x, y),
    })
}

#[allow(clippy::float_cmp)]
fn same(a: f64, b: f64) -> bool {
    a == b
}

/// Which of ops 1, 2 and 3 are forbidden for edge `(x, y)`.
///
/// Ancestry is computed without the edge itself. The local rules forbid:
///
/// - op 1 and op 3 when a child of `x` is a parent of `y`;
/// - op 1 when a child of `x` is a spouse of `y`, or a spouse of `x` is a
///   parent of `y`;
/// - the mirror images of both for op 2 and op 3.
#[must_use]
pub fn blocked_orientations(adj: &AdjacencyMatrix, x: usize, y: usize) -> [bool; 3] {
    let mut blocked = [false; 3];
    let ancestors = AncestorIndex::compute_without_edge(adj, x, y);

    if ancestors.is_ancestor(x, y) {
        blocked[Orientation::IntoX.slot()] = true;
        blocked[Orientation::Bidirected.slot()] = true;
    }
    if ancestors.is_ancestor(y, x) {
        blocked[Orientation::IntoY.slot()] = true;
        blocked[Orientation::Bidirected.slot()] = true;
    }

    for (from, to, forward) in [(x, y, Orientation::IntoX), (y, x, Orientation::IntoY)] {
        let children = adj.children(from);
        let spouses = adj.spouses(from);
        let to_parents = adj.parents(to);
        let to_spouses = adj.spouses(to);

        if children.iter().any(|c| to_parents.contains(c)) {
            blocked[forward.slot()] = true;
            blocked[Orientation::Bidirected.slot()] = true;
        }
        if children.iter().any(|c| to_spouses.contains(c))
            || spouses.iter().any(|s| to_parents.contains(s))
        {
            blocked[forward.slot()] = true;
        }
    }

    blocked
}

/// Pick the most improving acceptable move and build the resulting matrix.
///
/// Skipped candidates are counted in `report`.
pub fn select_move(
    adj: &AdjacencyMatrix,
    deltas: &[EdgeDelta],
    history: &HashSet<blake3::Hash>,
    tabu: &TabuList,
    report: &mut OrientReport,
) -> Option<AcceptedMove> {
    let mut improving: Vec<&EdgeDelta> = deltas.iter().filter(|d| d.improves()).collect();
    improving.sort_by(|a, b| a.delta.total_cmp(&b.delta));

    for candidate in improving {
        let Some(op) = candidate.op else {
            continue;
        };
        let mut next = adj.clone();
        next.set(candidate.x, candidate.y, op.kind());

        if history.contains(&next.fingerprint()) {
            report.skipped_revisits += 1;
            continue;
        }
        if tabu.is_tabu(candidate.x, candidate.y, op) {
            report.skipped_tabu += 1;
            continue;
        }
        return Some(AcceptedMove {
            entry: TabuEntry {
                x: candidate.x,
                y: candidate.y,
                op,
            },
            delta: candidate.delta,
            next,
        });
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
