//! The adjacency structure threaded through both search steps.
//!
//! # Overview
//!
//! [`AdjacencyMatrix`] is a labelled square matrix of [`EdgeKind`] marks.
//! Every write goes through [`AdjacencyMatrix::set`], which also writes the
//! mirrored mark, so the matrix is consistent by construction. Input coming
//! from outside (integer codes) is checked once by
//! [`AdjacencyMatrix::from_codes`].
//!
//! ## Fingerprints
//!
//! [`AdjacencyMatrix::fingerprint`] is a BLAKE3 hash of the code matrix.
//! Step 2 keeps a history of fingerprints to detect revisited structures.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use super::edge::EdgeKind;
use crate::error::MalformedInput;

/// Labelled five-code adjacency matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    cells: Vec<EdgeKind>,
}

/// Edge totals by kind, counted once per unordered pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EdgeCensus {
    pub undirected: usize,
    pub directed: usize,
    pub bidirected: usize,
}

impl EdgeCensus {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.undirected + self.directed + self.bidirected
    }
}

impl AdjacencyMatrix {
    /// An edgeless matrix over `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedInput`] if `labels` is empty, contains an empty
    /// label, or contains duplicates.
    pub fn new(labels: Vec<String>) -> Result<Self, MalformedInput> {
        let index = index_labels(&labels)?;
        let n = labels.len();
        Ok(Self {
            labels,
            index,
            cells: vec![EdgeKind::None; n * n],
        })
    }

    /// A matrix where every pair of distinct variables is joined by an
    /// undirected edge. Used as the seed when no prior skeleton exists.
    ///
    /// # Errors
    ///
    /// Same as [`AdjacencyMatrix::new`].
    pub fn complete(labels: Vec<String>) -> Result<Self, MalformedInput> {
        let mut adj = Self::new(labels)?;
        let n = adj.len();
        for i in 0..n {
            for j in (i + 1)..n {
                adj.set(i, j, EdgeKind::Undirected);
            }
        }
        Ok(adj)
    }

    /// Build a matrix from integer codes, validating the five-code convention.
    ///
    /// # Errors
    ///
    /// Returns the first [`MalformedInput`] found: label problems, ragged or
    /// non-square rows, codes outside `{0, 1, 2, -2, 6}`, non-zero diagonal
    /// cells, or cells whose mirror does not match.
    pub fn from_codes(labels: Vec<String>, rows: &[Vec<i64>]) -> Result<Self, MalformedInput> {
        if labels.is_empty() && rows.is_empty() {
            return Err(MalformedInput::Empty);
        }
        if labels.len() != rows.len() {
            return Err(MalformedInput::LabelCount {
                labels: labels.len(),
                size: rows.len(),
            });
        }

        let n = rows.len();
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != n {
                return Err(MalformedInput::NonSquare {
                    row,
                    len: cells.len(),
                    expected: n,
                });
            }
        }

        let mut kinds = Vec::with_capacity(n * n);
        for (row, cells) in rows.iter().enumerate() {
            for (col, &code) in cells.iter().enumerate() {
                let kind =
                    EdgeKind::from_code(code).ok_or(MalformedInput::InvalidCode { row, col, code })?;
                if row == col && kind.is_edge() {
                    return Err(MalformedInput::NonZeroDiagonal { index: row, code });
                }
                kinds.push(kind);
            }
        }

        let index = index_labels(&labels)?;
        let adj = Self {
            labels,
            index,
            cells: kinds,
        };
        adj.check_consistency()?;
        Ok(adj)
    }

    /// Verify the mirroring invariant and the zero diagonal.
    ///
    /// # Errors
    ///
    /// Returns the first offending cell.
    pub fn check_consistency(&self) -> Result<(), MalformedInput> {
        let n = self.len();
        for i in 0..n {
            let diagonal = self.get(i, i);
            if diagonal.is_edge() {
                return Err(MalformedInput::NonZeroDiagonal {
                    index: i,
                    code: i64::from(diagonal.code()),
                });
            }
            for j in (i + 1)..n {
                let forward = self.get(i, j);
                let backward = self.get(j, i);
                if forward.mirrored() != backward {
                    return Err(MalformedInput::Asymmetric {
                        row: i,
                        col: j,
                        forward: i64::from(forward.code()),
                        backward: i64::from(backward.code()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn label(&self, idx: usize) -> &str {
        &self.labels[idx]
    }

    /// Look up the matrix index of a variable.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// The mark of edge `(i, j)` as seen from `i`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> EdgeKind {
        self.cells[i * self.len() + j]
    }

    /// Write the mark of edge `(i, j)` and its mirror at `(j, i)`.
    ///
    /// Writes to the diagonal are ignored.
    pub fn set(&mut self, i: usize, j: usize, kind: EdgeKind) {
        debug_assert_ne!(i, j, "diagonal cells are always empty");
        if i == j {
            return;
        }
        let n = self.len();
        self.cells[i * n + j] = kind;
        self.cells[j * n + i] = kind.mirrored();
    }

    /// Every variable joined to `i` by an edge of any kind, in index order.
    #[must_use]
    pub fn neighbors(&self, i: usize) -> Vec<usize> {
        self.select(i, EdgeKind::is_edge)
    }

    /// Variables `p` with `p → i`.
    #[must_use]
    pub fn parents(&self, i: usize) -> Vec<usize> {
        self.select(i, |kind| kind == EdgeKind::ChildOf)
    }

    /// Variables `c` with `i → c`.
    #[must_use]
    pub fn children(&self, i: usize) -> Vec<usize> {
        self.select(i, |kind| kind == EdgeKind::ParentOf)
    }

    /// Variables `s` with `i ↔ s`.
    #[must_use]
    pub fn spouses(&self, i: usize) -> Vec<usize> {
        self.select(i, |kind| kind == EdgeKind::Bidirected)
    }

    /// Variables `u` with `i — u`.
    #[must_use]
    pub fn undirected_neighbors(&self, i: usize) -> Vec<usize> {
        self.select(i, |kind| kind == EdgeKind::Undirected)
    }

    fn select(&self, i: usize, keep: impl Fn(EdgeKind) -> bool) -> Vec<usize> {
        (0..self.len())
            .filter(|&j| j != i && keep(self.get(i, j)))
            .collect()
    }

    /// All edges as `(i, j, kind)` with `i < j`, kind seen from `i`.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize, EdgeKind)> {
        let n = self.len();
        let mut edges = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let kind = self.get(i, j);
                if kind.is_edge() {
                    edges.push((i, j, kind));
                }
            }
        }
        edges
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.census().total()
    }

    #[must_use]
    pub fn census(&self) -> EdgeCensus {
        let mut census = EdgeCensus::default();
        for (_, _, kind) in self.edges() {
            match kind {
                EdgeKind::None => {}
                EdgeKind::Undirected => census.undirected += 1,
                EdgeKind::ParentOf | EdgeKind::ChildOf => census.directed += 1,
                EdgeKind::Bidirected => census.bidirected += 1,
            }
        }
        census
    }

    /// Row-major integer codes, same variable order as [`Self::labels`].
    #[must_use]
    pub fn to_codes(&self) -> Vec<Vec<i8>> {
        self.cells
            .chunks(self.len().max(1))
            .map(|row| row.iter().map(|kind| kind.code()).collect())
            .collect()
    }

    /// BLAKE3 hash of the code matrix.
    #[must_use]
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.len() as u64).to_le_bytes());
        for kind in &self.cells {
            hasher.update(&kind.code().to_le_bytes());
        }
        hasher.finalize()
    }

    /// The directed part as a petgraph graph: one node per variable (node
    /// index equals matrix index, weight is the matrix index) and an edge
    /// `p → c` for every parent relation.
    #[must_use]
    pub fn parent_graph(&self) -> DiGraph<usize, ()> {
        let n = self.len();
        let mut graph = DiGraph::<usize, ()>::with_capacity(n, n);
        for i in 0..n {
            graph.add_node(i);
        }
        for (i, j, kind) in self.edges() {
            match kind {
                EdgeKind::ParentOf => {
                    graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
                }
                EdgeKind::ChildOf => {
                    graph.add_edge(NodeIndex::new(j), NodeIndex::new(i), ());
                }
                EdgeKind::None | EdgeKind::Undirected | EdgeKind::Bidirected => {}
            }
        }
        graph
    }
}

fn index_labels(labels: &[String]) -> Result<HashMap<String, usize>, MalformedInput> {
    if labels.is_empty() {
        return Err(MalformedInput::Empty);
    }
    let mut index = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        if label.trim().is_empty() {
            return Err(MalformedInput::MissingLabel(i));
        }
        if index.insert(label.clone(), i).is_some() {
            return Err(MalformedInput::DuplicateLabel(label.clone()));
        }
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
