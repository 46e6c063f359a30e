//! Adjacency structures for ancestral graphs.
//!
//! # Overview
//!
//! ```text
//! integer codes (seed)
//!        ↓  AdjacencyMatrix::from_codes()
//! AdjacencyMatrix (five edge marks, mirrored)
//!        ↓  AdjacencyMatrix::parent_graph()
//! DiGraph of parent relations
//!        ↓  AncestorIndex::compute()
//! AncestorIndex (per-node ancestor sets)
//! ```
//!
//! The matrix is the single mutable state of a run. Both search steps take
//! it by reference and hand back a new matrix.

pub mod adjacency;
pub mod ancestors;
pub mod edge;

pub use adjacency::{AdjacencyMatrix, EdgeCensus};
pub use ancestors::{AncestorIndex, find_directed_cycle};
pub use edge::EdgeKind;
