//! Error taxonomy for the search-and-score engine.
//!
//! Three classes of failure exist:
//!
//! - [`MalformedInput`]: the seed structure or seed values cannot be used.
//!   Always fatal and reported before any search work starts.
//! - [`SearchError::Computation`]: the information oracle failed or returned
//!   a non-finite value for one `(pair, conditioning set)` term. The search
//!   engines absorb these locally (see `search::prune` and `search::orient`).
//! - [`SearchError::NonConvergence`]: an iteration ceiling was hit while
//!   `strict_convergence` is enabled.

use std::fmt;

/// Problems with the seed adjacency structure or pre-computed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedInput {
    /// The structure has no variables at all.
    #[error("adjacency structure is empty")]
    Empty,

    /// A row does not have one cell per variable.
    #[error("row {row} has {len} cells, expected {expected}")]
    NonSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    /// The label list and the matrix disagree on the number of variables.
    #[error("{labels} variable labels for a {size}x{size} matrix")]
    LabelCount { labels: usize, size: usize },

    /// A variable has an empty label.
    #[error("variable {0} has no label")]
    MissingLabel(usize),

    /// Two variables share one label.
    #[error("duplicate variable label '{0}'")]
    DuplicateLabel(String),

    /// A cell holds something other than 0, 1, 2, -2 or 6.
    #[error("invalid edge code {code} at ({row}, {col})")]
    InvalidCode { row: usize, col: usize, code: i64 },

    /// A diagonal cell is non-zero.
    #[error("non-zero diagonal code {code} for variable {index}")]
    NonZeroDiagonal { index: usize, code: i64 },

    /// `(row, col)` and `(col, row)` are not a valid mirrored pair.
    #[error("inconsistent mirror at ({row}, {col}): {forward} vs {backward}")]
    Asymmetric {
        row: usize,
        col: usize,
        forward: i64,
        backward: i64,
    },

    /// A name that is not one of the run's variables.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// The directed part of the seed already contains a cycle.
    #[error("directed cycle in seed structure: {}", .0.join(" -> "))]
    DirectedCycle(Vec<String>),

    /// A pre-computed information value is unusable.
    #[error("invalid seed value for ({x}, {y}): {reason}")]
    InvalidSeedValue {
        x: String,
        y: String,
        reason: String,
    },
}

/// Errors surfaced by the search engines and the orchestrator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("malformed input: {0}")]
    MalformedInput(#[from] MalformedInput),

    /// The oracle failed or produced a non-finite value.
    #[error("information computation failed for ({}, {}) given [{}]: {reason}", .pair.0, .pair.1, .conditioning.join(", "))]
    Computation {
        pair: (String, String),
        conditioning: Vec<String>,
        reason: String,
    },

    /// An iteration ceiling was reached before a fixed point.
    #[error("{step} did not converge within {iterations} iterations")]
    NonConvergence { step: SearchStep, iterations: usize },

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SearchError {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(inner) => match inner {
                MalformedInput::Empty => "E1001",
                MalformedInput::NonSquare { .. } => "E1002",
                MalformedInput::LabelCount { .. } => "E1003",
                MalformedInput::MissingLabel(_) => "E1011",
                MalformedInput::DuplicateLabel(_) => "E1004",
                MalformedInput::InvalidCode { .. } => "E1005",
                MalformedInput::NonZeroDiagonal { .. } => "E1006",
                MalformedInput::Asymmetric { .. } => "E1007",
                MalformedInput::UnknownVariable(_) => "E1008",
                MalformedInput::DirectedCycle(_) => "E1009",
                MalformedInput::InvalidSeedValue { .. } => "E1010",
            },
            Self::Computation { .. } => "E2001",
            Self::NonConvergence { .. } => "E3001",
            Self::Config(_) => "E4001",
        }
    }

    /// Whether the error is confined to a single score term.
    #[must_use]
    pub const fn is_computation(&self) -> bool {
        matches!(self, Self::Computation { .. })
    }
}

/// Which half of the engine an error or report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStep {
    /// Step 1: conditioning-set search and edge pruning.
    Pruning,
    /// Step 2: greedy edge orientation.
    Orientation,
}

impl fmt::Display for SearchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pruning => write!(f, "step 1 (pruning)"),
            Self::Orientation => write!(f, "step 2 (orientation)"),
        }
    }
}
