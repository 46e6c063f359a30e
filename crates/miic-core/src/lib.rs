#![forbid(unsafe_code)]
//! miic-core: the search&score engine for causal ancestral graphs.
//!
//! A run takes a seed adjacency structure and an [`InformationOracle`], then
//!
//! 1. prunes edges node by node using best conditioning sets (Step 1), and
//! 2. greedily re-orients the surviving edges (Step 2),
//!
//! with every information value memoized in one [`ScoreCache`].
//!
//! # Conventions
//!
//! - **Errors**: library errors are `thiserror` enums ([`SearchError`],
//!   [`MalformedInput`]); oracles and file loading return `anyhow::Result`.
//! - **Logging**: `tracing` macros only; the library never installs a
//!   subscriber.
//! - **Edge marks**: cell `(i, j)` holds the mark as seen from `i`; see
//!   [`EdgeKind`].
//!
//! # Example
//!
//! ```
//! use miic_core::{AdjacencyMatrix, SearchConfig, TableOracle, search_and_score};
//!
//! let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
//! let seed = AdjacencyMatrix::complete(labels).unwrap();
//! let oracle = TableOracle::new()
//!     .with_fallback(-0.1)
//!     .with("A", "B", &[], 0.6)
//!     .with("B", "C", &[], 0.6)
//!     .with("A", "C", &[], 0.2)
//!     .with("B", "C", &["A"], 0.5)
//!     .with("A", "B", &["C"], 0.5);
//!
//! let outcome = search_and_score(&seed, &oracle, &[], SearchConfig::default()).unwrap();
//! assert_eq!(outcome.adjacency.edge_count(), 2);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod score;
pub mod search;

pub use config::{FileConfig, SearchConfig, resolve_config};
pub use engine::{GraphEngine, SearchOutcome, search_and_score};
pub use error::{MalformedInput, SearchError, SearchStep};
pub use graph::{AdjacencyMatrix, AncestorIndex, EdgeCensus, EdgeKind, find_directed_cycle};
pub use score::{
    CacheStats, DiscreteDataset, InformationOracle, Penalty, PluginEstimator, ScoreCache,
    ScoreKey, SeedValue, TableOracle,
};
pub use search::{OrientReport, PruneReport};
