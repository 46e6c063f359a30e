//! Orchestration of a full search&score run.
//!
//! ```text
//! seed AdjacencyMatrix + seed values
//!        ↓  validate config, reject cyclic seeds
//!        ↓  ScoreCache::seed()
//! Step 1 (search::prune)   to a fixed point
//!        ↓
//! Step 2 (search::orient)  until no acceptable move
//!        ↓
//! SearchOutcome  (cache dropped here)
//! ```

use tracing::{info, instrument};

use crate::config::SearchConfig;
use crate::error::{MalformedInput, SearchError};
use crate::graph::{AdjacencyMatrix, EdgeCensus, find_directed_cycle};
use crate::score::{CacheStats, InformationOracle, ScoreCache, SeedValue};
use crate::search::{OrientReport, PruneReport, orient, prune};

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Final structure, same variable order as the seed.
    pub adjacency: AdjacencyMatrix,
    pub step1: PruneReport,
    pub step2: OrientReport,
    pub cache: CacheStats,
}

impl SearchOutcome {
    /// Whether both steps stopped on their own rather than at a ceiling.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.step1.converged && self.step2.converged
    }

    #[must_use]
    pub fn census(&self) -> EdgeCensus {
        self.adjacency.census()
    }
}

/// Runs Step 1 then Step 2 under one configuration.
#[derive(Debug, Clone, Default)]
pub struct GraphEngine {
    config: SearchConfig,
}

impl GraphEngine {
    #[must_use]
    pub const fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Refine `seed` into a final oriented structure.
    ///
    /// A fresh [`ScoreCache`] is created for the run, pre-populated from
    /// `seed_values`, and dropped when the run ends.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Config`] for an invalid configuration.
    /// - [`SearchError::MalformedInput`] when the seed is inconsistent, its
    ///   directed part already contains a cycle, or a seed value names an
    ///   unknown variable.
    /// - [`SearchError::NonConvergence`] when a ceiling is hit in strict mode.
    #[instrument(skip_all, fields(variables = seed.len(), seeded = seed_values.len()))]
    pub fn run(
        &self,
        seed: &AdjacencyMatrix,
        oracle: &dyn InformationOracle,
        seed_values: &[SeedValue],
    ) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        seed.check_consistency()?;
        if let Some(cycle) = find_directed_cycle(seed) {
            return Err(MalformedInput::DirectedCycle(cycle).into());
        }

        let mut cache = ScoreCache::new(oracle, seed.labels());
        for value in seed_values {
            cache.seed(value)?;
        }

        info!(edges = seed.edge_count(), "search&score started");

        let (pruned, step1) = prune(seed, &mut cache, &self.config)?;
        let (adjacency, step2) = orient(&pruned, &mut cache, &self.config)?;
        let cache = cache.stats();

        let census = adjacency.census();
        info!(
            directed = census.directed,
            undirected = census.undirected,
            bidirected = census.bidirected,
            oracle_calls = cache.misses,
            cache_hits = cache.hits,
            "search&score finished"
        );

        Ok(SearchOutcome {
            adjacency,
            step1,
            step2,
            cache,
        })
    }
}

/// One-shot form of [`GraphEngine::run`].
///
/// # Errors
///
/// Same as [`GraphEngine::run`].
pub fn search_and_score(
    seed: &AdjacencyMatrix,
    oracle: &dyn InformationOracle,
    seed_values: &[SeedValue],
    config: SearchConfig,
) -> Result<SearchOutcome, SearchError> {
    GraphEngine::new(config).run(seed, oracle, seed_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;
    use crate::score::TableOracle;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn invalid_config_fails_before_any_oracle_call() {
        let oracle = |_: &str, _: &str, _: &[&str]| -> anyhow::Result<f64> {
            panic!("oracle must not be called")
        };
        let seed = AdjacencyMatrix::complete(labels(&["A", "B"])).expect("labels");
        let config = SearchConfig {
            exhaustive_limit: 0,
            ..SearchConfig::default()
        };
        let err = search_and_score(&seed, &oracle, &[], config).expect_err("invalid");
        assert_eq!(err.code(), "E4001");
    }

    #[test]
    fn cyclic_seed_is_rejected() {
        let mut seed = AdjacencyMatrix::new(labels(&["A", "B", "C"])).expect("labels");
        seed.set(0, 1, EdgeKind::ParentOf);
        seed.set(1, 2, EdgeKind::ParentOf);
        seed.set(2, 0, EdgeKind::ParentOf);
        let oracle = TableOracle::new().with_fallback(0.0);

        let err = GraphEngine::default()
            .run(&seed, &oracle, &[])
            .expect_err("cycle");
        assert!(matches!(
            err,
            SearchError::MalformedInput(MalformedInput::DirectedCycle(_))
        ));
    }

    #[test]
    fn unknown_seed_variable_is_rejected() {
        let seed = AdjacencyMatrix::complete(labels(&["A", "B"])).expect("labels");
        let oracle = TableOracle::new().with_fallback(0.0);
        let values = [SeedValue {
            x: "A".into(),
            y: "Q".into(),
            conditioning: vec![],
            value: 0.1,
        }];
        let err = GraphEngine::default()
            .run(&seed, &oracle, &values)
            .expect_err("unknown");
        assert_eq!(err.code(), "E1008");
    }

    #[test]
    fn seed_values_replace_oracle_calls() {
        let oracle = TableOracle::new();
        let seed = AdjacencyMatrix::complete(labels(&["A", "B"])).expect("labels");
        let values = [SeedValue {
            x: "B".into(),
            y: "A".into(),
            conditioning: vec![],
            value: 0.7,
        }];

        let outcome = search_and_score(&seed, &oracle, &values, SearchConfig::default())
            .expect("run");
        assert!(outcome.converged());
        assert_eq!(outcome.cache.misses, 0);
        assert_eq!(outcome.cache.seeded, 1);
        assert_eq!(outcome.adjacency.get(0, 1), EdgeKind::ParentOf);
    }
}
