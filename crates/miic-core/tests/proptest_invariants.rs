//! Structural invariants of full runs over random seeds and oracles.

use std::cell::RefCell;
use std::collections::HashMap;

use miic_core::search::prune;
use miic_core::{
    GraphEngine, ScoreCache, SearchConfig, find_directed_cycle, search_and_score,
};
use proptest::prelude::*;

#[path = "generators.rs"]
mod generators;
use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(128))]

    #[test]
    fn output_is_mirrored_and_acyclic(seed in arb_seed(), salt in any::<u64>()) {
        let oracle = |x: &str, y: &str, z: &[&str]| -> anyhow::Result<f64> {
            Ok(hashed_information(salt, x, y, z))
        };
        let outcome = search_and_score(&seed, &oracle, &[], SearchConfig::default()).unwrap();

        prop_assert!(outcome.adjacency.check_consistency().is_ok());
        prop_assert!(find_directed_cycle(&outcome.adjacency).is_none());
        prop_assert_eq!(outcome.adjacency.labels(), seed.labels());
        prop_assert!(outcome.adjacency.edge_count() <= seed.edge_count());
        prop_assert!(outcome.converged());
    }

    #[test]
    fn runs_are_deterministic(seed in arb_seed(), salt in any::<u64>()) {
        let oracle = |x: &str, y: &str, z: &[&str]| -> anyhow::Result<f64> {
            Ok(hashed_information(salt, x, y, z))
        };
        let engine = GraphEngine::default();
        let first = engine.run(&seed, &oracle, &[]).unwrap();
        let second = engine.run(&seed, &oracle, &[]).unwrap();

        prop_assert_eq!(first.adjacency.to_codes(), second.adjacency.to_codes());
        prop_assert_eq!(first.step1, second.step1);
        prop_assert_eq!(first.step2, second.step2);
    }

    #[test]
    fn step_one_is_idempotent(seed in arb_seed(), salt in any::<u64>()) {
        let oracle = |x: &str, y: &str, z: &[&str]| -> anyhow::Result<f64> {
            Ok(hashed_information(salt, x, y, z))
        };
        let config = SearchConfig::default();

        let mut cache = ScoreCache::new(&oracle, seed.labels());
        let (once, _) = prune(&seed, &mut cache, &config).unwrap();

        let mut fresh = ScoreCache::new(&oracle, seed.labels());
        let (twice, report) = prune(&once, &mut fresh, &config).unwrap();

        prop_assert_eq!(twice, once);
        prop_assert_eq!(report.removed_edges, 0);
    }

    #[test]
    fn oracle_is_called_at_most_once_per_key(seed in arb_seed(), salt in any::<u64>()) {
        let calls: RefCell<HashMap<String, u32>> = RefCell::new(HashMap::new());
        let oracle = |x: &str, y: &str, z: &[&str]| -> anyhow::Result<f64> {
            let (a, b) = if x <= y { (x, y) } else { (y, x) };
            let mut cond = z.to_vec();
            cond.sort_unstable();
            *calls
                .borrow_mut()
                .entry(format!("{a}|{b}|{}", cond.join(",")))
                .or_insert(0) += 1;
            Ok(hashed_information(salt, x, y, z))
        };

        let outcome = search_and_score(&seed, &oracle, &[], SearchConfig::default()).unwrap();
        let calls = calls.borrow();

        prop_assert!(calls.values().all(|&count| count == 1));
        prop_assert_eq!(calls.len() as u64, outcome.cache.misses);
    }
}
