//! Memoized information values shared by both search steps.
//!
//! # Keys
//!
//! A [`ScoreKey`] is the sorted variable pair plus the sorted, deduplicated
//! conditioning set, all as matrix indices. `I(x; y | Z)` and `I(y; x | Z')`
//! with `Z'` a permutation of `Z` therefore share one entry.
//!
//! # Lifetime
//!
//! One cache lives for exactly one engine run. It only grows: values are
//! never evicted, and a failed oracle call is remembered as a failure so the
//! oracle is asked about each key at most once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::oracle::InformationOracle;
use crate::error::{MalformedInput, SearchError};

/// Canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScoreKey {
    pair: (usize, usize),
    conditioning: Vec<usize>,
}

impl ScoreKey {
    #[must_use]
    pub fn new(x: usize, y: usize, conditioning: &[usize]) -> Self {
        let pair = if x <= y { (x, y) } else { (y, x) };
        let mut conditioning = conditioning.to_vec();
        conditioning.sort_unstable();
        conditioning.dedup();
        Self { pair, conditioning }
    }

    #[must_use]
    pub const fn pair(&self) -> (usize, usize) {
        self.pair
    }

    #[must_use]
    pub fn conditioning(&self) -> &[usize] {
        &self.conditioning
    }
}

/// A value known before the search starts, typically produced by the
/// structure-learning pass that built the seed skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedValue {
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub conditioning: Vec<String>,
    pub value: f64,
}

/// Counters describing cache traffic for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that reached the oracle.
    pub misses: u64,
    /// Oracle calls that failed or returned a non-finite value.
    pub failures: u64,
    /// Entries inserted from seed values.
    pub seeded: u64,
}

/// Memoizing front of an [`InformationOracle`].
pub struct ScoreCache<'o> {
    oracle: &'o dyn InformationOracle,
    labels: Vec<String>,
    entries: HashMap<ScoreKey, Result<f64, String>>,
    stats: CacheStats,
}

impl<'o> ScoreCache<'o> {
    /// An empty cache over the variables `labels` (matrix order).
    #[must_use]
    pub fn new(oracle: &'o dyn InformationOracle, labels: &[String]) -> Self {
        Self {
            oracle,
            labels: labels.to_vec(),
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Insert a precomputed value, replacing any existing entry for its key.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedInput`] when a variable is unknown, the pair is a
    /// single variable, the conditioning set contains one of the pair, or
    /// the value is not finite.
    pub fn seed(&mut self, seed: &SeedValue) -> Result<(), MalformedInput> {
        let invalid = |reason: &str| MalformedInput::InvalidSeedValue {
            x: seed.x.clone(),
            y: seed.y.clone(),
            reason: reason.to_string(),
        };

        let x = self.resolve(&seed.x)?;
        let y = self.resolve(&seed.y)?;
        if x == y {
            return Err(invalid("pair must name two distinct variables"));
        }
        let conditioning = seed
            .conditioning
            .iter()
            .map(|name| self.resolve(name))
            .collect::<Result<Vec<_>, _>>()?;
        if conditioning.contains(&x) || conditioning.contains(&y) {
            return Err(invalid("conditioning set contains a member of the pair"));
        }
        if !seed.value.is_finite() {
            return Err(invalid("value is not finite"));
        }

        self.entries
            .insert(ScoreKey::new(x, y, &conditioning), Ok(seed.value));
        self.stats.seeded += 1;
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<usize, MalformedInput> {
        self.labels
            .iter()
            .position(|label| label == name)
            .ok_or_else(|| MalformedInput::UnknownVariable(name.to_string()))
    }

    /// `I(x; y | conditioning)`, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Computation`] when the oracle fails or answers
    /// with a non-finite value, now or on the first request for this key.
    pub fn get_or_compute(
        &mut self,
        x: usize,
        y: usize,
        conditioning: &[usize],
    ) -> Result<f64, SearchError> {
        let key = ScoreKey::new(x, y, conditioning);

        let outcome = if let Some(cached) = self.entries.get(&key) {
            self.stats.hits += 1;
            cached.clone()
        } else {
            self.stats.misses += 1;
            let outcome = self.ask_oracle(&key);
            if outcome.is_err() {
                self.stats.failures += 1;
            }
            self.entries.insert(key.clone(), outcome.clone());
            outcome
        };

        outcome.map_err(|reason| self.computation_error(&key, reason))
    }

    /// Plain mutual information `I(x; y)`.
    ///
    /// # Errors
    ///
    /// Same as [`ScoreCache::get_or_compute`].
    pub fn mutual_information(&mut self, x: usize, y: usize) -> Result<f64, SearchError> {
        self.get_or_compute(x, y, &[])
    }

    fn ask_oracle(&self, key: &ScoreKey) -> Result<f64, String> {
        let (x, y) = key.pair;
        let conditioning: Vec<&str> = key
            .conditioning
            .iter()
            .map(|&idx| self.labels[idx].as_str())
            .collect();

        trace!(
            x = %self.labels[x],
            y = %self.labels[y],
            conditioning = ?conditioning,
            "oracle call"
        );

        match self
            .oracle
            .mutual_information(&self.labels[x], &self.labels[y], &conditioning)
        {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(value) => Err(format!("non-finite value {value}")),
            Err(err) => Err(format!("{err:#}")),
        }
    }

    fn computation_error(&self, key: &ScoreKey, reason: String) -> SearchError {
        let (x, y) = key.pair;
        SearchError::Computation {
            pair: (self.labels[x].clone(), self.labels[y].clone()),
            conditioning: key
                .conditioning
                .iter()
                .map(|&idx| self.labels[idx].clone())
                .collect(),
            reason,
        }
    }

    #[must_use]
    pub fn contains(&self, x: usize, y: usize, conditioning: &[usize]) -> bool {
        self.entries
            .contains_key(&ScoreKey::new(x, y, conditioning))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl std::fmt::Debug for ScoreCache<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCache")
            .field("labels", &self.labels)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
