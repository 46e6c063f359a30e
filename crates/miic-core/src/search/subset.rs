//! Best conditioning-set search for one target variable (Step-1 kernel).
//!
//! # Algorithm
//!
//! Given a target `T` and its neighborhood `N`, grow the best subset one size
//! at a time:
//!
//! 1. Size 1: every neighbor `n` scores `I(T; n)`.
//! 2. Size `i > 1`: each candidate `S` is scored against the current best
//!    set `B` (size `i − 1`) as
//!
//!    ```text
//!    score(S) = −gain(B \ S | B ∩ S) + gain(S \ B | B ∩ S)
//!    gain(C | base) = Σ_k I(T; c_k | base ∪ {c_1 … c_{k−1}})
//!    ```
//!
//! 3. The best candidate of size `i` (first one wins ties) replaces `B` if
//!    its score is positive; otherwise the search stops and returns `B`.
//!
//! Candidates of size `i` are all `i`-combinations of `N` only while
//! `i <= limit` and `|N| <= limit` (`limit` is
//! [`SearchConfig::exhaustive_limit`](crate::config::SearchConfig)). Past
//! that, the only candidates are `B ∪ {n}` for each `n ∉ B`. This greedy
//! restriction keeps large neighborhoods tractable and is not exhaustive:
//! the subset returned is not guaranteed to be the best over all subsets.

use tracing::debug;

use crate::error::SearchError;
use crate::score::ScoreCache;

/// Outcome of a conditioning-set search.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetChoice {
    /// Chosen neighbors, in index order.
    pub members: Vec<usize>,
    /// Cumulative information gain of `members`.
    pub gain: f64,
    /// Best score seen at each evaluated size, starting at size 1. The last
    /// entry is the non-positive score that stopped the search, if any.
    pub size_scores: Vec<f64>,
}

impl SubsetChoice {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            members: Vec::new(),
            gain: 0.0,
            size_scores: Vec::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, node: usize) -> bool {
        self.members.binary_search(&node).is_ok()
    }
}

/// Find the subset of `neighbors` carrying the most information about
/// `target`.
///
/// # Errors
///
/// Propagates the first [`SearchError::Computation`] hit by any score term;
/// the caller decides what a failed search means for the node.
pub fn best_conditioning_set(
    cache: &mut ScoreCache<'_>,
    target: usize,
    neighbors: &[usize],
    exhaustive_limit: usize,
) -> Result<SubsetChoice, SearchError> {
    if neighbors.is_empty() {
        return Ok(SubsetChoice::empty());
    }

    let n = neighbors.len();
    let mut best: Vec<usize> = Vec::new();
    let mut gain = 0.0;
    let mut size_scores = Vec::with_capacity(n);

    for size in 1..=n {
        let candidates: Vec<Vec<usize>> = if size == 1 {
            neighbors.iter().map(|&v| vec![v]).collect()
        } else if size > exhaustive_limit || n > exhaustive_limit {
            neighbors
                .iter()
                .filter(|v| !best.contains(v))
                .map(|&v| {
                    let mut extended = best.clone();
                    extended.push(v);
                    extended
                })
                .collect()
        } else {
            combinations(neighbors, size)
        };

        let mut round_best: Option<(f64, Vec<usize>)> = None;
        for candidate in candidates {
            let score = if size == 1 {
                cache.mutual_information(target, candidate[0])?
            } else {
                score_against(cache, target, &best, &candidate)?
            };
            if round_best.as_ref().is_none_or(|(top, _)| score > *top) {
                round_best = Some((score, candidate));
            }
        }

        let Some((score, candidate)) = round_best else {
            break;
        };
        size_scores.push(score);
        if score <= 0.0 {
            break;
        }
        gain += score;
        best = candidate;
    }

    best.sort_unstable();
    debug!(
        target,
        neighbors = n,
        chosen = best.len(),
        gain,
        "conditioning set"
    );

    Ok(SubsetChoice {
        members: best,
        gain,
        size_scores,
    })
}

/// Score `candidate` relative to the current best set.
fn score_against(
    cache: &mut ScoreCache<'_>,
    target: usize,
    best: &[usize],
    candidate: &[usize],
) -> Result<f64, SearchError> {
    let shared: Vec<usize> = best
        .iter()
        .copied()
        .filter(|v| candidate.contains(v))
        .collect();
    let removed: Vec<usize> = best
        .iter()
        .copied()
        .filter(|v| !candidate.contains(v))
        .collect();
    let added: Vec<usize> = candidate
        .iter()
        .copied()
        .filter(|v| !best.contains(v))
        .collect();

    let lost = incremental_gain(cache, target, &removed, &shared)?;
    let won = incremental_gain(cache, target, &added, &shared)?;
    Ok(won - lost)
}

/// `Σ_k I(target; c_k | base ∪ {c_1 … c_{k−1}})` over `added` in order.
///
/// # Errors
///
/// Propagates the first failing term.
pub fn incremental_gain(
    cache: &mut ScoreCache<'_>,
    target: usize,
    added: &[usize],
    base: &[usize],
) -> Result<f64, SearchError> {
    let mut conditioning = base.to_vec();
    let mut total = 0.0;
    for &candidate in added {
        total += cache.get_or_compute(target, candidate, &conditioning)?;
        conditioning.push(candidate);
    }
    Ok(total)
}

/// All `k`-element combinations of `items`, in lexicographic position order.
fn combinations(items: &[usize], k: usize) -> Vec<Vec<usize>> {
    let n = items.len();
    if k == 0 || k > n {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut positions: Vec<usize> = (0..k).collect();
    loop {
        result.push(positions.iter().map(|&p| items[p]).collect());

        // Rightmost position that can still advance.
        let Some(slot) = (0..k).rev().find(|&i| positions[i] < n - k + i) else {
            break;
        };
        positions[slot] += 1;
        for i in (slot + 1)..k {
            positions[i] = positions[i - 1] + 1;
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
