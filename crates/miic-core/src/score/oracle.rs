//! The information oracle seam.
//!
//! The engine never looks at data. Every number it consumes comes from an
//! [`InformationOracle`]: given two variables and a conditioning set (all by
//! name) it returns the (conditional) mutual information, possibly already
//! reduced by a complexity penalty so that irrelevant variables score `<= 0`.

use std::collections::HashMap;

use anyhow::{Result, anyhow};

/// Source of (conditional) mutual information values.
///
/// Implementations must accept an empty conditioning set (plain mutual
/// information). They may fail; the engine decides per call site whether a
/// failure is absorbed or propagated.
pub trait InformationOracle {
    /// `I(x; y | conditioning)`.
    ///
    /// # Errors
    ///
    /// Implementation-defined: unknown variables, degenerate data, and so on.
    fn mutual_information(&self, x: &str, y: &str, conditioning: &[&str]) -> Result<f64>;
}

impl<F> InformationOracle for F
where
    F: Fn(&str, &str, &[&str]) -> Result<f64>,
{
    fn mutual_information(&self, x: &str, y: &str, conditioning: &[&str]) -> Result<f64> {
        self(x, y, conditioning)
    }
}

/// Canonical name-level key: sorted pair, sorted and deduplicated
/// conditioning set.
type NameKey = ((String, String), Vec<String>);

fn name_key(x: &str, y: &str, conditioning: &[&str]) -> NameKey {
    let pair = if x <= y {
        (x.to_string(), y.to_string())
    } else {
        (y.to_string(), x.to_string())
    };
    let mut cond: Vec<String> = conditioning.iter().map(|s| (*s).to_string()).collect();
    cond.sort_unstable();
    cond.dedup();
    (pair, cond)
}

/// An oracle answering from a table of precomputed values.
///
/// Lookups are order-insensitive in both the pair and the conditioning set.
/// Keys missing from the table resolve to the fallback value when one is
/// set, and fail otherwise.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    values: HashMap<NameKey, f64>,
    fallback: Option<f64>,
}

impl TableOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `value` for every key not present in the table.
    #[must_use]
    pub const fn with_fallback(mut self, value: f64) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Record `I(x; y | conditioning) = value`, replacing any earlier entry.
    pub fn insert(&mut self, x: &str, y: &str, conditioning: &[&str], value: f64) {
        self.values.insert(name_key(x, y, conditioning), value);
    }

    /// Builder form of [`TableOracle::insert`].
    #[must_use]
    pub fn with(mut self, x: &str, y: &str, conditioning: &[&str], value: f64) -> Self {
        self.insert(x, y, conditioning, value);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl InformationOracle for TableOracle {
    fn mutual_information(&self, x: &str, y: &str, conditioning: &[&str]) -> Result<f64> {
        let key = name_key(x, y, conditioning);
        self.values
            .get(&key)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| anyhow!("no value for ({x}, {y}) given {:?}", key.1))
    }
}
