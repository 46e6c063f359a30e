//! Plug-in information estimates on discrete data.
//!
//! # Overview
//!
//! [`PluginEstimator`] is a ready-to-use [`InformationOracle`] for categorical
//! datasets. It counts joint configurations and evaluates
//!
//! ```text
//! I(X;Y|Z) = H(X,Z) + H(Y,Z) − H(X,Y,Z) − H(Z)
//! ```
//!
//! in nats. With [`Penalty::Mdl`] it subtracts the complexity term
//!
//! ```text
//! (rX − 1)(rY − 1) · Π rZ · ln(N) / (2N)
//! ```
//!
//! where `r` is the number of observed levels of a variable and `N` the
//! number of rows. The penalty makes the score of a variable that adds no
//! information negative, which is what lets Step 1 prune edges.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Result, bail};

use super::oracle::InformationOracle;

/// Column-major, label-encoded categorical data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteDataset {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<Vec<u32>>,
    levels: Vec<u32>,
    rows: usize,
}

impl DiscreteDataset {
    /// Encode string records. Each column's distinct values are sorted and
    /// numbered from zero; empty cells and `NA` are ordinary levels.
    ///
    /// # Errors
    ///
    /// Fails on an empty or duplicated header label, or a row whose width
    /// differs from the header.
    pub fn from_records(header: Vec<String>, records: &[Vec<String>]) -> Result<Self> {
        let width = header.len();
        if width == 0 {
            bail!("dataset has no columns");
        }

        let mut index = HashMap::with_capacity(width);
        for (i, label) in header.iter().enumerate() {
            if label.trim().is_empty() {
                bail!("column {i} has an empty header");
            }
            if index.insert(label.clone(), i).is_some() {
                bail!("duplicate column '{label}'");
            }
        }

        for (row, record) in records.iter().enumerate() {
            if record.len() != width {
                bail!(
                    "row {} has {} fields, expected {width}",
                    row + 1,
                    record.len()
                );
            }
        }

        let mut columns = Vec::with_capacity(width);
        let mut levels = Vec::with_capacity(width);
        for col in 0..width {
            let distinct: BTreeSet<&str> = records.iter().map(|r| r[col].as_str()).collect();
            let codes: HashMap<&str, u32> = distinct
                .iter()
                .enumerate()
                .map(|(code, value)| (*value, u32::try_from(code).unwrap_or(u32::MAX)))
                .collect();
            columns.push(records.iter().map(|r| codes[r[col].as_str()]).collect());
            levels.push(u32::try_from(distinct.len()).unwrap_or(u32::MAX));
        }

        Ok(Self {
            labels: header,
            index,
            columns,
            levels,
            rows: records.len(),
        })
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of observed levels of a column.
    #[must_use]
    pub fn levels(&self, label: &str) -> Option<u32> {
        self.index.get(label).map(|&i| self.levels[i])
    }

    fn column(&self, label: &str) -> Result<usize> {
        match self.index.get(label) {
            Some(&i) => Ok(i),
            None => bail!("unknown column '{label}'"),
        }
    }

    /// Empirical joint entropy of `cols`, in nats. Zero for an empty set.
    fn entropy(&self, cols: &[usize]) -> f64 {
        if cols.is_empty() || self.rows == 0 {
            return 0.0;
        }

        let mut counts: HashMap<Vec<u32>, usize> = HashMap::new();
        for row in 0..self.rows {
            let config: Vec<u32> = cols.iter().map(|&c| self.columns[c][row]).collect();
            *counts.entry(config).or_insert(0) += 1;
        }

        let n = self.rows as f64;
        let sum_c_ln_c: f64 = counts
            .values()
            .map(|&c| {
                let c = c as f64;
                c * c.ln()
            })
            .sum();
        n.ln() - sum_c_ln_c / n
    }
}

/// Complexity correction applied to raw plug-in estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Penalty {
    /// Raw plug-in estimate (never negative).
    None,
    /// Subtract the MDL / BIC-style parameter cost.
    #[default]
    Mdl,
}

/// [`InformationOracle`] over a [`DiscreteDataset`].
#[derive(Debug, Clone)]
pub struct PluginEstimator {
    data: DiscreteDataset,
    penalty: Penalty,
}

impl PluginEstimator {
    #[must_use]
    pub const fn new(data: DiscreteDataset, penalty: Penalty) -> Self {
        Self { data, penalty }
    }

    #[must_use]
    pub const fn dataset(&self) -> &DiscreteDataset {
        &self.data
    }

    fn complexity(&self, x: usize, y: usize, conditioning: &[usize]) -> f64 {
        let n = self.data.rows as f64;
        let rx = f64::from(self.data.levels[x].saturating_sub(1));
        let ry = f64::from(self.data.levels[y].saturating_sub(1));
        let rz: f64 = conditioning
            .iter()
            .map(|&z| f64::from(self.data.levels[z]))
            .product();
        rx * ry * rz * n.ln() / (2.0 * n)
    }
}

impl InformationOracle for PluginEstimator {
    fn mutual_information(&self, x: &str, y: &str, conditioning: &[&str]) -> Result<f64> {
        if self.data.rows == 0 {
            bail!("dataset has no rows");
        }
        let xi = self.data.column(x)?;
        let yi = self.data.column(y)?;
        let zs = conditioning
            .iter()
            .map(|z| self.data.column(z))
            .collect::<Result<Vec<_>>>()?;

        let with = |extra: &[usize]| -> Vec<usize> {
            let mut cols = zs.clone();
            cols.extend_from_slice(extra);
            cols
        };

        let raw = self.data.entropy(&with(&[xi])) + self.data.entropy(&with(&[yi]))
            - self.data.entropy(&with(&[xi, yi]))
            - self.data.entropy(&zs);
        // Rounding can push an independent pair slightly below zero.
        let raw = raw.max(0.0);

        Ok(match self.penalty {
            Penalty::None => raw,
            Penalty::Mdl => raw - self.complexity(xi, yi, &zs),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(header: &[&str], rows: &[&[&str]]) -> DiscreteDataset {
        DiscreteDataset::from_records(
            header.iter().map(|s| (*s).to_string()).collect(),
            &rows
                .iter()
                .map(|r| r.iter().map(|s| (*s).to_string()).collect())
                .collect::<Vec<_>>(),
        )
        .expect("valid dataset")
    }

    #[test]
    fn label_encoding_counts_levels() {
        let data = dataset(&["A", "B"], &[&["x", "1"], &["y", "1"], &["x", "NA"]]);
        assert_eq!(data.rows(), 3);
        assert_eq!(data.levels("A"), Some(2));
        assert_eq!(data.levels("B"), Some(2));
        assert_eq!(data.levels("C"), None);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = DiscreteDataset::from_records(
            vec!["A".into(), "B".into()],
            &[vec!["1".into()]],
        )
        .expect_err("ragged");
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn identical_columns_share_their_entropy() {
        // Uniform binary copy: I(A;B) = ln 2.
        let data = dataset(
            &["A", "B"],
            &[&["0", "0"], &["1", "1"], &["0", "0"], &["1", "1"]],
        );
        let estimator = PluginEstimator::new(data, Penalty::None);
        let mi = estimator.mutual_information("A", "B", &[]).expect("mi");
        assert!((mi - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn independent_columns_score_negative_with_penalty() {
        let data = dataset(
            &["A", "B"],
            &[&["0", "0"], &["0", "1"], &["1", "0"], &["1", "1"]],
        );
        let raw = PluginEstimator::new(data.clone(), Penalty::None);
        assert!(raw.mutual_information("A", "B", &[]).expect("mi").abs() < 1e-12);

        let penalized = PluginEstimator::new(data, Penalty::Mdl);
        assert!(penalized.mutual_information("A", "B", &[]).expect("mi") < 0.0);
    }

    #[test]
    fn conditioning_on_the_common_cause_removes_dependence() {
        // B and C are both copies of A.
        let data = dataset(
            &["A", "B", "C"],
            &[&["0", "0", "0"], &["1", "1", "1"], &["0", "0", "0"], &["1", "1", "1"]],
        );
        let estimator = PluginEstimator::new(data, Penalty::None);
        let marginal = estimator.mutual_information("B", "C", &[]).expect("mi");
        let conditional = estimator.mutual_information("B", "C", &["A"]).expect("cmi");
        assert!(marginal > 0.5);
        assert!(conditional.abs() < 1e-12);
    }

    #[test]
    fn unknown_columns_and_empty_data_fail() {
        let data = dataset(&["A", "B"], &[&["0", "1"]]);
        let estimator = PluginEstimator::new(data, Penalty::Mdl);
        assert!(estimator.mutual_information("A", "Z", &[]).is_err());

        let empty = DiscreteDataset::from_records(vec!["A".into(), "B".into()], &[])
            .expect("header only");
        let estimator = PluginEstimator::new(empty, Penalty::Mdl);
        assert!(estimator.mutual_information("A", "B", &[]).is_err());
    }
}
