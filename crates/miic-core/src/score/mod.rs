//! Information scores: the oracle seam, the run-wide memo cache, and a
//! plug-in estimator for discrete data.

pub mod cache;
pub mod estimator;
pub mod oracle;

pub use cache::{CacheStats, ScoreCache, ScoreKey, SeedValue};
pub use estimator::{DiscreteDataset, Penalty, PluginEstimator};
pub use oracle::{InformationOracle, TableOracle};
