use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SearchError;

/// Name of the project-local configuration file.
pub const CONFIG_FILE_NAME: &str = "miic.toml";

/// Top-level layout of `miic.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub search: SearchConfig,
}

/// Tuning knobs for both search steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Full subset enumeration is used only while both the subset size and
    /// the neighborhood size are at most this value; beyond it the
    /// conditioning-set search only extends the current best set by one
    /// neighbor at a time.
    #[serde(default = "default_exhaustive_limit")]
    pub exhaustive_limit: usize,
    /// Ceiling on Step-1 sweeps.
    #[serde(default = "default_max_prune_sweeps")]
    pub max_prune_sweeps: usize,
    /// Ceiling on accepted Step-2 moves.
    #[serde(default = "default_max_orientation_moves")]
    pub max_orientation_moves: usize,
    /// Fail with `NonConvergence` instead of returning the structure reached
    /// when a ceiling is hit.
    #[serde(default)]
    pub strict_convergence: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exhaustive_limit: default_exhaustive_limit(),
            max_prune_sweeps: default_max_prune_sweeps(),
            max_orientation_moves: default_max_orientation_moves(),
            strict_convergence: false,
        }
    }
}

impl SearchConfig {
    /// Reject settings that would make a search step meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.exhaustive_limit == 0 {
            return Err(SearchError::Config(
                "search.exhaustive_limit must be at least 1".into(),
            ));
        }
        if self.max_prune_sweeps == 0 {
            return Err(SearchError::Config(
                "search.max_prune_sweeps must be at least 1".into(),
            ));
        }
        if self.max_orientation_moves == 0 {
            return Err(SearchError::Config(
                "search.max_orientation_moves must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

const fn default_exhaustive_limit() -> usize {
    4
}

const fn default_max_prune_sweeps() -> usize {
    100
}

const fn default_max_orientation_moves() -> usize {
    10_000
}

/// Parse a configuration file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not valid TOML for [`FileConfig`].
pub fn load_config_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<FileConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Location of the per-user configuration file, if the platform has one.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("miic").join("config.toml"))
}

/// Resolve the effective search configuration.
///
/// Order: the explicit path (must exist), then `miic.toml` in `project_root`,
/// then the user configuration file, then defaults. The result is validated.
///
/// # Errors
///
/// Fails if an explicit path is missing, any chosen file cannot be parsed,
/// or the resulting configuration does not validate.
pub fn resolve_config(explicit: Option<&Path>, project_root: &Path) -> Result<SearchConfig> {
    let file = if let Some(path) = explicit {
        load_config_file(path)?
    } else {
        let local = project_root.join(CONFIG_FILE_NAME);
        if local.exists() {
            load_config_file(&local)?
        } else {
            match user_config_path() {
                Some(user) if user.exists() => load_config_file(&user)?,
                _ => FileConfig::default(),
            }
        }
    };

    file.search.validate()?;
    Ok(file.search)
}
