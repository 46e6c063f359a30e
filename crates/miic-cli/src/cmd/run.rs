use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use miic_core::{
    AdjacencyMatrix, CacheStats, DiscreteDataset, EdgeCensus, GraphEngine, OrientReport, Penalty,
    PluginEstimator, PruneReport, SearchError, SearchOutcome, resolve_config,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::io::{describe, read_adjacency, read_csv, read_seed_values, write_adjacency};

/// Arguments for `miic run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Discrete dataset (CSV with a header row of variable names).
    #[arg(long)]
    pub data: PathBuf,

    /// Seed adjacency matrix (labelled CSV). Defaults to a complete
    /// undirected graph over the data columns.
    #[arg(long)]
    pub adjacency: Option<PathBuf>,

    /// Precomputed information values (JSON array) to pre-fill the cache.
    #[arg(long)]
    pub seed_values: Option<PathBuf>,

    /// Configuration file. Defaults to ./miic.toml, then the user config.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the final adjacency matrix here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use raw plug-in estimates without the complexity penalty.
    #[arg(long)]
    pub no_penalty: bool,
}

/// JSON report printed by `miic run --json`.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    variables: &'a [String],
    adjacency: Vec<Vec<i8>>,
    edges: EdgeCensus,
    converged: bool,
    step1: PruneReport,
    step2: OrientReport,
    cache: CacheStats,
}

impl<'a> RunReport<'a> {
    fn new(outcome: &'a SearchOutcome) -> Self {
        Self {
            variables: outcome.adjacency.labels(),
            adjacency: outcome.adjacency.to_codes(),
            edges: outcome.census(),
            converged: outcome.converged(),
            step1: outcome.step1,
            step2: outcome.step2,
            cache: outcome.cache,
        }
    }
}

/// Load inputs, run the engine and emit the result.
///
/// # Errors
///
/// Fails on unreadable or malformed inputs, seed variables missing from the
/// data, and any engine error.
#[instrument(skip_all, fields(data = %args.data.display()))]
pub fn run_run(args: &RunArgs, json: bool, project_root: &Path) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), project_root)?;

    let (header, records) = read_csv(&args.data)?;
    let data = DiscreteDataset::from_records(header, &records)
        .with_context(|| format!("Invalid dataset {}", args.data.display()))?;
    info!(
        variables = data.labels().len(),
        rows = data.rows(),
        "dataset loaded"
    );

    let seed = match &args.adjacency {
        Some(path) => read_adjacency(path)?,
        None => AdjacencyMatrix::complete(data.labels().to_vec())
            .map_err(|err| describe(&SearchError::from(err)))?,
    };
    if let Some(missing) = seed
        .labels()
        .iter()
        .find(|label| data.levels(label).is_none())
    {
        bail!("variable '{missing}' of the adjacency matrix is not a data column");
    }

    let seed_values = match &args.seed_values {
        Some(path) => read_seed_values(path)?,
        None => Vec::new(),
    };

    let penalty = if args.no_penalty {
        Penalty::None
    } else {
        Penalty::Mdl
    };
    let estimator = PluginEstimator::new(data, penalty);

    let outcome = GraphEngine::new(config)
        .run(&seed, &estimator, &seed_values)
        .map_err(|err| describe(&err))?;

    if let Some(path) = &args.output {
        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_adjacency(&outcome.adjacency, &mut file)?;
        info!(path = %path.display(), "adjacency written");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &RunReport::new(&outcome))?;
        writeln!(out)?;
    } else if args.output.is_none() {
        write_adjacency(&outcome.adjacency, &mut out)?;
    }

    Ok(())
}
