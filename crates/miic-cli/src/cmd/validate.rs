use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use miic_core::{EdgeCensus, MalformedInput, SearchError, find_directed_cycle};
use serde::Serialize;

use crate::io::{describe, read_adjacency};

/// Arguments for `miic validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Adjacency matrix to check (labelled CSV).
    #[arg(long)]
    pub adjacency: PathBuf,
}

#[derive(Debug, Serialize)]
struct ValidateReport<'a> {
    valid: bool,
    variables: &'a [String],
    edges: EdgeCensus,
}

/// Check an adjacency matrix the way the engine does before a run.
///
/// # Errors
///
/// Fails on the first malformed-input problem, including a directed cycle.
pub fn run_validate(args: &ValidateArgs, json: bool) -> Result<()> {
    let adj = read_adjacency(&args.adjacency)?;
    if let Some(cycle) = find_directed_cycle(&adj) {
        return Err(describe(&SearchError::from(MalformedInput::DirectedCycle(
            cycle,
        ))));
    }

    let census = adj.census();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let report = ValidateReport {
            valid: true,
            variables: adj.labels(),
            edges: census,
        };
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        writeln!(
            out,
            "ok: {} variables, {} edges ({} directed, {} undirected, {} bidirected)",
            adj.len(),
            census.total(),
            census.directed,
            census.undirected,
            census.bidirected
        )?;
    }
    Ok(())
}
