#![forbid(unsafe_code)]

mod cmd;
mod io;

use std::env;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "miic",
    author,
    version,
    about = "miic: search-and-score discovery of ancestral causal graphs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit a JSON report instead of plain output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refine a seed structure against a dataset and print the result.
    Run(cmd::run::RunArgs),

    /// Check an adjacency matrix for malformed input.
    Validate(cmd::validate::ValidateArgs),

    /// Generate shell completions.
    Completions(cmd::completions::CompletionsArgs),
}

/// Install the stderr subscriber.
///
/// `MIIC_LOG` overrides the filter; `MIIC_LOG_FORMAT=json` switches to JSON
/// lines.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MIIC_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "miic=debug,miic_core=debug,info"
        } else {
            "miic=info,miic_core=info,warn"
        })
    });

    let format = env::var("MIIC_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(command = ?cli.command, "starting");

    let project_root = env::current_dir()?;

    match cli.command {
        Commands::Run(ref args) => cmd::run::run_run(args, cli.json, &project_root),
        Commands::Validate(ref args) => cmd::validate::run_validate(args, cli.json),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command, &mut std::io::stdout())
        }
    }
}
