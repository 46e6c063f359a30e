use std::io::Write;

use anyhow::Result;
use clap::Args;
use clap_complete::{Shell, generate};

/// Arguments for `miic completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to `out`, using the command's
/// own binary name.
///
/// # Errors
///
/// Returns an error if flushing `out` fails.
pub fn run_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) -> Result<()> {
    let bin = command.get_name().to_string();
    generate(shell, command, bin, out);
    out.flush()?;
    Ok(())
}
