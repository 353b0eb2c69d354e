//! Command: generate shell completion scripts.

use clap::CommandFactory as _;

use crate::cli::{Cli, CompletionOpts};

/// Write the completion script for the requested shell to stdout.
pub fn run(opts: &CompletionOpts) {
    let mut command = Cli::command();
    clap_complete::generate(opts.shell, &mut command, "dotdeploy", &mut std::io::stdout());
}
