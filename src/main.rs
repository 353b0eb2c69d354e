//! Binary entry point for the `dotdeploy` CLI.

use anyhow::Result;
use clap::Parser;

use dotdeploy::cli::{self, Cli};
use dotdeploy::commands;
use dotdeploy::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let command_name = match args.command {
        cli::Command::Apply(_) => "apply",
        cli::Command::Diff => "diff",
        cli::Command::Show(_) => "show",
        cli::Command::Completion(_) => "completion",
        cli::Command::Version => "version",
    };
    logging::init_subscriber(args.verbose, command_name);
    let log = Logger::new(command_name);

    match args.command {
        cli::Command::Apply(ref opts) => commands::apply::run(&args.global, opts, &log),
        cli::Command::Diff => commands::diff::run(&args.global, &log),
        cli::Command::Show(ref opts) => commands::show::run(&args.global, opts, &log),
        cli::Command::Completion(ref opts) => {
            commands::completion::run(opts);
            Ok(())
        }
        cli::Command::Version => {
            let version = option_env!("DOTDEPLOY_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("dotdeploy {version}");
            Ok(())
        }
    }
}
