//! Command-line interface definitions, parsed with [`clap`].

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the dotdeploy configuration engine.
#[derive(Parser, Debug)]
#[command(
    name = "dotdeploy",
    about = "Declarative dotfile deployment driven by a layered config document",
    version
)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Path to the config document
    #[arg(short, long, global = true, default_value = "dotdeploy.yaml")]
    pub config: std::path::PathBuf,

    /// Deployment root for relative targets (defaults to the config's directory)
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Disable parallel planning of plugins (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy all configured plugins
    Apply(ApplyOpts),
    /// Show pending changes without applying them
    Diff,
    /// Print the fully resolved config document
    Show(ShowOpts),
    /// Generate shell completion scripts
    Completion(CompletionOpts),
    /// Print version information
    Version,
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ApplyOpts {
    /// Skip plugins by alias
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,
}

/// Options for the `show` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ShowOpts {
    /// Dotted key of the subtree to print (whole document when omitted)
    pub key: Option<String>,
}

/// Options for the `completion` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn parses_apply_with_skips() {
        let cli = Cli::try_parse_from(["dotdeploy", "apply", "--skip", "a,b"]).unwrap();
        match cli.command {
            Command::Apply(opts) => assert_eq!(opts.skip, vec!["a", "b"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli =
            Cli::try_parse_from(["dotdeploy", "diff", "--config", "c.yaml", "-d"]).unwrap();
        assert!(matches!(cli.command, Command::Diff));
        assert_eq!(cli.global.config, std::path::PathBuf::from("c.yaml"));
        assert!(cli.global.dry_run);
    }

    #[test]
    fn config_has_a_default() {
        let cli = Cli::try_parse_from(["dotdeploy", "version"]).unwrap();
        assert_eq!(
            cli.global.config,
            std::path::PathBuf::from("dotdeploy.yaml")
        );
    }

    #[test]
    fn parallel_defaults_on_and_can_be_disabled() {
        let on = Cli::try_parse_from(["dotdeploy", "diff"]).unwrap();
        assert!(on.global.parallel);
        let off = Cli::try_parse_from(["dotdeploy", "diff", "--no-parallel"]).unwrap();
        assert!(!off.global.parallel);
    }

    #[test]
    fn show_takes_an_optional_key() {
        let cli = Cli::try_parse_from(["dotdeploy", "show", "app.name"]).unwrap();
        match cli.command {
            Command::Show(opts) => assert_eq!(opts.key.as_deref(), Some("app.name")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["dotdeploy", "explode"]).is_err());
    }
}
