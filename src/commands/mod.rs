//! Top-level subcommand orchestration and shared command setup.

pub mod apply;
pub mod completion;
pub mod diff;
pub mod show;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::context::Context;
use crate::logging::Logger;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates context probing and config resolution so that each command
/// does not repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Probed machine and invocation context.
    pub ctx: Context,
    /// The fully resolved configuration document.
    pub config: Config,
}

impl CommandSetup {
    /// Probe the environment and load the fully resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed, or
    /// resolved.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let ctx = Context::new(&global.config, global.root.as_deref(), global.dry_run)?;

        log.stage("Loading configuration");
        log.debug(&format!("config: {}", ctx.config_path.display()));
        log.debug(&format!("root: {}", ctx.root.display()));
        let config = Config::load(&ctx)?;

        Ok(Self { ctx, config })
    }
}
