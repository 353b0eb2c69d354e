//! Command: show pending changes without applying them.

use anyhow::{Result, bail};

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::commands::apply::plan_all;
use crate::logging::Logger;
use crate::plugins;

/// Print the diff every enabled plugin would apply.
///
/// # Errors
///
/// Returns an error if setup fails or any plugin failed to plan.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let plugins = plugins::from_config(&setup.config.root, &setup.ctx)?;

    let mut failures = 0;
    let mut pending = 0;
    for (plugin, plan) in plugins
        .iter()
        .zip(plan_all(&plugins, &setup.ctx, global.parallel))
    {
        if plugin.disabled() {
            continue;
        }
        let plan = match plan {
            Ok(plan) => plan,
            Err(err) => {
                log.error(&format!("{}: {err:#}", plugin.name()));
                failures += 1;
                continue;
            }
        };
        for change in plan {
            pending += 1;
            println!(
                "\x1b[1m--- {} ({})\x1b[0m",
                change.target.display(),
                plugin.name()
            );
            print!("{}", change.diff);
        }
    }

    if pending == 0 && failures == 0 {
        log.info("everything up to date");
    }
    if failures > 0 {
        bail!("{failures} plugin(s) failed to plan");
    }
    Ok(())
}
