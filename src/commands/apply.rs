//! Command: deploy all configured plugins.

use anyhow::{Result, bail};

use super::CommandSetup;
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::logging::{Logger, TaskStatus};
use crate::plugins::{self, Change, Plugin};

/// Plan every enabled plugin, then apply the pending changes in order.
///
/// Planning is read-only and runs in parallel unless `--no-parallel` was
/// given; application is sequential so output and backups stay deterministic.
///
/// # Errors
///
/// Returns an error if setup fails or any plugin failed to plan or apply.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let plugins = plugins::from_config(&setup.config.root, &setup.ctx)?;
    if plugins.is_empty() {
        log.info("no plugins configured");
        return Ok(());
    }

    log.stage("Planning");
    let plans = plan_all(&plugins, &setup.ctx, global.parallel);

    log.stage(if global.dry_run { "Previewing" } else { "Applying" });
    for (plugin, plan) in plugins.iter().zip(plans) {
        let name = plugin.name();
        if plugin.disabled() {
            log.debug(&format!("{name}: disabled"));
            log.record_task(name, TaskStatus::Skipped, Some("disabled"));
            continue;
        }
        if opts.skip.iter().any(|skip| skip == name) {
            log.debug(&format!("{name}: skipped by flag"));
            log.record_task(name, TaskStatus::Skipped, Some("--skip"));
            continue;
        }
        let plan = match plan {
            Ok(plan) => plan,
            Err(err) => {
                log.error(&format!("{name}: {err:#}"));
                log.record_task(name, TaskStatus::Failed, Some(&format!("{err:#}")));
                continue;
            }
        };
        if plan.is_empty() {
            log.record_task(name, TaskStatus::UpToDate, None);
            continue;
        }
        if global.dry_run {
            for change in &plan {
                log.dry_run(&format!("{name}: would write {}", change.target.display()));
            }
            log.record_task(name, TaskStatus::DryRun, Some(&count(plan.len())));
            continue;
        }
        match plugin.apply(&setup.ctx) {
            Ok(written) => {
                log.info(&format!("{name}: wrote {}", count(written)));
                log.record_task(name, TaskStatus::Ok, Some(&count(written)));
            }
            Err(err) => {
                log.error(&format!("{name}: {err:#}"));
                log.record_task(name, TaskStatus::Failed, Some(&format!("{err:#}")));
            }
        }
    }

    log.print_summary();
    if log.has_failures() {
        bail!("one or more plugins failed");
    }
    Ok(())
}

/// Plan all plugins, preserving their config order.
pub(crate) fn plan_all(
    plugins: &[Box<dyn Plugin>],
    ctx: &crate::context::Context,
    parallel: bool,
) -> Vec<Result<Vec<Change>>> {
    if parallel {
        use rayon::prelude::*;
        plugins.par_iter().map(|plugin| plugin.plan(ctx)).collect()
    } else {
        plugins.iter().map(|plugin| plugin.plan(ctx)).collect()
    }
}

fn count(files: usize) -> String {
    if files == 1 {
        "1 file".to_string()
    } else {
        format!("{files} files")
    }
}
