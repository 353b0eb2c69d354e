//! Command: print the fully resolved config document.

use anyhow::{Result, bail};

use super::CommandSetup;
use crate::cli::{GlobalOpts, ShowOpts};
use crate::logging::Logger;

/// Print the resolved document (or one subtree of it) as YAML, with all
/// inheritance merged away and all expressions rendered.
///
/// # Errors
///
/// Returns an error if setup fails or the requested key does not exist.
pub fn run(global: &GlobalOpts, opts: &ShowOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let node = match &opts.key {
        Some(key) => match setup.config.root.getp(key) {
            Some(node) => node,
            None => bail!("key '{key}' not found in {}", setup.config.path.display()),
        },
        None => setup.config.root,
    };
    print!("{}", node.to_value().to_yaml_string());
    Ok(())
}
