//! Symlink plugin: keep the target pointing at the source.

use anyhow::{Context as _, Result};
use std::path::Path;

use super::{Change, Plugin, PluginSpec};
use crate::context::Context;
use crate::resources::fs;

/// Creates or corrects a symlink at the target path.
///
/// A regular file already at the target is backed up before being replaced;
/// a symlink pointing elsewhere is replaced outright.
#[derive(Debug)]
pub struct SymlinkPlugin {
    spec: PluginSpec,
}

impl SymlinkPlugin {
    pub(crate) const fn new(spec: PluginSpec) -> Self {
        Self { spec }
    }

    /// Whether the target is already a symlink to the source.
    fn is_current(&self) -> bool {
        std::fs::read_link(&self.spec.target)
            .is_ok_and(|existing| existing == self.spec.source)
    }
}

impl Plugin for SymlinkPlugin {
    fn name(&self) -> &str {
        &self.spec.alias
    }

    fn disabled(&self) -> bool {
        self.spec.disabled
    }

    fn plan(&self, _ctx: &Context) -> Result<Vec<Change>> {
        if self.is_current() {
            return Ok(Vec::new());
        }
        let state = std::fs::read_link(&self.spec.target).map_or_else(
            |_| {
                if self.spec.target.exists() {
                    "replaces regular file"
                } else {
                    "new link"
                }
            },
            |_| "repoints existing link",
        );
        Ok(vec![Change {
            target: self.spec.target.clone(),
            diff: format!(
                "{} -> {} ({state})\n",
                self.spec.target.display(),
                self.spec.source.display()
            ),
        }])
    }

    fn apply(&self, ctx: &Context) -> Result<usize> {
        if self.plan(ctx)?.is_empty() {
            return Ok(0);
        }
        let target = &self.spec.target;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        fs::backup_file(target)?;
        if target.symlink_metadata().is_ok() {
            remove_existing(target)
                .with_context(|| format!("removing existing {}", target.display()))?;
        }
        create_symlink(&self.spec.source, target).with_context(|| {
            format!(
                "linking {} -> {}",
                target.display(),
                self.spec.source.display()
            )
        })?;
        Ok(1)
    }
}

/// Remove whatever currently occupies the target path (file, link, or
/// directory symlink).
fn remove_existing(target: &Path) -> std::io::Result<()> {
    if target.is_dir() && !target.symlink_metadata()?.is_symlink() {
        return Err(std::io::Error::other("target is a real directory"));
    }
    std::fs::remove_file(target)
}

#[cfg(unix)]
fn create_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn create_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}
