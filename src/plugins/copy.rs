//! Copy plugin: mirror a file or directory tree into place.

use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};

use super::{Change, Plugin, PluginSpec, read_optional};
use crate::context::Context;
use crate::resources::{diff, fs};

/// Copies a source file, or every non-ignored file under a source directory,
/// to the target path.
///
/// Ignore patterns come from the plugin's `ignored-paths` declarations and
/// those of every enclosing scope, matched against the slash-separated path
/// relative to the source directory.
#[derive(Debug)]
pub struct CopyPlugin {
    spec: PluginSpec,
    ignored: Vec<Regex>,
}

impl CopyPlugin {
    pub(crate) fn new(spec: PluginSpec) -> Self {
        let ignored = spec.node.ignored_paths();
        Self { spec, ignored }
    }

    /// The (source, target) file pairs this plugin manages.
    fn pairs(&self) -> Result<Vec<(PathBuf, PathBuf)>> {
        if self.spec.source.is_dir() {
            let files = fs::walk_files(&self.spec.source, &self.ignored)?;
            Ok(files
                .into_iter()
                .map(|rel| (self.spec.source.join(&rel), self.spec.target.join(&rel)))
                .collect())
        } else {
            Ok(vec![(self.spec.source.clone(), self.spec.target.clone())])
        }
    }
}

impl Plugin for CopyPlugin {
    fn name(&self) -> &str {
        &self.spec.alias
    }

    fn disabled(&self) -> bool {
        self.spec.disabled
    }

    fn plan(&self, _ctx: &Context) -> Result<Vec<Change>> {
        let mut changes = Vec::new();
        for (source, target) in self.pairs()? {
            if fs::files_identical(&source, &target)? {
                continue;
            }
            changes.push(Change {
                diff: pair_diff(&source, &target)?,
                target,
            });
        }
        Ok(changes)
    }

    fn apply(&self, ctx: &Context) -> Result<usize> {
        let mut written = 0;
        for change in self.plan(ctx)? {
            let source = if self.spec.source.is_dir() {
                let rel = change
                    .target
                    .strip_prefix(&self.spec.target)
                    .unwrap_or(&change.target);
                self.spec.source.join(rel)
            } else {
                self.spec.source.clone()
            };
            fs::backup_file(&change.target)?;
            fs::copy_file(&source, &change.target)?;
            written += 1;
        }
        Ok(written)
    }
}

/// Render the diff for one source/target pair. Non-UTF-8 content degrades to
/// a one-line description.
fn pair_diff(source: &Path, target: &Path) -> Result<String> {
    let desired = match read_optional(source) {
        Ok(text) => text,
        Err(err) if is_not_text(&err) => None,
        Err(err) => return Err(err.into()),
    };
    let current = match read_optional(target) {
        Ok(text) => text,
        Err(err) if is_not_text(&err) => None,
        Err(err) => return Err(err.into()),
    };
    match desired {
        Some(desired) => {
            Ok(diff::render_new(current.as_deref(), &desired).unwrap_or_default())
        }
        None => Ok(format!("binary file {}\n", source.display())),
    }
}

fn is_not_text(err: &crate::error::PluginError) -> bool {
    matches!(
        err,
        crate::error::PluginError::Io { source, .. }
            if source.kind() == std::io::ErrorKind::InvalidData
    )
}
