//! Deployment plugins: the units of work a config document describes.
//!
//! The top-level `plugins` key holds a list of entries, each a single-key
//! mapping naming the plugin kind and its settings:
//!
//! ```yaml
//! plugins:
//!   - copy:
//!       source: files/bash
//!       target: ~/
//!   - symlink:
//!       source: files/vimrc
//!       target: ~/.vimrc
//!   - generate:
//!       source: templates/gitconfig
//!       target: ~/.gitconfig
//! ```
//!
//! Every plugin follows the same check-then-apply shape: [`Plugin::plan`]
//! computes the pending changes without touching anything, and
//! [`Plugin::apply`] backs up and rewrites only what `plan` reported.

pub mod copy;
pub mod generate;
pub mod symlink;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::tree::ConfigNode;
use crate::context::Context;
use crate::error::PluginError;

/// A pending change to one deployed file.
#[derive(Debug, Clone)]
pub struct Change {
    /// The file that would be written.
    pub target: PathBuf,
    /// Rendered line diff (or a short description for non-text changes).
    pub diff: String,
}

/// A configured unit of deployment work.
pub trait Plugin: Send + Sync + std::fmt::Debug {
    /// Display name for logs and the run summary.
    fn name(&self) -> &str;

    /// Whether this plugin was disabled in the config.
    fn disabled(&self) -> bool;

    /// Compute the changes needed to bring the target up to date. An empty
    /// plan means the target already matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreadable or a template fails to
    /// render.
    fn plan(&self, ctx: &Context) -> Result<Vec<Change>>;

    /// Back up and rewrite everything [`Plugin::plan`] reported. Returns the
    /// number of files written.
    ///
    /// # Errors
    ///
    /// Returns an error if any backup or write fails.
    fn apply(&self, ctx: &Context) -> Result<usize>;
}

/// Settings shared by every plugin kind, read from its config node.
#[derive(Debug, Clone)]
pub(crate) struct PluginSpec {
    pub alias: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub disabled: bool,
    pub node: Arc<ConfigNode>,
}

impl PluginSpec {
    fn from_node(kind: &str, node: &Arc<ConfigNode>, ctx: &Context) -> Result<Self, PluginError> {
        let invalid = |message: String| PluginError::InvalidSpec(message);

        let source_rel = required_str(kind, node, "source")?;
        let source = ctx.config_dir.join(&source_rel);
        if !source.exists() {
            return Err(PluginError::MissingSource(source.display().to_string()));
        }

        let target_raw = required_str(kind, node, "target")?;
        let mut target = ctx.expand_home(&target_raw);
        if target.is_relative() {
            target = ctx.root.join(target);
        }

        let alias = match node.get("alias") {
            Some(alias_node) => alias_node
                .as_str()
                .map_err(|err| invalid(format!("{kind}.alias: {err}")))?
                .to_string(),
            None => format!("{kind} {target_raw}"),
        };

        let disabled = match node.get("disabled") {
            Some(flag) => flag
                .as_bool()
                .map_err(|err| invalid(format!("{kind}.disabled: {err}")))?,
            None => false,
        };

        Ok(Self {
            alias,
            source,
            target,
            disabled,
            node: Arc::clone(node),
        })
    }
}

fn required_str(
    kind: &str,
    node: &Arc<ConfigNode>,
    key: &str,
) -> Result<String, PluginError> {
    let child = node
        .get(key)
        .ok_or_else(|| PluginError::InvalidSpec(format!("{kind} entry is missing '{key}'")))?;
    child
        .as_str()
        .map(String::from)
        .map_err(|err| PluginError::InvalidSpec(format!("{kind}.{key}: {err}")))
}

/// Build the plugin list from a resolved config tree. A document without a
/// `plugins` key yields an empty list.
///
/// # Errors
///
/// Returns an error if an entry has an unexpected shape, names an unknown
/// plugin kind, or references a missing source path.
pub fn from_config(root: &Arc<ConfigNode>, ctx: &Context) -> Result<Vec<Box<dyn Plugin>>> {
    let Some(entries) = root.get("plugins") else {
        return Ok(Vec::new());
    };

    let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();
    for entry in entries.as_list()? {
        let fields = entry.as_dict()?;
        let mut kinds = fields.iter();
        let (kind, node) = kinds.next().ok_or_else(|| {
            PluginError::InvalidSpec("plugin entry must name exactly one kind".to_string())
        })?;
        if let Some((extra, _)) = kinds.next() {
            return Err(PluginError::InvalidSpec(format!(
                "plugin entry names both '{kind}' and '{extra}'"
            ))
            .into());
        }

        let spec = PluginSpec::from_node(kind, node, ctx)?;
        let plugin: Box<dyn Plugin> = match kind.as_str() {
            "copy" => Box::new(copy::CopyPlugin::new(spec)),
            "symlink" => Box::new(symlink::SymlinkPlugin::new(spec)),
            "generate" => Box::new(generate::GeneratePlugin::new(spec)),
            other => return Err(PluginError::Unknown(other.to_string()).into()),
        };
        plugins.push(plugin);
    }
    Ok(plugins)
}

/// Read a file as text, mapping a missing file to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, PluginError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PluginError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}
