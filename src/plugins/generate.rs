//! Generate plugin: render a template file into place.

use anyhow::{Context as _, Result};

use super::{Change, Plugin, PluginSpec, read_optional};
use crate::config::eval::{self, Scope};
use crate::context::Context;
use crate::error::PluginError;
use crate::resources::{diff, fs};

/// Renders a template file, expanding `{{ expr }}` spans against the config
/// tree, and writes the result to the target path.
///
/// Expressions resolve with `cfg` bound to this plugin's own config node, so
/// a template can read keys declared next to it (`{{ cfg.get('user') }}`)
/// and falls back through enclosing scopes for anything else.
#[derive(Debug)]
pub struct GeneratePlugin {
    spec: PluginSpec,
}

impl GeneratePlugin {
    pub(crate) const fn new(spec: PluginSpec) -> Self {
        Self { spec }
    }

    fn render(&self, ctx: &Context) -> Result<String> {
        let template = read_optional(&self.spec.source)?.ok_or_else(|| {
            PluginError::MissingSource(self.spec.source.display().to_string())
        })?;
        let scope = Scope::with_cfg(ctx, &self.spec.node);
        eval::render_str(&template, &scope).with_context(|| {
            format!("rendering template {}", self.spec.source.display())
        })
    }
}

impl Plugin for GeneratePlugin {
    fn name(&self) -> &str {
        &self.spec.alias
    }

    fn disabled(&self) -> bool {
        self.spec.disabled
    }

    fn plan(&self, ctx: &Context) -> Result<Vec<Change>> {
        let desired = self.render(ctx)?;
        let current = read_optional(&self.spec.target)?;
        Ok(diff::render_new(current.as_deref(), &desired)
            .map(|rendered| Change {
                target: self.spec.target.clone(),
                diff: rendered,
            })
            .into_iter()
            .collect())
    }

    fn apply(&self, ctx: &Context) -> Result<usize> {
        let desired = self.render(ctx)?;
        if read_optional(&self.spec.target)?.as_deref() == Some(desired.as_str()) {
            return Ok(0);
        }
        let target = &self.spec.target;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        fs::backup_file(target)?;
        std::fs::write(target, desired)
            .with_context(|| format!("writing {}", target.display()))?;
        Ok(1)
    }
}
