//! Configuration model: parsing, merging, inheritance resolution, and the
//! navigable tree.
//!
//! A configuration file moves through a fixed pipeline:
//!
//! 1. **Parse** — YAML (or JSON) into a [`Value`](value::Value).
//! 2. **Directive expansion** — whole-string `(( ... ))` expressions are
//!    evaluated before any structural work, so directives can splice entire
//!    subtrees (see [`eval::expand_directives`]).
//! 3. **Normalization** — bare sequences are rewritten into the canonical
//!    `{list: [...]}` wrapper form (see [`normalize::normalize`]).
//! 4. **Resolution** — `from` inheritance directives are folded away and
//!    sibling keys merged under the effective merge policies (see
//!    [`resolve::resolve`]).
//! 5. **Tree build** — the resolved value becomes an immutable
//!    [`ConfigNode`](tree::ConfigNode) tree with parent back-links.
//! 6. **Interpolation** — `{{ ... }}` spans inside strings are rendered with
//!    `cfg` bound to the step-5 tree, and the final tree is rebuilt from the
//!    rendered value (see [`eval::interpolate`]).

pub mod eval;
pub mod merge;
pub mod normalize;
pub mod resolve;
pub mod tree;
pub mod value;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::context::Context;
use eval::Scope;
use merge::MergeOptions;
use tree::ConfigNode;
use value::Value;

/// Key introducing an inheritance directive inside a dict.
pub const FROM_KEY: &str = "from";

/// Key holding per-node merge policy overrides.
pub const MERGE_OPTS_KEY: &str = "merge-opts";

/// Key declaring filesystem ignore patterns for the enclosing scope.
pub const IGNORED_PATHS_KEY: &str = "ignored-paths";

/// Key used by the canonical wrapped-list form `{list: [...]}`.
pub const LIST_KEY: &str = "list";

/// Keys with structural meaning that never appear as ordinary config data.
///
/// [`LIST_KEY`] is deliberately absent: a `list` entry is the payload of a
/// wrapped list, not metadata, and is handled by the wrapper-aware accessors
/// on [`ConfigNode`].
pub const RESERVED_KEYS: [&str; 3] = [FROM_KEY, MERGE_OPTS_KEY, IGNORED_PATHS_KEY];

/// A fully resolved configuration: the navigable tree plus its source path.
#[derive(Debug)]
pub struct Config {
    /// Path the configuration was loaded from.
    pub path: PathBuf,
    /// Root of the resolved tree.
    pub root: Arc<ConfigNode>,
}

impl Config {
    /// Load and fully resolve the configuration file at `ctx.config_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a merge policy
    /// is violated during resolution, an `ignored-paths` pattern is not a
    /// valid regex, or an expression fails to evaluate.
    pub fn load(ctx: &Context) -> Result<Self> {
        let path = ctx.config_path.clone();
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let root = resolve_source(&source, &path, ctx)?;
        Ok(Self { path, root })
    }

    /// Resolve configuration from an in-memory string, as if it had been read
    /// from `path`. The path determines the parse format and appears in
    /// diagnostics.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Config::load`], minus file I/O.
    pub fn from_str(source: &str, path: &Path, ctx: &Context) -> Result<Self> {
        let root = resolve_source(source, path, ctx)?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }
}

/// Run the full pipeline over raw configuration text.
fn resolve_source(source: &str, path: &Path, ctx: &Context) -> Result<Arc<ConfigNode>> {
    let display = path.display().to_string();
    let parsed = parse(source, path)?;

    let scope = Scope::new(ctx);
    let expanded = eval::expand_directives(parsed, &scope)
        .with_context(|| format!("expanding directives in {display}"))?;

    let normalized = normalize::normalize(expanded);
    let resolved = resolve::resolve(normalized, MergeOptions::root())
        .with_context(|| format!("resolving inheritance in {display}"))?;

    // Interpolation can look up resolved keys through `cfg`, so it needs a
    // tree built from the pre-interpolation value.
    let prelim = ConfigNode::build(&resolved)
        .with_context(|| format!("building config tree for {display}"))?;
    let scope = Scope::with_cfg(ctx, &prelim);
    let rendered = eval::interpolate(resolved, &scope)
        .with_context(|| format!("interpolating expressions in {display}"))?;

    ConfigNode::build(&rendered).with_context(|| format!("building config tree for {display}"))
}

/// Parse raw text into a [`Value`], choosing the format by file extension.
/// Everything that is not `.json` is treated as YAML.
fn parse(source: &str, path: &Path) -> Result<Value> {
    let display = path.display().to_string();
    let value = if path.extension().is_some_and(|ext| ext == "json") {
        Value::from_json_str(source, &display)?
    } else {
        Value::from_yaml_str(source, &display)?
    };
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::context;

    #[test]
    fn reserved_keys_exclude_list() {
        assert!(RESERVED_KEYS.contains(&FROM_KEY));
        assert!(RESERVED_KEYS.contains(&MERGE_OPTS_KEY));
        assert!(RESERVED_KEYS.contains(&IGNORED_PATHS_KEY));
        assert!(!RESERVED_KEYS.contains(&LIST_KEY));
    }

    #[test]
    fn from_str_runs_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());

        let source = r#"
profile:
  from:
    - editor: vim
      packages:
        - git
  editor: nano
  greeting: "hello {{ cfg.get('profile.editor') }}"
"#;
        let config = Config::from_str(source, Path::new("conf.yaml"), &ctx).unwrap();
        let profile = config.root.get("profile").unwrap();
        assert_eq!(profile.get("editor").unwrap().as_str().unwrap(), "nano");
        assert_eq!(
            profile.get("greeting").unwrap().as_str().unwrap(),
            "hello nano"
        );
        let packages = profile.get("packages").unwrap().as_list().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].as_str().unwrap(), "git");
    }

    #[test]
    fn from_str_parses_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());

        let config =
            Config::from_str(r#"{"name": "demo"}"#, Path::new("conf.json"), &ctx).unwrap();
        assert_eq!(config.root.get("name").unwrap().as_str().unwrap(), "demo");
    }

    #[test]
    fn from_str_surfaces_merge_failures() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::fixture(dir.path());

        let source = "\
child:
  from:
    - key: 1
  merge-opts:
    value: illegal
  key: 2
";
        let err = Config::from_str(source, Path::new("conf.yaml"), &ctx).unwrap_err();
        assert!(err.to_string().contains("resolving inheritance"));
    }

    #[test]
    fn load_reads_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("dotdeploy.yaml");
        std::fs::write(&conf, "name: ondisk\n").unwrap();
        let ctx = Context::new(&conf, None, false).unwrap();

        let config = Config::load(&ctx).unwrap();
        assert_eq!(config.root.get("name").unwrap().as_str().unwrap(), "ondisk");
    }
}
