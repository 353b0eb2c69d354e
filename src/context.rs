//! Execution context threaded explicitly through the pipeline.
//!
//! The context carries everything the expression namespace and the plugins
//! need to know about the invocation: where the config lives, where the
//! deployment root is, the user's home directory, a snapshot of the process
//! environment, and probed hardware capabilities. It is built once per
//! invocation and passed by reference — there is no global state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};

use crate::error::EvalError;
use crate::exec;

/// Probe subprocesses get this long before they count as "absent".
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable per-invocation context.
#[derive(Debug, Clone)]
pub struct Context {
    /// Absolute path of the loaded config document.
    pub config_path: PathBuf,
    /// Directory containing the config document; `rel()` resolves against it.
    pub config_dir: PathBuf,
    /// Deployment root directory (defaults to the config's directory).
    pub root: PathBuf,
    /// The user's home directory.
    pub home: PathBuf,
    /// Whether this invocation previews changes without applying them.
    pub dry_run: bool,
    /// Whether an NVIDIA GPU was detected via `nvidia-smi`.
    pub has_gpu: bool,
    /// Snapshot of the process environment at startup.
    pub env: BTreeMap<String, String>,
}

impl Context {
    /// Build a context for the given config file.
    ///
    /// Snapshots the environment, resolves the home directory, and runs the
    /// GPU capability probe (bounded; probe failure means "no GPU", never an
    /// error).
    ///
    /// # Errors
    ///
    /// Returns an error if the config path has no parent directory or the
    /// home directory cannot be determined.
    pub fn new(config_path: &Path, root: Option<&Path>, dry_run: bool) -> Result<Self> {
        let config_path = dunce::canonicalize(config_path)
            .with_context(|| format!("config file not found: {}", config_path.display()))?;
        let config_dir = config_path
            .parent()
            .with_context(|| format!("config path has no parent: {}", config_path.display()))?
            .to_path_buf();
        let root = root.map_or_else(|| config_dir.clone(), Path::to_path_buf);

        let home = home_dir()?;
        let env: BTreeMap<String, String> = std::env::vars().collect();
        let has_gpu = exec::probe("nvidia-smi", &[], PROBE_TIMEOUT);
        tracing::debug!("gpu probe: {}", if has_gpu { "present" } else { "absent" });

        Ok(Self {
            config_path,
            config_dir,
            root,
            home,
            dry_run,
            has_gpu,
            env,
        })
    }

    /// Resolve a path relative to the config directory.
    ///
    /// The resolved path must exist; expressions referencing missing files
    /// are config authoring errors.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::MissingPath`] when the path does not exist.
    pub fn rel(&self, path: &str) -> Result<PathBuf, EvalError> {
        let joined = self.config_dir.join(path);
        dunce::canonicalize(&joined)
            .map_err(|_| EvalError::MissingPath(joined.display().to_string()))
    }

    /// Expand a leading `~/` against the context's home directory.
    #[must_use]
    pub fn expand_home(&self, path: &str) -> PathBuf {
        path.strip_prefix("~/").map_or_else(
            || PathBuf::from(path),
            |rest| self.home.join(rest),
        )
    }

    /// Look up a variable in the environment snapshot.
    #[must_use]
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }
}

/// Resolve the user's home directory from the environment.
fn home_dir() -> Result<PathBuf> {
    if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .map(PathBuf::from)
            .context("neither USERPROFILE nor HOME environment variable is set")
    } else {
        std::env::var("HOME")
            .map(PathBuf::from)
            .context("HOME environment variable is not set")
    }
}

/// A context over a temp dir, with a controlled environment snapshot.
#[cfg(test)]
pub(crate) fn fixture(dir: &Path) -> Context {
    Context {
        config_path: dir.join("deploy.yaml"),
        config_dir: dir.to_path_buf(),
        root: dir.to_path_buf(),
        home: dir.join("home"),
        dry_run: false,
        has_gpu: false,
        env: BTreeMap::from([("DEPLOY_USER".to_string(), "tester".to_string())]),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rel_resolves_existing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("present.txt"), "x").unwrap();
        let ctx = fixture(tmp.path());
        let resolved = ctx.rel("present.txt").unwrap();
        assert!(resolved.ends_with("present.txt"));
    }

    #[test]
    fn rel_rejects_missing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = fixture(tmp.path());
        let err = ctx.rel("absent.txt").unwrap_err();
        assert!(matches!(err, EvalError::MissingPath(_)));
    }

    #[test]
    fn expand_home_rewrites_tilde_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = fixture(tmp.path());
        assert_eq!(ctx.expand_home("~/notes"), ctx.home.join("notes"));
        assert_eq!(ctx.expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn env_var_reads_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = fixture(tmp.path());
        assert_eq!(ctx.env_var("DEPLOY_USER"), Some("tester"));
        assert_eq!(ctx.env_var("NOPE"), None);
    }
}
