// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed deployment sandbox so each test can
// set up an isolated config directory, source files, and home directory
// without repeating filesystem boilerplate.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dotdeploy::config::Config;
use dotdeploy::context::Context;

/// An isolated deployment sandbox backed by a [`tempfile::TempDir`].
///
/// The sandbox directory doubles as the config directory; deployment targets
/// under `~/` land in a `home/` subdirectory.
pub struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create sandbox dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Write a file relative to the sandbox root, creating parent dirs.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write sandbox file");
        path
    }

    /// Write the config document and build a context over it, with the home
    /// directory redirected into the sandbox.
    pub fn context(&self, config_source: &str) -> Context {
        let config_path = self.write("dotdeploy.yaml", config_source);
        let config_dir = self.dir.path().to_path_buf();
        let mut env: std::collections::BTreeMap<String, String> = std::env::vars().collect();
        env.insert("DEPLOY_USER".to_string(), "tester".to_string());
        Context {
            config_path,
            config_dir: config_dir.clone(),
            root: config_dir,
            home: self.home(),
            dry_run: false,
            has_gpu: false,
            env,
        }
    }

    /// Write the config document and run the full resolution pipeline.
    pub fn load(&self, config_source: &str) -> (Context, Config) {
        let ctx = self.context(config_source);
        let config = Config::load(&ctx).expect("load config");
        (ctx, config)
    }
}
