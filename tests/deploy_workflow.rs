#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the deployment workflow: building plugins from a
//! resolved document, planning diffs, applying changes with backups, and
//! converging to an up-to-date state.

mod common;

use common::Sandbox;
use dotdeploy::plugins;

#[test]
fn full_deploy_converges() {
    let sandbox = Sandbox::new();
    sandbox.write("files/bashrc", "export EDITOR=vim\n");
    sandbox.write("templates/motd", "welcome {{ env.DEPLOY_USER }}\n");

    let (ctx, config) = sandbox.load(
        "\
plugins:
  - copy:
      alias: bashrc
      source: files/bashrc
      target: ~/.bashrc
  - generate:
      alias: motd
      source: templates/motd
      target: ~/.motd
",
    );
    let plugins = plugins::from_config(&config.root, &ctx).unwrap();
    assert_eq!(plugins.len(), 2);

    // First pass: everything is pending.
    for plugin in &plugins {
        assert!(!plugin.plan(&ctx).unwrap().is_empty(), "{}", plugin.name());
        assert_eq!(plugin.apply(&ctx).unwrap(), 1, "{}", plugin.name());
    }

    assert_eq!(
        std::fs::read_to_string(sandbox.home().join(".bashrc")).unwrap(),
        "export EDITOR=vim\n"
    );
    assert_eq!(
        std::fs::read_to_string(sandbox.home().join(".motd")).unwrap(),
        "welcome tester\n"
    );

    // Second pass: nothing left to do.
    for plugin in &plugins {
        assert!(plugin.plan(&ctx).unwrap().is_empty(), "{}", plugin.name());
        assert_eq!(plugin.apply(&ctx).unwrap(), 0, "{}", plugin.name());
    }
}

#[test]
fn changed_target_is_backed_up_before_overwrite() {
    let sandbox = Sandbox::new();
    sandbox.write("files/profile", "new content\n");
    sandbox.write("home/.profile", "hand-edited content\n");

    let (ctx, config) = sandbox.load(
        "\
plugins:
  - copy:
      source: files/profile
      target: ~/.profile
",
    );
    let plugins = plugins::from_config(&config.root, &ctx).unwrap();

    let plan = plugins[0].plan(&ctx).unwrap();
    assert_eq!(plan.len(), 1);
    assert!(plan[0].diff.contains("- hand-edited content"));
    assert!(plan[0].diff.contains("+ new content"));

    plugins[0].apply(&ctx).unwrap();
    assert_eq!(
        std::fs::read_to_string(sandbox.home().join(".profile")).unwrap(),
        "new content\n"
    );
    assert_eq!(
        std::fs::read_to_string(sandbox.home().join(".profile.backup")).unwrap(),
        "hand-edited content\n"
    );
}

#[test]
fn inherited_plugin_sections_deploy_merged_trees() {
    let sandbox = Sandbox::new();
    sandbox.write("templates/rc", "theme={{ cfg.get('theme') }}\n");

    // The plugin entry inherits `theme` from a shared base through `from`.
    let (ctx, config) = sandbox.load(
        "\
plugins:
  - generate:
      from:
        - theme: dark
      source: templates/rc
      target: ~/.rc
",
    );
    let plugins = plugins::from_config(&config.root, &ctx).unwrap();
    plugins[0].apply(&ctx).unwrap();

    assert_eq!(
        std::fs::read_to_string(sandbox.home().join(".rc")).unwrap(),
        "theme=dark\n"
    );
}

#[test]
fn ignored_paths_scope_to_the_declaring_plugin() {
    let sandbox = Sandbox::new();
    sandbox.write("dots/a.conf", "a\n");
    sandbox.write("dots/secrets/token", "t\n");
    sandbox.write("other/secrets/keep", "k\n");

    let (ctx, config) = sandbox.load(
        "\
plugins:
  - copy:
      alias: filtered
      ignored-paths:
        - '^secrets/'
      source: dots
      target: ~/dots
  - copy:
      alias: unfiltered
      source: other
      target: ~/other
",
    );
    let plugins = plugins::from_config(&config.root, &ctx).unwrap();
    for plugin in &plugins {
        plugin.apply(&ctx).unwrap();
    }

    assert!(sandbox.home().join("dots/a.conf").exists());
    assert!(!sandbox.home().join("dots/secrets").exists());
    assert!(sandbox.home().join("other/secrets/keep").exists());
}

#[cfg(unix)]
#[test]
fn symlink_plugin_links_into_home() {
    let sandbox = Sandbox::new();
    let source = sandbox.write("files/vimrc", "set number\n");

    let (ctx, config) = sandbox.load(
        "\
plugins:
  - symlink:
      source: files/vimrc
      target: ~/.vimrc
",
    );
    let plugins = plugins::from_config(&config.root, &ctx).unwrap();
    plugins[0].apply(&ctx).unwrap();

    assert_eq!(
        std::fs::read_link(sandbox.home().join(".vimrc")).unwrap(),
        source
    );
    assert!(plugins[0].plan(&ctx).unwrap().is_empty());
}

#[test]
fn disabled_plugins_still_plan_but_are_flagged() {
    let sandbox = Sandbox::new();
    sandbox.write("files/x", "x\n");

    let (ctx, config) = sandbox.load(
        "\
plugins:
  - copy:
      source: files/x
      target: ~/.x
      disabled: true
",
    );
    let plugins = plugins::from_config(&config.root, &ctx).unwrap();
    assert!(plugins[0].disabled());
    assert!(!plugins[0].plan(&ctx).unwrap().is_empty());
}
