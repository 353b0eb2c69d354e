//! Declarative dotfile deployment engine.
//!
//! A single YAML (or JSON) document describes what the machine should look
//! like: files to copy, links to create, templates to render. The document is
//! layered — sections inherit from one another through `from` directives
//! under configurable merge policies, and strings embed a small expression
//! language for environment- and machine-dependent values.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]** — parse, merge, resolve, and navigate the document
//! - **[`resources`]** — hashing, diffing, backups, and traversal primitives
//! - **[`plugins`]** — check + apply deployment units built from the document
//! - **[`commands`]** — top-level subcommand orchestration (`apply`, `diff`, `show`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod logging;
pub mod plugins;
pub mod resources;
