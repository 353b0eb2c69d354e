//! Domain-specific error types for the deployment engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`MergeError`], [`EvalError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotdeployError
//! ├── Merge(MergeError)   — merge policy violations, type conflicts
//! ├── Config(ConfigError) — document parsing, tree access, ignore patterns
//! ├── Eval(EvalError)     — expression parsing and evaluation
//! └── Plugin(PluginError) — plugin dispatch and filesystem actions
//! ```
//!
//! Nothing in the core is recovered locally: a partially-resolved
//! configuration is unsafe to apply to a filesystem, so every failure aborts
//! the whole resolution pass.

use thiserror::Error;

/// Top-level error type for the deployment engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum DotdeployError {
    /// Merge engine error (illegal policy, type conflict, add-only collision).
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Configuration error (parsing, typed tree access, ignore patterns).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Expression evaluation error.
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Plugin dispatch or execution error.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Errors raised by the merge engine.
#[derive(Error, Debug)]
pub enum MergeError {
    /// An unrecognized merge-policy string was supplied in `merge-opts`.
    #[error("Illegal merge option '{0}'")]
    IllegalOption(String),

    /// Base and extend values have different structural kinds at a merge site.
    #[error("Cannot merge {extend} into {base}: non-matching types")]
    NonMatchingTypes {
        /// Structural kind of the base value.
        base: &'static str,
        /// Structural kind of the extend value.
        extend: &'static str,
    },

    /// Merge attempted under an `illegal` policy, an add-only key collision,
    /// or a scalar type mismatch.
    #[error("Unmergeable values: {0}")]
    Unmergeable(String),
}

/// Errors that arise from configuration loading and tree access.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A typed accessor was used against a node of an incompatible kind.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Kind the caller asked for.
        expected: &'static str,
        /// Kind actually held by the node.
        found: &'static str,
    },

    /// The parsed document contains a mapping key that is not a string.
    #[error("Mapping keys must be strings, found: {0}")]
    NonStringKey(String),

    /// An `ignored-paths` pattern failed to compile.
    #[error("Invalid ignored-paths pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern as authored.
        pattern: String,
        /// Underlying regex compilation error.
        source: regex::Error,
    },

    /// The document could not be parsed as YAML or JSON.
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path of the document (or `<inline>` for in-memory input).
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised while parsing or evaluating embedded expressions.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The expression text could not be parsed.
    #[error("Failed to parse expression '{expr}': {message}")]
    Parse {
        /// The offending expression source.
        expr: String,
        /// Parser diagnostic.
        message: String,
    },

    /// An identifier or property is not part of the fixed namespace.
    #[error("Undefined name '{0}'")]
    Undefined(String),

    /// A call was made on something that is not callable.
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// A builtin was called with the wrong number or type of arguments.
    #[error("Invalid arguments to {callee}: {message}")]
    InvalidArgs {
        /// Name of the builtin.
        callee: String,
        /// What went wrong.
        message: String,
    },

    /// An operator was applied to values of incompatible types.
    #[error("Type error: {0}")]
    Type(String),

    /// A referenced environment variable is not set.
    #[error("Environment variable '{0}' is not set")]
    MissingEnv(String),

    /// A `ctx.rel()` path does not exist on disk.
    #[error("Path does not exist: {0}")]
    MissingPath(String),

    /// A whole-string directive kept producing further directives past the
    /// recursion cap.
    #[error("Expression recursion limit ({limit}) exceeded while evaluating '{expr}'")]
    RecursionLimit {
        /// The directive that kept re-expanding.
        expr: String,
        /// The configured recursion cap.
        limit: usize,
    },
}

/// Errors that arise from plugin dispatch and execution.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The config names a plugin that is not registered.
    #[error("Unknown plugin '{0}'")]
    Unknown(String),

    /// A plugin entry does not have the expected shape.
    #[error("Invalid plugin specification: {0}")]
    InvalidSpec(String),

    /// A plugin's source file or directory does not exist.
    #[error("Source path does not exist: {0}")]
    MissingSource(String),

    /// An I/O error during diff, backup, or apply.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
