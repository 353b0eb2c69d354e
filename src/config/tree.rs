//! The navigable, immutable view over a resolved document.
//!
//! [`ConfigNode`] wraps each resolved value in a parent-linked tree node.
//! Children are owned through [`Arc`]s, parent links are [`Weak`] (lookup
//! only, never lifetime-owning), and the whole tree is built once and never
//! mutated afterwards. Downstream consumers see nothing but this read
//! surface: typed accessors, dotted-path lookup with optional parent
//! fallback, denormalization, and accumulated ignored-path patterns.
//!
//! A node's kind is fixed at construction; querying it as the wrong kind
//! fails fast with [`ConfigError::TypeMismatch`] rather than coercing.

use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use regex::Regex;

use crate::config::value::{Map, Value};
use crate::config::{IGNORED_PATHS_KEY, LIST_KEY, RESERVED_KEYS};
use crate::error::ConfigError;

/// What a node holds: a scalar, a list of children, or a dict of children.
#[derive(Debug)]
enum NodeContent {
    /// A scalar leaf (never a container).
    Scalar(Value),
    /// A native sequence.
    List(Vec<Arc<ConfigNode>>),
    /// A mapping. May represent a logical list when it carries the internal
    /// `list` wrapper key.
    Dict(IndexMap<String, Arc<ConfigNode>>),
}

/// One node of the immutable config tree.
#[derive(Debug)]
pub struct ConfigNode {
    content: NodeContent,
    parent: Weak<ConfigNode>,
    /// Patterns declared by this node's own `ignored-paths` key, compiled at
    /// construction.
    own_ignored: Vec<Regex>,
    /// Whether `ignored-paths` was declared on this node (drives `to_value`
    /// projection).
    declares_ignored: bool,
    /// Accumulated ancestor + own patterns, computed once on first use.
    /// `OnceLock` keeps the populate-once cache safe under parallel readers.
    accumulated_ignored: OnceLock<Vec<Regex>>,
}

impl ConfigNode {
    /// Build a tree from a resolved value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an `ignored-paths` entry is not a string
    /// or does not compile as a regex.
    pub fn build(value: &Value) -> Result<Arc<Self>, ConfigError> {
        let mut first_err = None;
        let root = Self::build_node(value, Weak::new(), &mut first_err);
        match first_err {
            Some(err) => Err(err),
            None => Ok(root),
        }
    }

    /// Recursive constructor. `Arc::new_cyclic` hands children a weak
    /// reference to their parent before the parent is finished; errors are
    /// parked in `first_err` because the cyclic closure cannot be fallible.
    fn build_node(
        value: &Value,
        parent: Weak<Self>,
        first_err: &mut Option<ConfigError>,
    ) -> Arc<Self> {
        match value {
            Value::Dict(map) => Arc::new_cyclic(|me: &Weak<Self>| {
                let children = map
                    .iter()
                    .map(|(key, val)| (key.clone(), Self::build_node(val, me.clone(), first_err)))
                    .collect();
                let (own_ignored, declares_ignored) = match compile_ignored(map) {
                    Ok(compiled) => compiled,
                    Err(err) => {
                        first_err.get_or_insert(err);
                        (Vec::new(), false)
                    }
                };
                Self {
                    content: NodeContent::Dict(children),
                    parent: parent.clone(),
                    own_ignored,
                    declares_ignored,
                    accumulated_ignored: OnceLock::new(),
                }
            }),
            Value::List(items) => Arc::new_cyclic(|me: &Weak<Self>| Self {
                content: NodeContent::List(
                    items
                        .iter()
                        .map(|item| Self::build_node(item, me.clone(), first_err))
                        .collect(),
                ),
                parent: parent.clone(),
                own_ignored: Vec::new(),
                declares_ignored: false,
                accumulated_ignored: OnceLock::new(),
            }),
            scalar => Arc::new(Self {
                content: NodeContent::Scalar(scalar.clone()),
                parent,
                own_ignored: Vec::new(),
                declares_ignored: false,
                accumulated_ignored: OnceLock::new(),
            }),
        }
    }

    /// Lift a plain value into a child node of `self`, so that parent-chain
    /// lookups from the lifted node keep working.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the value carries invalid
    /// `ignored-paths` patterns.
    pub fn lift(self: &Arc<Self>, value: &Value) -> Result<Arc<Self>, ConfigError> {
        let mut first_err = None;
        let node = Self::build_node(value, Arc::downgrade(self), &mut first_err);
        match first_err {
            Some(err) => Err(err),
            None => Ok(node),
        }
    }

    /// Kind name as seen by consumers: a dict carrying the internal `list`
    /// wrapper key reads as a list.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match &self.content {
            NodeContent::Scalar(value) => value.type_name(),
            NodeContent::List(_) => "list",
            NodeContent::Dict(children) => {
                if children.contains_key(LIST_KEY) {
                    "list"
                } else {
                    "dict"
                }
            }
        }
    }

    /// True for a native sequence or a `{list: …}` wrapper dict.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.kind_name() == "list"
    }

    /// True for a mapping without the internal `list` wrapper key.
    #[must_use]
    pub fn is_dict(&self) -> bool {
        self.kind_name() == "dict"
    }

    /// True for a string scalar.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(&self.content, NodeContent::Scalar(Value::String(_)))
    }

    /// The node's children as a list, unwrapping the `{list: …}` container
    /// when present. An empty wrapped list is present-but-empty, not absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] when the node is not a list.
    pub fn as_list(&self) -> Result<Vec<Arc<Self>>, ConfigError> {
        match &self.content {
            NodeContent::List(items) => Ok(items.clone()),
            NodeContent::Dict(children) => children.get(LIST_KEY).map_or_else(
                || {
                    Err(ConfigError::TypeMismatch {
                        expected: "list",
                        found: "dict",
                    })
                },
                |wrapped| wrapped.as_list(),
            ),
            NodeContent::Scalar(value) => Err(ConfigError::TypeMismatch {
                expected: "list",
                found: value.type_name(),
            }),
        }
    }

    /// The node's children as a mapping, with all reserved keys (`from`,
    /// `merge-opts`, `ignored-paths`) hidden — callers never see these as
    /// user data.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] when the node is not a dict.
    pub fn as_dict(&self) -> Result<IndexMap<String, Arc<Self>>, ConfigError> {
        if !self.is_dict() {
            return Err(ConfigError::TypeMismatch {
                expected: "dict",
                found: self.kind_name(),
            });
        }
        let NodeContent::Dict(children) = &self.content else {
            return Err(ConfigError::TypeMismatch {
                expected: "dict",
                found: self.kind_name(),
            });
        };
        Ok(children
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, child)| (key.clone(), Arc::clone(child)))
            .collect())
    }

    /// The node's string value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] when the node is not a string.
    pub fn as_str(&self) -> Result<&str, ConfigError> {
        match &self.content {
            NodeContent::Scalar(Value::String(s)) => Ok(s),
            _ => Err(ConfigError::TypeMismatch {
                expected: "string",
                found: self.kind_name(),
            }),
        }
    }

    /// The node's boolean value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] when the node is not a bool.
    pub fn as_bool(&self) -> Result<bool, ConfigError> {
        match &self.content {
            NodeContent::Scalar(Value::Bool(b)) => Ok(*b),
            _ => Err(ConfigError::TypeMismatch {
                expected: "bool",
                found: self.kind_name(),
            }),
        }
    }

    /// The node's integer value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] when the node is not an int.
    pub fn as_int(&self) -> Result<i64, ConfigError> {
        match &self.content {
            NodeContent::Scalar(Value::Int(n)) => Ok(*n),
            _ => Err(ConfigError::TypeMismatch {
                expected: "int",
                found: self.kind_name(),
            }),
        }
    }

    /// Dotted-path lookup within this node only (no parent fallback).
    ///
    /// Walks successive dict accesses; `None` when any segment is absent or
    /// the walk hits a non-dict.
    #[must_use]
    pub fn get(self: &Arc<Self>, key: &str) -> Option<Arc<Self>> {
        let mut node = Arc::clone(self);
        for part in key.split('.') {
            let NodeContent::Dict(children) = &node.content else {
                return None;
            };
            let child = Arc::clone(children.get(part)?);
            node = child;
        }
        Some(node)
    }

    /// Dotted-path lookup with a default lifted into a child of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the default value fails to lift.
    pub fn get_or(self: &Arc<Self>, key: &str, default: Value) -> Result<Arc<Self>, ConfigError> {
        match self.get(key) {
            Some(found) => Ok(found),
            None => self.lift(&default),
        }
    }

    /// Dotted-path lookup that falls back to the parent chain on a miss.
    #[must_use]
    pub fn getp(self: &Arc<Self>, key: &str) -> Option<Arc<Self>> {
        let mut current = Some(Arc::clone(self));
        while let Some(node) = current {
            if let Some(found) = node.get(key) {
                return Some(found);
            }
            current = node.parent.upgrade();
        }
        None
    }

    /// Parent-chain lookup with a default lifted into a child of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the default value fails to lift.
    pub fn getp_or(self: &Arc<Self>, key: &str, default: Value) -> Result<Arc<Self>, ConfigError> {
        match self.getp(key) {
            Some(found) => Ok(found),
            None => self.lift(&default),
        }
    }

    /// Denormalize back to a plain nested value.
    ///
    /// `{list: …}` wrappers unwrap to plain sequences, reserved bookkeeping
    /// keys are dropped, and `ignored-paths` is projected back to plain
    /// strings only on the node where it was declared.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match &self.content {
            NodeContent::Scalar(value) => value.clone(),
            NodeContent::List(items) => {
                Value::List(items.iter().map(|item| item.to_value()).collect())
            }
            NodeContent::Dict(children) => {
                if let Some(wrapped) = children.get(LIST_KEY) {
                    return wrapped.to_value();
                }
                let mut out = Map::with_capacity(children.len());
                for (key, child) in children {
                    if RESERVED_KEYS.contains(&key.as_str()) {
                        continue;
                    }
                    out.insert(key.clone(), child.to_value());
                }
                if self.declares_ignored {
                    out.insert(
                        IGNORED_PATHS_KEY.to_string(),
                        Value::List(
                            self.own_ignored
                                .iter()
                                .map(|pattern| Value::String(pattern.as_str().to_string()))
                                .collect(),
                        ),
                    );
                }
                Value::Dict(out)
            }
        }
    }

    /// All ignored-path patterns in effect at this node: every
    /// ancestor-declared pattern plus this node's own, in root-to-leaf
    /// order.
    ///
    /// Computed once per dict node and cached; non-dict nodes delegate to
    /// their parent.
    #[must_use]
    pub fn ignored_paths(&self) -> Vec<Regex> {
        match &self.content {
            NodeContent::Dict(_) => self
                .accumulated_ignored
                .get_or_init(|| {
                    let mut patterns = self
                        .parent
                        .upgrade()
                        .map(|parent| parent.ignored_paths())
                        .unwrap_or_default();
                    patterns.extend(self.own_ignored.iter().cloned());
                    patterns
                })
                .clone(),
            _ => self
                .parent
                .upgrade()
                .map(|parent| parent.ignored_paths())
                .unwrap_or_default(),
        }
    }
}

/// Compile the `ignored-paths` patterns declared on a dict, if any.
///
/// Eager compilation keeps the lazy accumulation cache infallible.
fn compile_ignored(map: &Map) -> Result<(Vec<Regex>, bool), ConfigError> {
    let Some(declared) = map.get(IGNORED_PATHS_KEY) else {
        return Ok((Vec::new(), false));
    };

    // Normalized form wraps the pattern list; accept a bare list as well.
    let items: &[Value] = match declared {
        Value::Dict(wrapper) => match wrapper.get(LIST_KEY) {
            Some(Value::List(items)) => items,
            _ => &[],
        },
        Value::List(items) => items,
        _ => &[],
    };

    let mut patterns = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(pattern) = item else {
            return Err(ConfigError::TypeMismatch {
                expected: "string",
                found: item.type_name(),
            });
        };
        let compiled = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        patterns.push(compiled);
    }
    Ok((patterns, true))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::merge::MergeOptions;
    use crate::config::normalize::normalize;
    use crate::config::resolve::resolve;

    fn yaml(source: &str) -> Value {
        Value::from_yaml_str(source, "<test>").unwrap()
    }

    /// Run the full normalize → resolve → build pipeline on a YAML snippet.
    fn tree(source: &str) -> Arc<ConfigNode> {
        let resolved = resolve(normalize(yaml(source)), MergeOptions::root()).unwrap();
        ConfigNode::build(&resolved).unwrap()
    }

    #[test]
    fn kind_of_wrapped_list_is_list() {
        let root = tree("{xs: [1, 2], d: {a: 1}, s: hi}");
        assert!(root.get("xs").unwrap().is_list());
        assert!(root.get("d").unwrap().is_dict());
        assert!(root.get("s").unwrap().is_string());
        assert!(!root.get("xs").unwrap().is_dict());
    }

    #[test]
    fn as_list_unwraps_container() {
        let root = tree("{xs: [10, 20]}");
        let items = root.get("xs").unwrap().as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_int().unwrap(), 10);
        assert_eq!(items[1].as_int().unwrap(), 20);
    }

    #[test]
    fn empty_list_is_present_but_empty() {
        let root = tree("{xs: []}");
        let node = root.get("xs").unwrap();
        assert!(node.is_list());
        assert!(node.as_list().unwrap().is_empty());
        assert!(root.get("missing").is_none());
    }

    #[test]
    fn as_dict_hides_reserved_keys() {
        let root = tree("{merge-opts: {list: append}, ignored-paths: ['^/tmp'], a: 1}");
        let map = root.as_dict().unwrap();
        assert!(map.contains_key("a"));
        assert!(!map.contains_key("merge-opts"));
        assert!(!map.contains_key("ignored-paths"));
    }

    #[test]
    fn typed_access_fails_fast() {
        let root = tree("{xs: [1], s: hi}");
        let err = root.get("xs").unwrap().as_dict().unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "dict", .. }));
        let err = root.get("s").unwrap().as_list().unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "list", .. }));
        let err = root.get("s").unwrap().as_bool().unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "bool", .. }));
    }

    #[test]
    fn dotted_get_walks_dicts_only() {
        let root = tree("{a: {b: {c: 42}}}");
        assert_eq!(root.get("a.b.c").unwrap().as_int().unwrap(), 42);
        assert!(root.get("a.b.missing").is_none());
        assert!(root.get("a.b.c.too-deep").is_none());
    }

    #[test]
    fn get_or_lifts_default_into_child() {
        let root = tree("{a: {b: 1}}");
        let lifted = root.get_or("missing", Value::Bool(false)).unwrap();
        assert!(!lifted.as_bool().unwrap());
        // The lifted node keeps a working parent chain.
        assert_eq!(lifted.getp("a.b").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn getp_falls_back_to_parents() {
        let root = tree("{shared: 7, nested: {inner: {own: 1}}}");
        let inner = root.get("nested.inner").unwrap();
        assert_eq!(inner.getp("shared").unwrap().as_int().unwrap(), 7);
        assert!(inner.get("shared").is_none());
        assert_eq!(inner.get("own").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn getp_miss_lifts_default() {
        let root = tree("{a: 1}");
        let lifted = root
            .getp_or("nowhere", Value::String("fallback".to_string()))
            .unwrap();
        assert_eq!(lifted.as_str().unwrap(), "fallback");
    }

    #[test]
    fn ignored_paths_accumulate_from_ancestors() {
        let root = tree(
            "{ignored-paths: ['^/tmp'], child: {ignored-paths: ['^/var'], leaf: {x: 1}}}",
        );
        let child = root.get("child").unwrap();
        let accumulated = child.ignored_paths();
        let patterns: Vec<&str> = accumulated.iter().map(|r| r.as_str()).collect();
        assert_eq!(patterns, ["^/tmp", "^/var"]);

        // A dict without its own declaration still sees ancestor patterns.
        let leaf = child.get("leaf").unwrap();
        let patterns: Vec<String> = leaf
            .ignored_paths()
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();
        assert_eq!(patterns, ["^/tmp", "^/var"]);
    }

    #[test]
    fn ignored_paths_on_root_only() {
        let root = tree("{ignored-paths: ['\\.git/'], a: {b: 1}}");
        let nested = root.get("a").unwrap();
        let patterns = nested.ignored_paths();
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].is_match("/home/user/.git/config"));
    }

    #[test]
    fn invalid_ignored_pattern_fails_build() {
        let resolved = resolve(
            normalize(yaml("{ignored-paths: ['[unclosed']}")),
            MergeOptions::root(),
        )
        .unwrap();
        let err = ConfigNode::build(&resolved).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn to_value_denormalizes_and_projects_ignored_paths() {
        let root = tree(
            "{merge-opts: {list: append}, ignored-paths: ['^/tmp'], xs: [1, 2], d: {y: 2}}",
        );
        let plain = root.to_value();
        assert_eq!(plain.get("xs"), Some(&yaml("[1, 2]")));
        assert_eq!(plain.get("d"), Some(&yaml("{y: 2}")));
        assert_eq!(plain.get("ignored-paths"), Some(&yaml("['^/tmp']")));
        assert!(plain.get("merge-opts").is_none());
    }

    #[test]
    fn to_value_does_not_duplicate_ignored_paths_onto_descendants() {
        let root = tree("{ignored-paths: ['^/tmp'], d: {y: 2}}");
        let plain = root.to_value();
        assert!(plain.get("d").unwrap().get("ignored-paths").is_none());
    }
}
