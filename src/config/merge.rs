//! The merge engine: combine two values under explicit per-category policies.
//!
//! Merging is a pure function over [`Value`] pairs. Each structural category
//! (scalar, list, dict) carries its own policy; a category with no policy in
//! effect is treated as `illegal`, so a merge only ever happens when the
//! configuration explicitly (or via the root defaults) allows it.
//!
//! Policy strings from config are upper-cased before lookup, so any casing
//! is accepted (`overwrite`, `Overwrite`, `OVERWRITE`).

use crate::config::value::{Kind, Value};
use crate::config::MERGE_OPTS_KEY;
use crate::error::MergeError;

/// Policy for merging two scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePolicy {
    /// Scalar merging is forbidden.
    Illegal,
    /// Keep the base value.
    Preserve,
    /// Take the extend value.
    Overwrite,
}

/// Policy for merging two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPolicy {
    /// List merging is forbidden.
    Illegal,
    /// Base elements first, then extend elements.
    Append,
    /// Extend elements first, then base elements.
    Prepend,
    /// Keep the base list.
    Preserve,
    /// Take the extend list.
    Overwrite,
}

/// Policy for merging two dicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictPolicy {
    /// Dict merging is forbidden.
    Illegal,
    /// Union; keys present in both are merged recursively.
    UnionRecursive,
    /// Union; any key overlap is an error.
    UnionAddOnly,
    /// Keep the base dict.
    Preserve,
    /// Take the extend dict.
    Overwrite,
}

impl ValuePolicy {
    fn parse(text: &str) -> Result<Self, MergeError> {
        match text.to_ascii_uppercase().as_str() {
            "ILLEGAL" => Ok(Self::Illegal),
            "PRESERVE" => Ok(Self::Preserve),
            "OVERWRITE" => Ok(Self::Overwrite),
            _ => Err(MergeError::IllegalOption(text.to_string())),
        }
    }
}

impl ListPolicy {
    fn parse(text: &str) -> Result<Self, MergeError> {
        match text.to_ascii_uppercase().as_str() {
            "ILLEGAL" => Ok(Self::Illegal),
            "APPEND" => Ok(Self::Append),
            "PREPEND" => Ok(Self::Prepend),
            "PRESERVE" => Ok(Self::Preserve),
            "OVERWRITE" => Ok(Self::Overwrite),
            _ => Err(MergeError::IllegalOption(text.to_string())),
        }
    }
}

impl DictPolicy {
    fn parse(text: &str) -> Result<Self, MergeError> {
        match text.to_ascii_uppercase().as_str() {
            "ILLEGAL" => Ok(Self::Illegal),
            "UNION_RECURSIVE" => Ok(Self::UnionRecursive),
            "UNION_ADD_ONLY" => Ok(Self::UnionAddOnly),
            "PRESERVE" => Ok(Self::Preserve),
            "OVERWRITE" => Ok(Self::Overwrite),
            _ => Err(MergeError::IllegalOption(text.to_string())),
        }
    }
}

/// Per-category merge policies in effect at a merge site.
///
/// Threaded immutably top-down through resolution; a node-local `merge-opts`
/// override is combined with the ambient options via [`MergeOptions::overlay`]
/// (node value wins per category, absent categories inherit). An absent
/// category at the actual merge site resolves to the `illegal` policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Scalar policy, if any.
    pub value: Option<ValuePolicy>,
    /// List policy, if any.
    pub list: Option<ListPolicy>,
    /// Dict policy, if any.
    pub dict: Option<DictPolicy>,
}

impl MergeOptions {
    /// The root ambient policy: scalars overwrite, lists append, dicts union
    /// recursively.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            value: Some(ValuePolicy::Overwrite),
            list: Some(ListPolicy::Append),
            dict: Some(DictPolicy::UnionRecursive),
        }
    }

    /// Parse a `merge-opts` mapping (`value` / `list` / `dict` keys with
    /// policy-name string values).
    ///
    /// Extra keys are ignored; a non-string or unrecognized policy is an
    /// [`MergeError::IllegalOption`], surfaced at the site that parsed it.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::IllegalOption`] for malformed policies.
    pub fn from_value(value: &Value) -> Result<Self, MergeError> {
        let Some(map) = value.as_dict() else {
            return Err(MergeError::IllegalOption(value.display_string()));
        };

        let policy_str = |key: &str| -> Result<Option<&str>, MergeError> {
            match map.get(key) {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s)),
                Some(other) => Err(MergeError::IllegalOption(other.display_string())),
            }
        };

        Ok(Self {
            value: policy_str("value")?.map(ValuePolicy::parse).transpose()?,
            list: policy_str("list")?.map(ListPolicy::parse).transpose()?,
            dict: policy_str("dict")?.map(DictPolicy::parse).transpose()?,
        })
    }

    /// Combine ambient options with a node-local override.
    ///
    /// Per category the override wins where present; absent categories fall
    /// through to the ambient policy.
    #[must_use]
    pub fn overlay(self, over: Self) -> Self {
        Self {
            value: over.value.or(self.value),
            list: over.list.or(self.list),
            dict: over.dict.or(self.dict),
        }
    }

    /// Read a node's `merge-opts` (when the node is a dict that declares one)
    /// and overlay it onto these ambient options.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::IllegalOption`] for malformed policies.
    pub fn for_node(self, node: &Value) -> Result<Self, MergeError> {
        match node.get(MERGE_OPTS_KEY) {
            Some(opts) => Ok(self.overlay(Self::from_value(opts)?)),
            None => Ok(self),
        }
    }
}

/// Merge `extend` into `base` under the given options.
///
/// Dispatch is by the base value's structural kind; merging a container into
/// a non-container (or a list into a dict) fails with
/// [`MergeError::NonMatchingTypes`].
///
/// # Errors
///
/// Returns [`MergeError`] on a type conflict, a forbidden policy, or an
/// add-only key collision. Failures propagate unmodified through recursive
/// dict merges; there is no partial resolution.
pub fn merge(base: Value, extend: Value, opts: MergeOptions) -> Result<Value, MergeError> {
    match base.kind() {
        Kind::List => merge_list(base, extend, opts),
        Kind::Dict => merge_dict(base, extend, opts),
        Kind::Scalar => merge_scalar(base, extend, opts),
    }
}

fn merge_list(base: Value, extend: Value, opts: MergeOptions) -> Result<Value, MergeError> {
    let (Value::List(base_items), Value::List(extend_items)) = (base, extend) else {
        return Err(MergeError::NonMatchingTypes {
            base: "list",
            extend: "non-list",
        });
    };

    tracing::debug!(
        "merging lists: {} base + {} extend elements",
        base_items.len(),
        extend_items.len()
    );

    match opts.list.unwrap_or(ListPolicy::Illegal) {
        ListPolicy::Illegal => Err(MergeError::Unmergeable(
            "list merging is restricted via config".to_string(),
        )),
        ListPolicy::Append => {
            let mut out = base_items;
            out.extend(extend_items);
            Ok(Value::List(out))
        }
        ListPolicy::Prepend => {
            let mut out = extend_items;
            out.extend(base_items);
            Ok(Value::List(out))
        }
        ListPolicy::Preserve => Ok(Value::List(base_items)),
        ListPolicy::Overwrite => Ok(Value::List(extend_items)),
    }
}

fn merge_dict(base: Value, extend: Value, opts: MergeOptions) -> Result<Value, MergeError> {
    let (Value::Dict(base_map), Value::Dict(extend_map)) = (base, extend) else {
        return Err(MergeError::NonMatchingTypes {
            base: "dict",
            extend: "non-dict",
        });
    };

    tracing::debug!(
        "merging dicts: {} base + {} extend keys",
        base_map.len(),
        extend_map.len()
    );

    match opts.dict.unwrap_or(DictPolicy::Illegal) {
        DictPolicy::Illegal => Err(MergeError::Unmergeable(
            "dict merging is restricted via config".to_string(),
        )),
        DictPolicy::UnionRecursive => {
            // Node-local merge-opts on the base dict take effect for every
            // merge performed at or below this node.
            let curr = match base_map.get(MERGE_OPTS_KEY) {
                Some(over) => opts.overlay(MergeOptions::from_value(over)?),
                None => opts,
            };
            let mut out = base_map;
            for (key, extend_value) in extend_map {
                match out.get_mut(&key) {
                    Some(slot) => {
                        tracing::debug!("merging shared key '{key}'");
                        let base_value = std::mem::replace(slot, Value::Null);
                        *slot = merge(base_value, extend_value, curr)?;
                    }
                    None => {
                        out.insert(key, extend_value);
                    }
                }
            }
            Ok(Value::Dict(out))
        }
        DictPolicy::UnionAddOnly => {
            let overlap: Vec<&String> = extend_map
                .keys()
                .filter(|key| base_map.contains_key(*key))
                .collect();
            if !overlap.is_empty() {
                return Err(MergeError::Unmergeable(format!(
                    "non-empty keys intersection: {overlap:?}"
                )));
            }
            let mut out = base_map;
            out.extend(extend_map);
            Ok(Value::Dict(out))
        }
        DictPolicy::Preserve => Ok(Value::Dict(base_map)),
        DictPolicy::Overwrite => Ok(Value::Dict(extend_map)),
    }
}

fn merge_scalar(base: Value, extend: Value, opts: MergeOptions) -> Result<Value, MergeError> {
    if extend.kind() != Kind::Scalar {
        return Err(MergeError::NonMatchingTypes {
            base: "scalar",
            extend: extend.type_name(),
        });
    }

    // A scalar type mismatch is always an error, regardless of policy.
    if base.type_name() != extend.type_name() {
        return Err(MergeError::Unmergeable(format!(
            "values of different types cannot be merged ({} vs {})",
            base.type_name(),
            extend.type_name()
        )));
    }

    match opts.value.unwrap_or(ValuePolicy::Illegal) {
        ValuePolicy::Illegal => Err(MergeError::Unmergeable(
            "value merging is restricted via config".to_string(),
        )),
        ValuePolicy::Preserve => Ok(base),
        ValuePolicy::Overwrite => Ok(extend),
    }
}
