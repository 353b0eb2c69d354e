//! The inheritance resolver: expand `from` directives into merged trees.
//!
//! Walks the normalized tree depth-first. At every dict the ambient merge
//! options are overlaid with the node's own `merge-opts`, children are
//! resolved with the effective options, and then any `from` bases are folded
//! left-to-right with [`merge`] before the node's own fields are merged on
//! top. Under the default policies this means a later base wins over an
//! earlier one on conflicting scalars, and the node's locally-declared
//! values win over all bases.
//!
//! Merge failures propagate unmodified up through the recursion; there is no
//! partial resolution.

use crate::config::merge::{MergeOptions, merge};
use crate::config::value::{Map, Value};
use crate::config::{FROM_KEY, LIST_KEY, MERGE_OPTS_KEY};
use crate::error::MergeError;

/// Resolve all `from` directives in a normalized value.
///
/// `opts` is the ambient merge policy inherited from ancestors; pass
/// [`MergeOptions::root`] at the document root.
///
/// # Errors
///
/// Returns [`MergeError`] when a directive's bases cannot be merged under
/// the effective policy, or when a `merge-opts` mapping is malformed.
pub fn resolve(value: Value, opts: MergeOptions) -> Result<Value, MergeError> {
    match value {
        Value::Dict(map) => resolve_dict(map, opts),
        Value::List(items) => Ok(Value::List(
            items
                .into_iter()
                .map(|item| resolve(item, opts))
                .collect::<Result<_, _>>()?,
        )),
        scalar => Ok(scalar),
    }
}

fn resolve_dict(map: Map, opts: MergeOptions) -> Result<Value, MergeError> {
    // Node-local merge-opts override the inherited policy for every merge
    // performed at or below this node.
    let effective = match map.get(MERGE_OPTS_KEY) {
        Some(over) => opts.overlay(MergeOptions::from_value(over)?),
        None => opts,
    };

    let mut resolved = Map::with_capacity(map.len());
    for (key, val) in map {
        resolved.insert(key, resolve(val, effective)?);
    }

    // shift_remove keeps the order of the remaining keys intact.
    let Some(from_value) = resolved.shift_remove(FROM_KEY) else {
        return Ok(Value::Dict(resolved));
    };

    let mut bases = unwrap_bases(from_value).into_iter();
    let Some(first) = bases.next() else {
        // `from: []` — nothing to inherit.
        return Ok(Value::Dict(resolved));
    };

    tracing::debug!("folding inheritance bases");
    let mut folded = first;
    for base in bases {
        folded = merge(folded, base, effective)?;
    }

    // The node's own fields merge last, on top of all folded bases.
    merge(folded, Value::Dict(resolved), effective)
}

/// Unwrap a normalized `from` value into its list of bases.
///
/// After normalization the value is a `{list: […]}` container; bare lists
/// and single values are accepted for robustness.
fn unwrap_bases(value: Value) -> Vec<Value> {
    match value {
        Value::Dict(mut map) if map.contains_key(LIST_KEY) => {
            match map.shift_remove(LIST_KEY) {
                Some(Value::List(items)) => items,
                Some(single) => vec![single],
                None => Vec::new(),
            }
        }
        Value::List(items) => items,
        single => vec![single],
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::normalize::normalize;

    fn yaml(source: &str) -> Value {
        Value::from_yaml_str(source, "<test>").unwrap()
    }

    /// Normalize then resolve under the root policy.
    fn run(source: &str) -> Result<Value, MergeError> {
        resolve(normalize(yaml(source)), MergeOptions::root())
    }

    #[test]
    fn dict_without_from_passes_through() {
        let resolved = run("{a: 1, b: {c: 2}}").unwrap();
        assert_eq!(resolved, yaml("{a: 1, b: {c: 2}}"));
    }

    #[test]
    fn from_key_no_longer_appears_after_resolution() {
        let resolved = run("{from: {x: 0}, y: 1}").unwrap();
        assert!(resolved.get(FROM_KEY).is_none());
        assert_eq!(resolved.get("x"), Some(&yaml("0")));
        assert_eq!(resolved.get("y"), Some(&yaml("1")));
    }

    #[test]
    fn later_base_wins_and_own_fields_win_over_all() {
        let resolved = run("{from: [{x: 0, y: 0}, {x: 2, z: 2}], x: 1}").unwrap();
        assert_eq!(resolved.get("x"), Some(&yaml("1")));
        assert_eq!(resolved.get("y"), Some(&yaml("0")));
        assert_eq!(resolved.get("z"), Some(&yaml("2")));
    }

    #[test]
    fn lists_append_under_default_policy() {
        let resolved = run("{from: {xs: [1, 2]}, xs: [3, 4]}").unwrap();
        assert_eq!(resolved.get("xs"), Some(&yaml("{list: [1, 2, 3, 4]}")));
    }

    #[test]
    fn local_merge_opts_override_ambient_before_from_merge() {
        // The end-to-end scenario: list policy flipped to overwrite at the
        // node, so the local list replaces the inherited one.
        let resolved =
            run("{merge-opts: {list: overwrite}, from: {a: [1, 2]}, a: [3, 4]}").unwrap();
        assert_eq!(resolved.get("a"), Some(&yaml("{list: [3, 4]}")));
    }

    #[test]
    fn merge_opts_scope_covers_descendants() {
        let resolved = run(
            "{outer: {merge-opts: {list: prepend}, inner: {from: {xs: [1]}, xs: [2]}}}",
        )
        .unwrap();
        let xs = resolved.get("outer").unwrap().get("inner").unwrap().get("xs");
        assert_eq!(xs, Some(&yaml("{list: [2, 1]}")));
    }

    #[test]
    fn authored_wrapped_from_list_merges_its_bases() {
        // `from: {list: […]}` is the wrapped container form spelled out by
        // hand; its bases merge exactly like the bare-sequence spelling.
        let resolved = run("{from: {list: [{a: 1}, {b: 2}]}, c: 3}").unwrap();
        assert_eq!(resolved.get("a"), Some(&yaml("1")));
        assert_eq!(resolved.get("b"), Some(&yaml("2")));
        assert_eq!(resolved.get("c"), Some(&yaml("3")));
        assert!(resolved.get(LIST_KEY).is_none());
    }

    #[test]
    fn empty_from_list_is_a_noop() {
        let resolved = run("{from: [], a: 1}").unwrap();
        assert_eq!(resolved, yaml("{a: 1}"));
    }

    #[test]
    fn nested_from_inside_base_resolves_first() {
        let resolved = run("{from: {inner: {from: {deep: 1}, shallow: 2}}, top: 3}").unwrap();
        let inner = resolved.get("inner").unwrap();
        assert_eq!(inner.get("deep"), Some(&yaml("1")));
        assert_eq!(inner.get("shallow"), Some(&yaml("2")));
        assert_eq!(resolved.get("top"), Some(&yaml("3")));
    }

    #[test]
    fn merge_failure_propagates_unmodified() {
        // Scalar type mismatch between base and extend.
        let err = run("{from: {x: 1}, x: one}").unwrap_err();
        assert!(matches!(err, MergeError::Unmergeable(_)));
    }

    #[test]
    fn illegal_merge_opts_string_surfaces_immediately() {
        let err = run("{merge-opts: {dict: sideways}, a: 1}").unwrap_err();
        assert!(matches!(err, MergeError::IllegalOption(_)));
    }

    #[test]
    fn merge_opts_key_survives_resolution() {
        // Structural markers are consumed later by the tree layer.
        let resolved = run("{merge-opts: {list: append}, a: 1}").unwrap();
        assert!(resolved.get(MERGE_OPTS_KEY).is_some());
    }
}
