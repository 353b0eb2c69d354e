//! The meta-normalizer: rewrite bare sequences into `{list: …}` containers.
//!
//! After normalization every node reachable without following the reserved
//! `list` key is a mapping or a scalar, never a bare sequence. This gives
//! every list a mapping around it where metadata (most importantly
//! `merge-opts`) can be attached:
//!
//! ```yaml
//! some_list:
//!   - a
//!   - b
//! ```
//!
//! and
//!
//! ```yaml
//! some_list:
//!   merge-opts:   # applies only to this list
//!     list: illegal
//!   list:
//!     - a
//!     - b
//! ```
//!
//! are equivalent shapes once normalized. Normalization is idempotent: a
//! sequence that is already the value of a `list` key is normalized element
//! by element without being wrapped again.

use crate::config::value::{Map, Value};
use crate::config::{FROM_KEY, LIST_KEY};

/// Normalize a raw parsed document.
///
/// Wraps bare sequences, coerces a non-sequence `from` value into a
/// single-element sequence (inheritance directives always resolve against a
/// list of bases), and leaves scalars untouched.
#[must_use]
pub fn normalize(value: Value) -> Value {
    normalize_inner(value, false)
}

/// True when a `from` value is already a list of bases: either a bare
/// sequence or the wrapped `{list: […]}` container form an author (or a
/// previous normalization pass) may have produced.
fn is_base_list(value: &Value) -> bool {
    match value {
        Value::List(_) => true,
        Value::Dict(map) => map.contains_key(LIST_KEY),
        _ => false,
    }
}

fn normalize_inner(value: Value, in_list_position: bool) -> Value {
    match value {
        Value::List(items) => {
            let items: Vec<Value> = items
                .into_iter()
                .map(|item| normalize_inner(item, false))
                .collect();
            if in_list_position {
                Value::List(items)
            } else {
                let mut wrapper = Map::with_capacity(1);
                wrapper.insert(LIST_KEY.to_string(), Value::List(items));
                Value::Dict(wrapper)
            }
        }
        Value::Dict(map) => Value::Dict(
            map.into_iter()
                .map(|(key, val)| {
                    let val = if key == FROM_KEY && !is_base_list(&val) {
                        Value::List(vec![val])
                    } else {
                        val
                    };
                    if key == LIST_KEY && !val.is_list() {
                        // A literal `list` key holding a non-sequence collides
                        // with the internal wrapper key. Known ambiguity in
                        // the format; flag it and carry on.
                        tracing::warn!(
                            "mapping declares a literal '{LIST_KEY}' key with a {} value; \
                             '{LIST_KEY}' is reserved for the internal list wrapper",
                            val.type_name()
                        );
                    }
                    let normalized = normalize_inner(val, key == LIST_KEY);
                    (key, normalized)
                })
                .collect(),
        ),
        scalar => scalar,
    }
}
