//! The raw document value model.
//!
//! [`Value`] is a tagged union over everything a parsed YAML/JSON document
//! can contain. All later stages (normalization, merging, inheritance
//! resolution, the navigable tree) operate on this one representation, so
//! runtime type questions are answered by pattern matching rather than
//! downcasting.
//!
//! Mapping entries keep their authored order for display; no semantics
//! depend on it.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::ConfigError;

/// Ordered string-keyed mapping used for dict values.
pub type Map = IndexMap<String, Value>;

/// A parsed document value: scalar, sequence, or string-keyed mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// YAML `null` / JSON `null`.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// String-keyed mapping, insertion-ordered.
    Dict(Map),
}

/// Structural kind of a [`Value`], used for merge dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Any non-container value.
    Scalar,
    /// A sequence.
    List,
    /// A mapping.
    Dict,
}

impl Value {
    /// Structural kind of this value.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::List(_) => Kind::List,
            Self::Dict(_) => Kind::Dict,
            _ => Kind::Scalar,
        }
    }

    /// Fine-grained type name for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }

    /// True if this value is a mapping.
    #[must_use]
    pub const fn is_dict(&self) -> bool {
        matches!(self, Self::Dict(_))
    }

    /// True if this value is a sequence.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Borrow the mapping, if this is one.
    #[must_use]
    pub const fn as_dict(&self) -> Option<&Map> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the sequence, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key, if this is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_dict().and_then(|map| map.get(key))
    }

    /// Render the value for inline string interpolation.
    ///
    /// Scalars render bare (`null`, `true`, `42`, the string itself);
    /// containers render as compact JSON so the result stays on one line.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::List(_) | Self::Dict(_) => {
                serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
            }
        }
    }

    /// Render the value as YAML for diagnostics and the `show` command.
    #[must_use]
    pub fn to_yaml_string(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// Parse a YAML document into a [`Value`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid YAML and
    /// [`ConfigError::NonStringKey`] when a mapping key is not a string.
    pub fn from_yaml_str(source: &str, path: &str) -> Result<Self, ConfigError> {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(source).map_err(|err| ConfigError::Parse {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        Self::from_yaml(parsed)
    }

    /// Parse a JSON document into a [`Value`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid JSON.
    pub fn from_json_str(source: &str, path: &str) -> Result<Self, ConfigError> {
        let parsed: serde_json::Value =
            serde_json::from_str(source).map_err(|err| ConfigError::Parse {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self::from_json(parsed))
    }

    /// Convert a [`serde_yaml::Value`] into a [`Value`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonStringKey`] when a mapping key is not a
    /// string.
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Self, ConfigError> {
        match value {
            serde_yaml::Value::Null => Ok(Self::Null),
            serde_yaml::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_yaml::Value::Number(n) => Ok(n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or_default()),
                Self::Int,
            )),
            serde_yaml::Value::String(s) => Ok(Self::String(s)),
            serde_yaml::Value::Sequence(items) => Ok(Self::List(
                items
                    .into_iter()
                    .map(Self::from_yaml)
                    .collect::<Result<_, _>>()?,
            )),
            serde_yaml::Value::Mapping(mapping) => {
                let mut map = Map::with_capacity(mapping.len());
                for (key, val) in mapping {
                    let serde_yaml::Value::String(key) = key else {
                        return Err(ConfigError::NonStringKey(format!("{key:?}")));
                    };
                    map.insert(key, Self::from_yaml(val)?);
                }
                Ok(Self::Dict(map))
            }
            serde_yaml::Value::Tagged(tagged) => Self::from_yaml(tagged.value),
        }
    }

    /// Convert a [`serde_json::Value`] into a [`Value`].
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or_default()),
                Self::Int,
            ),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(object) => Self::Dict(
                object
                    .into_iter()
                    .map(|(key, val)| (key, Self::from_json(val)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Dict(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, val) in map {
                    out.serialize_entry(key, val)?;
                }
                out.end()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn parse_yaml_scalars_and_containers() {
        let v = Value::from_yaml_str("a: 1\nb: [x, true]\nc: 1.5\nd: ~\n", "<inline>").unwrap();
        let map = v.as_dict().unwrap();
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(
            map["b"],
            Value::List(vec![Value::String("x".to_string()), Value::Bool(true)])
        );
        assert_eq!(map["c"], Value::Float(1.5));
        assert_eq!(map["d"], Value::Null);
    }

    #[test]
    fn parse_yaml_preserves_key_order() {
        let v = Value::from_yaml_str("zebra: 1\nalpha: 2\nmid: 3\n", "<inline>").unwrap();
        let keys: Vec<&String> = v.as_dict().unwrap().keys().collect();
        assert_eq!(keys, ["zebra", "alpha", "mid"]);
    }

    #[test]
    fn parse_yaml_rejects_non_string_keys() {
        let err = Value::from_yaml_str("1: x\n", "<inline>").unwrap_err();
        assert!(err.to_string().contains("Mapping keys must be strings"));
    }

    #[test]
    fn parse_json_document() {
        let v = Value::from_json_str(r#"{"a": [1, 2], "b": null}"#, "<inline>").unwrap();
        assert_eq!(
            v.get("a"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(v.get("b"), Some(&Value::Null));
    }

    #[test]
    fn kind_dispatch() {
        assert_eq!(Value::Null.kind(), Kind::Scalar);
        assert_eq!(Value::String("x".to_string()).kind(), Kind::Scalar);
        assert_eq!(Value::List(Vec::new()).kind(), Kind::List);
        assert_eq!(Value::Dict(Map::new()).kind(), Kind::Dict);
    }

    #[test]
    fn display_string_scalars() {
        assert_eq!(Value::Null.display_string(), "null");
        assert_eq!(Value::Bool(true).display_string(), "true");
        assert_eq!(Value::Int(42).display_string(), "42");
        assert_eq!(Value::String("home".to_string()).display_string(), "home");
    }

    #[test]
    fn display_string_containers_are_compact_json() {
        let v = Value::List(vec![Value::Int(1), Value::String("a".to_string())]);
        assert_eq!(v.display_string(), r#"[1,"a"]"#);
    }

    #[test]
    fn yaml_round_trip_through_serialize() {
        let v = Value::from_yaml_str("a:\n  b: [1, 2]\n", "<inline>").unwrap();
        let rendered = v.to_yaml_string();
        let back = Value::from_yaml_str(&rendered, "<inline>").unwrap();
        assert_eq!(v, back);
    }
}
