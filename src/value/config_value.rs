use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Ordered property mapping of a single object instance.
///
/// BTreeMap keeps serialization deterministic, which the persisted-file
/// round-trip and the replication wire format both rely on.
pub type PropertyBag = BTreeMap<String, ConfigValue>;

/// Tagged union for configuration values.
///
/// Scalars are string, integer, boolean or null; null signals "use the
/// schema default" (or "delete this instance" for deletable composites).
/// Arrays and objects only appear for array-typed objects and nested
/// composites respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(PropertyBag),
}

impl ConfigValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Empty string and null are both "unset" in change requests.
    pub fn is_unset(&self) -> bool {
        match self {
            ConfigValue::Null => true,
            ConfigValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PropertyBag> {
        match self {
            ConfigValue::Object(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// JSON type name used in validation error context.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Int(_) => "number",
            ConfigValue::String(_) => "string",
            ConfigValue::Array(_) => "array",
            ConfigValue::Object(_) => "object",
        }
    }

    /// Lossless conversion from a parsed JSON value. Non-integer numbers
    /// have no configuration meaning and are rejected by returning None.
    pub fn from_json(value: &serde_json::Value) -> Option<ConfigValue> {
        match value {
            serde_json::Value::Null => Some(ConfigValue::Null),
            serde_json::Value::Bool(b) => Some(ConfigValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(ConfigValue::Int),
            serde_json::Value::String(s) => Some(ConfigValue::String(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(ConfigValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(ConfigValue::Array),
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| ConfigValue::from_json(v).map(|cv| (k.clone(), cv)))
                .collect::<Option<PropertyBag>>()
                .map(ConfigValue::Object),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ConfigValue::Null => serde_json::Value::Null,
            ConfigValue::Bool(b) => serde_json::Value::Bool(*b),
            ConfigValue::Int(n) => serde_json::Value::from(*n),
            ConfigValue::String(s) => serde_json::Value::String(s.clone()),
            ConfigValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(ConfigValue::to_json).collect())
            }
            ConfigValue::Object(bag) => serde_json::Value::Object(
                bag.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Render a scalar the way the legacy key=value file stores it.
    pub fn to_legacy_string(&self) -> String {
        match self {
            ConfigValue::Null => String::new(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Int(n) => n.to_string(),
            ConfigValue::String(s) => s.clone(),
            // Non-scalars never appear in legacy lines; JSON text is a
            // readable fallback for diagnostics.
            other => serde_json::to_string(&other.to_json()).unwrap_or_default(),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Int(n)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}
