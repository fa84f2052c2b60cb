use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use crate::errors::PersistError;
use crate::store::ConfigObject;
use crate::store::ConfigTree;
use crate::value::ConfigValue;
use crate::value::PropertyBag;

/// Version tag of the current JSON document format.
pub const CONFIG_DOC_VERSION: &str = "2.0";

/// Document keys that describe the file itself rather than an object.
const DOC_META_KEYS: [&str; 3] = ["Version", "ServerVersion", "ServerName"];

/// Serialize the tree as the single JSON configuration document.
pub fn tree_to_document(tree: &ConfigTree, server_name: &str, server_version: &str) -> Value {
    let mut doc = Map::new();
    doc.insert("Version".to_string(), json!(CONFIG_DOC_VERSION));
    doc.insert("ServerVersion".to_string(), json!(server_version));
    doc.insert("ServerName".to_string(), json!(server_name));
    for (object_type, object) in tree {
        let value = match object {
            ConfigObject::Singleton(value) => value.to_json(),
            ConfigObject::Composite(instances) => Value::Object(
                instances
                    .iter()
                    .map(|(name, bag)| (name.clone(), bag_to_json(bag)))
                    .collect(),
            ),
            ConfigObject::Array(entries) => {
                Value::Array(entries.iter().map(ConfigValue::to_json).collect())
            }
        };
        doc.insert(object_type.clone(), value);
    }
    Value::Object(doc)
}

/// Rebuild the tree from a parsed JSON document. The object kind is
/// recovered from the JSON shape: objects are composites, arrays are
/// array types, scalars are singletons.
pub fn document_to_tree(doc: &Value) -> Result<ConfigTree, PersistError> {
    let map = doc.as_object().ok_or_else(|| {
        PersistError::Serialize(serde::de::Error::custom("document root must be an object"))
    })?;

    let mut tree = ConfigTree::new();
    for (key, value) in map {
        if DOC_META_KEYS.contains(&key.as_str()) {
            continue;
        }
        let object = match value {
            Value::Object(instances) => {
                let mut composite = std::collections::BTreeMap::new();
                for (name, props) in instances {
                    composite.insert(name.clone(), json_to_bag(props)?);
                }
                ConfigObject::Composite(composite)
            }
            Value::Array(entries) => {
                let mut converted = Vec::with_capacity(entries.len());
                for entry in entries {
                    converted.push(convert(entry)?);
                }
                ConfigObject::Array(converted)
            }
            scalar => ConfigObject::Singleton(convert(scalar)?),
        };
        tree.insert(key.clone(), object);
    }
    Ok(tree)
}

/// Version string of a document, when present.
pub fn document_version(doc: &Value) -> Option<&str> {
    doc.get("Version").and_then(Value::as_str)
}

fn bag_to_json(bag: &PropertyBag) -> Value {
    Value::Object(bag.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

fn json_to_bag(value: &Value) -> Result<PropertyBag, PersistError> {
    match convert(value)? {
        ConfigValue::Object(bag) => Ok(bag),
        other => Err(PersistError::Serialize(serde::de::Error::custom(format!(
            "expected an object instance, found {}",
            other.type_name()
        )))),
    }
}

fn convert(value: &Value) -> Result<ConfigValue, PersistError> {
    ConfigValue::from_json(value).ok_or_else(|| {
        PersistError::Serialize(serde::de::Error::custom(
            "non-integer numbers are not valid configuration values",
        ))
    })
}
