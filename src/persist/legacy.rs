use std::collections::BTreeMap;

use crate::errors::PersistError;
use crate::schema::ObjectKind;
use crate::schema::SchemaCatalog;
use crate::store::ConfigObject;
use crate::store::ConfigTree;
use crate::value::ConfigValue;
use crate::value::PropertyBag;
use crate::value::PropertyKey;

/// Render the tree as the legacy flat configuration file.
///
/// Line format is `<ObjectType>.<Field>.<Name> = <value>` for composite
/// instances and array entries (arrays use the entry index as the name),
/// `<ObjectType>.Value = <value>` for singletons. Lines starting with
/// `#` or `*` are comments.
pub fn tree_to_legacy(tree: &ConfigTree) -> String {
    let mut out = String::new();
    out.push_str("# Dynamic server configuration\n");
    out.push_str("# This file is rewritten on every accepted change; do not edit.\n");
    for (object_type, object) in tree {
        match object {
            ConfigObject::Singleton(value) => {
                push_line(
                    &mut out,
                    &PropertyKey::singleton(object_type, "Value"),
                    value,
                );
            }
            ConfigObject::Composite(instances) => {
                for (name, bag) in instances {
                    for (field, value) in bag {
                        push_line(
                            &mut out,
                            &PropertyKey::composite(object_type, field, name),
                            value,
                        );
                    }
                }
            }
            ConfigObject::Array(entries) => {
                for (index, entry) in entries.iter().enumerate() {
                    match entry {
                        ConfigValue::Object(bag) => {
                            for (field, value) in bag {
                                push_line(
                                    &mut out,
                                    &PropertyKey::composite(
                                        object_type,
                                        field,
                                        index.to_string(),
                                    ),
                                    value,
                                );
                            }
                        }
                        scalar => push_line(
                            &mut out,
                            &PropertyKey::composite(object_type, "Entry", index.to_string()),
                            scalar,
                        ),
                    }
                }
            }
        }
    }
    out
}

fn push_line(out: &mut String, key: &PropertyKey, value: &ConfigValue) {
    out.push_str(&format!("{} = {}\n", key, value.to_legacy_string()));
}

/// Parse a legacy flat configuration file back into a tree.
///
/// The schema catalog decides each type's shape; unknown types are
/// treated as composites so foreign lines survive a round trip.
pub fn legacy_to_tree(content: &str, catalog: &SchemaCatalog) -> Result<ConfigTree, PersistError> {
    let mut tree = ConfigTree::new();
    // Array entries are grouped by index before insertion.
    let mut array_entries: BTreeMap<String, BTreeMap<usize, PropertyBag>> = BTreeMap::new();

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('*') {
            continue;
        }
        let (key_part, value_part) =
            line.split_once('=')
                .ok_or_else(|| PersistError::MalformedLegacyLine {
                    line: line_no + 1,
                    content: line.to_string(),
                })?;
        let key = PropertyKey::parse(key_part.trim(), line_no + 1)?;
        let value = parse_scalar(value_part.trim());

        let kind = catalog
            .get(&key.object_type)
            .map(|schema| schema.kind)
            .unwrap_or(ObjectKind::Composite);

        match kind {
            ObjectKind::Singleton => {
                tree.insert(key.object_type.clone(), ConfigObject::Singleton(value));
            }
            ObjectKind::Composite => {
                let name = key.instance.clone().unwrap_or_default();
                let entry = tree
                    .entry(key.object_type.clone())
                    .or_insert_with(|| ConfigObject::Composite(BTreeMap::new()));
                if let ConfigObject::Composite(instances) = entry {
                    instances
                        .entry(name)
                        .or_default()
                        .insert(key.field.clone(), value);
                }
            }
            ObjectKind::ArrayOfScalars => {
                let index: usize = key
                    .instance
                    .as_deref()
                    .and_then(|i| i.parse().ok())
                    .ok_or_else(|| PersistError::MalformedLegacyLine {
                        line: line_no + 1,
                        content: line.to_string(),
                    })?;
                array_entries
                    .entry(key.object_type.clone())
                    .or_default()
                    .entry(index)
                    .or_default()
                    .insert(key.field.clone(), value);
            }
        }
    }

    for (object_type, by_index) in array_entries {
        let entries = by_index
            .into_values()
            .map(ConfigValue::Object)
            .collect();
        tree.insert(object_type, ConfigObject::Array(entries));
    }
    Ok(tree)
}

/// Legacy values are untyped text; integers and booleans are recovered,
/// everything else stays a string. Also used by the v1 replication
/// replay path.
pub(crate) fn parse_scalar(text: &str) -> ConfigValue {
    if let Ok(n) = text.parse::<i64>() {
        return ConfigValue::Int(n);
    }
    match text {
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        other => ConfigValue::String(other.to_string()),
    }
}
