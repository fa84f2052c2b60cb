use std::collections::BTreeMap;

use crate::persist::legacy_to_tree;
use crate::persist::tree_to_legacy;
use crate::schema::builtin_catalog;
use crate::store::ConfigObject;
use crate::store::ConfigTree;
use crate::value::ConfigValue;
use crate::value::PropertyBag;

fn bag(entries: &[(&str, ConfigValue)]) -> PropertyBag {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn sample_tree() -> ConfigTree {
    let mut tree = ConfigTree::new();
    tree.insert(
        "LogLevel".to_string(),
        ConfigObject::Singleton("NORMAL".into()),
    );
    tree.insert(
        "FIPS".to_string(),
        ConfigObject::Singleton(ConfigValue::Bool(false)),
    );
    let mut endpoints = BTreeMap::new();
    endpoints.insert(
        "ep1".to_string(),
        bag(&[
            ("Port", ConfigValue::Int(1883)),
            ("Interface", "All".into()),
        ]),
    );
    tree.insert("Endpoint".to_string(), ConfigObject::Composite(endpoints));
    tree.insert(
        "TopicMonitor".to_string(),
        ConfigObject::Array(vec![
            ConfigValue::Object(bag(&[("TopicString", "a/+".into())])),
            ConfigValue::Object(bag(&[("TopicString", "b/#".into())])),
        ]),
    );
    tree
}

#[test]
fn test_legacy_line_format() {
    let content = tree_to_legacy(&sample_tree());

    assert!(content.contains("LogLevel.Value = NORMAL\n"));
    assert!(content.contains("FIPS.Value = false\n"));
    assert!(content.contains("Endpoint.Port.ep1 = 1883\n"));
    assert!(content.contains("Endpoint.Interface.ep1 = All\n"));
    assert!(content.contains("TopicMonitor.TopicString.0 = a/+\n"));
    assert!(content.contains("TopicMonitor.TopicString.1 = b/#\n"));
}

#[test]
fn test_legacy_round_trip() {
    let catalog = builtin_catalog();
    let tree = sample_tree();

    let parsed = legacy_to_tree(&tree_to_legacy(&tree), &catalog).unwrap();
    assert_eq!(parsed, tree);
}

#[test]
fn test_comments_and_blank_lines_skipped() {
    let catalog = builtin_catalog();
    let content = "# a comment\n\n* another comment style\nLogLevel.Value = MAX\n";

    let tree = legacy_to_tree(content, &catalog).unwrap();
    assert_eq!(
        tree.get("LogLevel"),
        Some(&ConfigObject::Singleton("MAX".into()))
    );
}

#[test]
fn test_scalar_recovery() {
    let catalog = builtin_catalog();
    let content = "Endpoint.Port.ep1 = 8883\n\
                   Endpoint.Enabled.ep1 = true\n\
                   Endpoint.Description.ep1 = listens on 8883\n";

    let tree = legacy_to_tree(content, &catalog).unwrap();
    let ConfigObject::Composite(instances) = tree.get("Endpoint").unwrap() else {
        panic!("Endpoint should parse as a composite");
    };
    let ep1 = &instances["ep1"];
    assert_eq!(ep1.get("Port"), Some(&ConfigValue::Int(8883)));
    assert_eq!(ep1.get("Enabled"), Some(&ConfigValue::Bool(true)));
    assert_eq!(
        ep1.get("Description"),
        Some(&ConfigValue::String("listens on 8883".to_string()))
    );
}

#[test]
fn test_malformed_line_reports_position() {
    let catalog = builtin_catalog();
    let content = "LogLevel.Value = NORMAL\nthis line has no equals sign\n";

    let err = legacy_to_tree(content, &catalog).unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_unknown_type_parses_as_composite() {
    let catalog = builtin_catalog();
    let content = "FutureObject.Setting.inst1 = 42\n";

    let tree = legacy_to_tree(content, &catalog).unwrap();
    let ConfigObject::Composite(instances) = tree.get("FutureObject").unwrap() else {
        panic!("unknown types default to the composite shape");
    };
    assert_eq!(
        instances["inst1"].get("Setting"),
        Some(&ConfigValue::Int(42))
    );
}
