use serde_json::json;

use crate::value::ConfigValue;
use crate::value::PropertyKey;

#[test]
fn test_from_json_scalars() {
    assert_eq!(
        ConfigValue::from_json(&json!("mqtt")),
        Some(ConfigValue::String("mqtt".into()))
    );
    assert_eq!(
        ConfigValue::from_json(&json!(1883)),
        Some(ConfigValue::Int(1883))
    );
    assert_eq!(
        ConfigValue::from_json(&json!(true)),
        Some(ConfigValue::Bool(true))
    );
    assert_eq!(ConfigValue::from_json(&json!(null)), Some(ConfigValue::Null));
}

#[test]
fn test_from_json_rejects_floats() {
    assert_eq!(ConfigValue::from_json(&json!(1.5)), None);
    assert_eq!(ConfigValue::from_json(&json!({"Port": 1.5})), None);
}

#[test]
fn test_json_round_trip() {
    let original = json!({
        "Port": 1883,
        "Enabled": true,
        "Interface": "all",
        "TopicPolicies": null,
    });
    let value = ConfigValue::from_json(&original).unwrap();
    assert_eq!(value.to_json(), original);
}

#[test]
fn test_unset_semantics() {
    assert!(ConfigValue::Null.is_unset());
    assert!(ConfigValue::String(String::new()).is_unset());
    assert!(!ConfigValue::String("x".into()).is_unset());
    assert!(!ConfigValue::Int(0).is_unset());
}

#[test]
fn test_property_key_display_and_parse() {
    let key = PropertyKey::composite("Endpoint", "Port", "ep1");
    assert_eq!(key.to_string(), "Endpoint.Port.ep1");
    assert_eq!(PropertyKey::parse("Endpoint.Port.ep1", 1).unwrap(), key);

    let singleton = PropertyKey::singleton("Server", "LogLevel");
    assert_eq!(singleton.to_string(), "Server.LogLevel");
    assert_eq!(PropertyKey::parse("Server.LogLevel", 1).unwrap(), singleton);
}

#[test]
fn test_property_key_instance_may_contain_dots() {
    let key = PropertyKey::parse("Endpoint.Port.my.dotted.name", 7).unwrap();
    assert_eq!(key.object_type, "Endpoint");
    assert_eq!(key.field, "Port");
    assert_eq!(key.instance.as_deref(), Some("my.dotted.name"));
}

#[test]
fn test_property_key_rejects_bare_token() {
    assert!(PropertyKey::parse("Endpoint", 3).is_err());
}
