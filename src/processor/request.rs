use crate::errors::RequestError;
use crate::errors::Result;
use crate::value::ConfigValue;
use crate::value::PropertyBag;

/// Request keys with pipeline meaning; everything else in the flat
/// message is an object property.
const RESERVED_KEYS: [&str; 12] = [
    "Action",
    "Component",
    "Item",
    "Name",
    "Type",
    "Update",
    "Delete",
    "UID",
    "ObjectIdField",
    "Version",
    "StandbyForce",
    "ResultOnPrimary",
];

/// One parsed configuration change request.
///
/// Callers (REST layer, legacy loader, HA receiver) all funnel through
/// this shape: the reserved keys become typed fields, the remaining keys
/// become the property overlay handed to merge and validation.
#[derive(Debug, Clone, Default)]
pub struct ChangeRequest {
    pub action: Option<String>,
    pub component: Option<String>,
    pub item: String,
    pub name: Option<String>,
    pub composite: bool,
    pub update: bool,
    pub delete: bool,
    pub uid: Option<String>,
    pub object_id_field: Option<String>,
    pub version: Option<String>,
    pub standby_force: bool,
    pub result_on_primary: Option<String>,
    pub properties: PropertyBag,
}

impl ChangeRequest {
    /// Parse the flat JSON change message.
    pub fn from_json(message: &serde_json::Value) -> Result<Self> {
        let map = message
            .as_object()
            .ok_or(RequestError::NullPointer("request body"))?;

        let item = get_string(map, "Item")
            .ok_or(RequestError::NullPointer("Item"))?;

        let mut properties = PropertyBag::new();
        for (key, value) in map {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let converted = ConfigValue::from_json(value).ok_or_else(|| {
                RequestError::ArgNotValid(format!("property {key} has an unsupported value"))
            })?;
            properties.insert(key.clone(), converted);
        }

        Ok(Self {
            action: get_string(map, "Action"),
            component: get_string(map, "Component"),
            item,
            name: get_string(map, "Name").filter(|n| !n.is_empty()),
            composite: get_string(map, "Type")
                .map(|t| t.eq_ignore_ascii_case("composite"))
                .unwrap_or(false),
            update: get_flag(map, "Update"),
            delete: get_flag(map, "Delete"),
            uid: get_string(map, "UID").filter(|u| !u.is_empty()),
            object_id_field: get_string(map, "ObjectIdField"),
            version: get_string(map, "Version"),
            standby_force: get_flag(map, "StandbyForce"),
            result_on_primary: get_string(map, "ResultOnPrimary"),
            properties,
        })
    }

    /// Builder-style constructor for programmatic callers.
    pub fn set(item: impl Into<String>) -> Self {
        Self {
            action: Some("set".to_string()),
            item: item.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.composite = true;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn updating(mut self) -> Self {
        self.update = true;
        self
    }

    pub fn deleting(mut self) -> Self {
        self.delete = true;
        self
    }
}

fn get_string(map: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    map.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Request flags arrive either as JSON booleans or as the legacy "true"
/// string.
fn get_flag(map: &serde_json::Map<String, serde_json::Value>, key: &str) -> bool {
    match map.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
