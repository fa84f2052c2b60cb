use std::collections::BTreeMap;

use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use crate::errors::SyncError;
use crate::persist::parse_scalar;
use crate::persist::CONFIG_DOC_VERSION;
use crate::processor::AppliedChange;
use crate::processor::ChangeRequest;
use crate::schema::ObjectKind;
use crate::schema::SchemaCatalog;
use crate::value::ConfigValue;
use crate::value::PropertyKey;

/// Envelope names used by the bridge-process variant of the protocol.
/// The plain node-to-node channel sends the body without an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// First message of a full resync stream.
    Initial,
    /// Steady-state create/update.
    Change,
    /// Steady-state delete.
    Delete,
}

impl EnvelopeKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            EnvelopeKind::Initial => "ConfigurationInitial",
            EnvelopeKind::Change => "Configuration",
            EnvelopeKind::Delete => "ConfigurationDelete",
        }
    }

    fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "ConfigurationInitial" => Some(EnvelopeKind::Initial),
            "Configuration" => Some(EnvelopeKind::Change),
            "ConfigurationDelete" => Some(EnvelopeKind::Delete),
            _ => None,
        }
    }
}

/// A decoded replication payload.
#[derive(Debug)]
pub enum SyncPayload {
    /// Current self-describing message, one change.
    Current(ChangeRequest),
    /// Pre-2.0 key=value payload, replayed property-group by
    /// property-group with validation disabled.
    Legacy(Vec<ChangeRequest>),
}

/// Serialize one committed change as the self-describing wire message
/// `{"Version":"2.0",["Delete":true],"<Type>":…}`. The merged object is
/// sent whole, never a diff.
pub fn encode(change: &AppliedChange, catalog: &SchemaCatalog) -> Result<String, SyncError> {
    let schema = catalog
        .get(&change.object_type)
        .ok_or_else(|| SyncError::Decode(format!("unknown object type {}", change.object_type)))?;

    let mut body = Map::new();
    body.insert("Version".to_string(), json!(CONFIG_DOC_VERSION));
    if change.action == crate::schema::ChangeAction::Delete {
        body.insert("Delete".to_string(), json!(true));
    }

    let payload = match schema.kind {
        ObjectKind::Singleton => change
            .properties
            .get(schema.object_type)
            .map(ConfigValue::to_json)
            .unwrap_or(Value::Null),
        ObjectKind::Composite => {
            let name = change
                .name
                .as_deref()
                .ok_or_else(|| SyncError::Decode("composite change without a name".to_string()))?;
            json!({ name: bag_to_json(&change.properties) })
        }
        ObjectKind::ArrayOfScalars => bag_to_json(&change.properties),
    };
    body.insert(change.object_type.clone(), payload);

    serde_json::to_string(&Value::Object(body)).map_err(|e| SyncError::Decode(e.to_string()))
}

/// `encode` wrapped in the bridge-process envelope.
pub fn encode_enveloped(
    kind: EnvelopeKind,
    change: &AppliedChange,
    catalog: &SchemaCatalog,
) -> Result<String, SyncError> {
    let body: Value = serde_json::from_str(&encode(change, catalog)?)
        .map_err(|e| SyncError::Decode(e.to_string()))?;
    serde_json::to_string(&json!({ kind.wire_name(): body }))
        .map_err(|e| SyncError::Decode(e.to_string()))
}

/// Decode an incoming replication payload.
///
/// Anything that does not parse as a JSON object with a `Version` field
/// is taken to be the pre-2.0 key=value format and routed to the legacy
/// replay path.
pub fn decode(payload: &str, catalog: &SchemaCatalog) -> Result<SyncPayload, SyncError> {
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return decode_legacy(payload, catalog).map(SyncPayload::Legacy);
    };
    let Some(map) = value.as_object() else {
        return Err(SyncError::Decode("payload is not a JSON object".to_string()));
    };

    // Unwrap the bridge envelope when present.
    let (map, envelope) = match unwrap_envelope(map)? {
        Some((inner, kind)) => (inner, Some(kind)),
        None => (map, None),
    };

    let Some(version) = map.get("Version").and_then(Value::as_str) else {
        return decode_legacy(payload, catalog).map(SyncPayload::Legacy);
    };
    if !version.starts_with("2.") {
        return Err(SyncError::UnsupportedVersion(version.to_string()));
    }

    let delete = envelope == Some(EnvelopeKind::Delete)
        || match map.get("Delete") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };

    let (object_type, payload_value) = map
        .iter()
        .find(|(key, _)| key.as_str() != "Version" && key.as_str() != "Delete")
        .ok_or_else(|| SyncError::Decode("message carries no object".to_string()))?;

    let schema = catalog
        .get(object_type)
        .ok_or_else(|| SyncError::Decode(format!("unknown object type {object_type}")))?;

    let mut request = ChangeRequest {
        action: Some("sync".to_string()),
        item: object_type.clone(),
        delete,
        version: Some(version.to_string()),
        ..ChangeRequest::default()
    };

    match schema.kind {
        ObjectKind::Singleton => {
            let value = json_value(payload_value)?;
            request.properties.insert(object_type.clone(), value);
        }
        ObjectKind::Composite => {
            let instances = payload_value.as_object().ok_or_else(|| {
                SyncError::Decode(format!("{object_type} payload must be an object"))
            })?;
            let (name, props) = instances.iter().next().ok_or_else(|| {
                SyncError::Decode(format!("{object_type} payload names no instance"))
            })?;
            request.name = Some(name.clone());
            request.composite = true;
            request.properties = json_bag(props)?;
            request.uid = request
                .properties
                .get("UID")
                .and_then(ConfigValue::as_str)
                .map(str::to_string);
        }
        ObjectKind::ArrayOfScalars => {
            request.properties = json_bag(payload_value)?;
        }
    }

    Ok(SyncPayload::Current(request))
}

/// Replay path for pre-2.0 payloads: flat `Type.Field.Name = value`
/// lines, grouped back into per-instance change requests.
fn decode_legacy(
    payload: &str,
    catalog: &SchemaCatalog,
) -> Result<Vec<ChangeRequest>, SyncError> {
    let mut grouped: BTreeMap<(String, Option<String>), ChangeRequest> = BTreeMap::new();

    for (line_no, raw) in payload.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('*') {
            continue;
        }
        let (key_part, value_part) = line
            .split_once('=')
            .ok_or_else(|| SyncError::Decode(format!("malformed v1 line {}", line_no + 1)))?;
        let key = PropertyKey::parse(key_part.trim(), line_no + 1)
            .map_err(|e| SyncError::Decode(e.to_string()))?;
        let value = parse_scalar(value_part.trim());

        let is_array = catalog
            .get(&key.object_type)
            .map(|schema| schema.is_array())
            .unwrap_or(false);
        // Array indices group entries but are not instance names.
        let group = (key.object_type.clone(), key.instance.clone());

        let request = grouped.entry(group).or_insert_with(|| ChangeRequest {
            action: Some("sync".to_string()),
            item: key.object_type.clone(),
            name: if is_array { None } else { key.instance.clone() },
            composite: !is_array && key.instance.is_some(),
            ..ChangeRequest::default()
        });
        request.properties.insert(key.field.clone(), value);
    }

    let mut requests: Vec<ChangeRequest> = grouped.into_values().collect();
    for request in &mut requests {
        // Replayed instances keep the primary's UID, same as the v2 path.
        request.uid = request
            .properties
            .get("UID")
            .and_then(ConfigValue::as_str)
            .map(str::to_string);
    }
    Ok(requests)
}

fn unwrap_envelope(
    map: &Map<String, Value>,
) -> Result<Option<(&Map<String, Value>, EnvelopeKind)>, SyncError> {
    if map.len() != 1 {
        return Ok(None);
    }
    let (key, inner) = map.iter().next().expect("len checked above");
    let Some(kind) = EnvelopeKind::from_wire_name(key) else {
        return Ok(None);
    };
    let inner = inner
        .as_object()
        .ok_or_else(|| SyncError::Decode(format!("{key} envelope body must be an object")))?;
    Ok(Some((inner, kind)))
}

fn bag_to_json(bag: &crate::value::PropertyBag) -> Value {
    Value::Object(bag.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

fn json_bag(value: &Value) -> Result<crate::value::PropertyBag, SyncError> {
    match json_value(value)? {
        ConfigValue::Object(bag) => Ok(bag),
        other => Err(SyncError::Decode(format!(
            "expected an object payload, found {}",
            other.type_name()
        ))),
    }
}

fn json_value(value: &Value) -> Result<ConfigValue, SyncError> {
    ConfigValue::from_json(value)
        .ok_or_else(|| SyncError::Decode("non-integer number in payload".to_string()))
}
