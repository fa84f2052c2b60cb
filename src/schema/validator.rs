use std::net::IpAddr;

use tracing::trace;

use crate::errors::RequestError;
use crate::errors::Result;
use crate::errors::ValidationError;
use crate::schema::ItemType;
use crate::schema::ObjectSchema;
use crate::schema::SchemaCatalog;
use crate::schema::SchemaItemDescriptor;
use crate::store::StoreReader;
use crate::value::ConfigValue;
use crate::value::PropertyBag;
use crate::LifecycleError;

/// What the pipeline decided this mutation is, after looking at the
/// current store state and the request flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

/// Validates and normalizes one merged object against the schema before
/// the pipeline may commit it.
pub struct SchemaValidator<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Full validation pass. `merged` is the object as it would look
    /// after the change; it is normalized in place (type coercion,
    /// null -> default, default fill).
    pub fn validate(
        &self,
        reader: &dyn StoreReader,
        schema: &ObjectSchema,
        name: Option<&str>,
        merged: &mut PropertyBag,
        action: ChangeAction,
    ) -> Result<()> {
        if !schema.settable {
            return Err(ValidationError::NotSettable(schema.object_type.to_string()).into());
        }

        if action == ChangeAction::Delete {
            if schema.is_singleton() {
                return Err(
                    LifecycleError::SingletonDelete(schema.object_type.to_string()).into(),
                );
            }
            if !schema.deletable {
                return Err(LifecycleError::DeleteNotAllowed {
                    object: schema.object_type.to_string(),
                    name: name.unwrap_or_default().to_string(),
                }
                .into());
            }
            // Deletes carry identifying keys only; nothing to normalize.
            return Ok(());
        }

        if let Some(fixed) = schema.fixed_instance {
            if let Some(n) = name {
                if n != fixed {
                    return Err(RequestError::ArgNotValid(format!(
                        "{} allows only the instance {}",
                        schema.object_type, fixed
                    ))
                    .into());
                }
            }
        }

        self.check_items(schema, name, merged)?;
        self.check_object_rules(reader, schema, merged)?;
        fill_defaults(schema, merged);
        self.check_required(schema, name, merged)?;

        trace!(
            "validated {}/{} with {} properties",
            schema.object_type,
            name.unwrap_or("-"),
            merged.len()
        );
        Ok(())
    }

    /// Walk every property, resolve its descriptor, coerce and validate.
    fn check_items(
        &self,
        schema: &ObjectSchema,
        name: Option<&str>,
        merged: &mut PropertyBag,
    ) -> Result<()> {
        let mut normalized = PropertyBag::new();
        for (key, value) in merged.iter() {
            // The UID is pipeline-generated, never a schema item.
            if key == "UID" {
                normalized.insert(key.clone(), value.clone());
                continue;
            }
            let descriptor = schema.items.get(key.as_str()).ok_or_else(|| {
                ValidationError::BadPropertyValue {
                    object: schema.object_type.to_string(),
                    item: key.clone(),
                    value: "not a schema item".to_string(),
                }
            })?;
            if !descriptor.settable {
                return Err(ValidationError::BadPropertyValue {
                    object: schema.object_type.to_string(),
                    item: key.clone(),
                    value: "item cannot be set".to_string(),
                }
                .into());
            }
            if value.is_null() {
                // Null means "fall back to the schema default"; a missing
                // default leaves the item unset.
                if let Some(default) = &descriptor.default {
                    normalized.insert(key.clone(), default.clone());
                }
                continue;
            }
            let coerced = coerce_item(schema, name, key, value, descriptor)?;
            normalized.insert(key.clone(), coerced);
        }
        *merged = normalized;
        Ok(())
    }

    /// Object-specific cross-field rules and referential checks.
    fn check_object_rules(
        &self,
        reader: &dyn StoreReader,
        schema: &ObjectSchema,
        merged: &PropertyBag,
    ) -> Result<()> {
        match schema.object_type {
            "HighAvailability" => {
                let enabling = merged.get("EnableHA").and_then(ConfigValue::as_bool) == Some(true);
                if enabling {
                    for field in [
                        "Group",
                        "RemoteDiscoveryNIC",
                        "LocalReplicationNIC",
                        "LocalDiscoveryNIC",
                    ] {
                        if merged.get(field).map(ConfigValue::is_unset).unwrap_or(true) {
                            return Err(ValidationError::InvalidCombination {
                                object: schema.object_type.to_string(),
                                detail: format!("{field} is required when EnableHA is true"),
                            }
                            .into());
                        }
                    }
                }
            }
            "AdminEndpoint" => {
                let has_policies = merged
                    .get("ConfigurationPolicies")
                    .map(|v| !v.is_unset())
                    .unwrap_or(false);
                let has_profile = merged
                    .get("SecurityProfile")
                    .map(|v| !v.is_unset())
                    .unwrap_or(false);
                if has_policies != has_profile && !external_ldap_enabled(reader) {
                    return Err(ValidationError::InvalidCombination {
                        object: schema.object_type.to_string(),
                        detail: "ConfigurationPolicies and SecurityProfile must be set together"
                            .to_string(),
                    }
                    .into());
                }
                self.check_reference_list(
                    reader,
                    merged.get("ConfigurationPolicies"),
                    "ConfigurationPolicy",
                )?;
                self.check_reference(reader, merged.get("SecurityProfile"), "SecurityProfile")?;
            }
            "Endpoint" => {
                self.check_reference(reader, merged.get("SecurityProfile"), "SecurityProfile")?;
                self.check_reference(reader, merged.get("MessageHub"), "MessageHub")?;
                self.check_reference_list(
                    reader,
                    merged.get("ConnectionPolicies"),
                    "ConnectionPolicy",
                )?;
                self.check_reference_list(reader, merged.get("TopicPolicies"), "TopicPolicy")?;
            }
            "SecurityProfile" => {
                self.check_reference(
                    reader,
                    merged.get("CertificateProfile"),
                    "CertificateProfile",
                )?;
            }
            _ => {}
        }
        Ok(())
    }

    fn check_reference(
        &self,
        reader: &dyn StoreReader,
        value: Option<&ConfigValue>,
        ref_type: &str,
    ) -> Result<()> {
        if let Some(name) = value.and_then(ConfigValue::as_str) {
            if !name.is_empty() && !reader.exists(ref_type, Some(name)) {
                return Err(ValidationError::ReferenceNotFound {
                    ref_type: ref_type.to_string(),
                    ref_name: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Comma-separated list of referenced object names.
    fn check_reference_list(
        &self,
        reader: &dyn StoreReader,
        value: Option<&ConfigValue>,
        ref_type: &str,
    ) -> Result<()> {
        if let Some(list) = value.and_then(ConfigValue::as_str) {
            for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !reader.exists(ref_type, Some(name)) {
                    return Err(ValidationError::ReferenceNotFound {
                        ref_type: ref_type.to_string(),
                        ref_name: name.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Final pass: every required item must be present and non-empty
    /// unless it explicitly allows empty values.
    fn check_required(
        &self,
        schema: &ObjectSchema,
        name: Option<&str>,
        merged: &PropertyBag,
    ) -> Result<()> {
        for (item, descriptor) in &schema.items {
            if !descriptor.required {
                continue;
            }
            let missing = match merged.get(*item) {
                None => true,
                Some(value) => value.is_unset() && !descriptor.allow_empty,
            };
            if missing {
                return Err(ValidationError::PropertyRequired {
                    object: schema.object_type.to_string(),
                    name: name.unwrap_or_default().to_string(),
                    item: item.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.catalog
    }
}

fn external_ldap_enabled(reader: &dyn StoreReader) -> bool {
    reader
        .get_composite("LDAP", "ldapconfig")
        .and_then(|bag| bag.get("Enabled").and_then(ConfigValue::as_bool))
        .unwrap_or(false)
}

/// Still-missing settable items get their schema defaults.
fn fill_defaults(schema: &ObjectSchema, merged: &mut PropertyBag) {
    for (item, descriptor) in &schema.items {
        if !descriptor.settable {
            continue;
        }
        if merged.contains_key(*item) {
            continue;
        }
        if let Some(default) = &descriptor.default {
            merged.insert(item.to_string(), default.clone());
        }
    }
}

fn type_error(
    schema: &ObjectSchema,
    name: Option<&str>,
    item: &str,
    value: &ConfigValue,
) -> ValidationError {
    ValidationError::BadPropertyType {
        object: schema.object_type.to_string(),
        name: name.unwrap_or_default().to_string(),
        item: item.to_string(),
        actual_type: value.type_name(),
    }
}

fn value_error(schema: &ObjectSchema, item: &str, value: &ConfigValue) -> ValidationError {
    ValidationError::BadPropertyValue {
        object: schema.object_type.to_string(),
        item: item.to_string(),
        value: value.to_legacy_string(),
    }
}

/// Coerce one property to its schema type, or fail with typed context.
fn coerce_item(
    schema: &ObjectSchema,
    name: Option<&str>,
    item: &str,
    value: &ConfigValue,
    descriptor: &SchemaItemDescriptor,
) -> Result<ConfigValue> {
    match descriptor.item_type {
        ItemType::String | ItemType::Regex | ItemType::Selector => match value {
            ConfigValue::String(_) => Ok(value.clone()),
            _ => Err(type_error(schema, name, item, value).into()),
        },
        ItemType::Number => {
            let n = match value {
                ConfigValue::Int(n) => *n,
                ConfigValue::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| type_error(schema, name, item, value))?,
                _ => return Err(type_error(schema, name, item, value).into()),
            };
            if let Some(min) = descriptor.min {
                if n < min {
                    return Err(value_error(schema, item, value).into());
                }
            }
            if let Some(max) = descriptor.max {
                if n > max {
                    return Err(value_error(schema, item, value).into());
                }
            }
            Ok(ConfigValue::Int(n))
        }
        ItemType::Boolean => match value {
            ConfigValue::Bool(_) => Ok(value.clone()),
            ConfigValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(ConfigValue::Bool(true)),
            ConfigValue::String(s) if s.eq_ignore_ascii_case("false") => {
                Ok(ConfigValue::Bool(false))
            }
            _ => Err(type_error(schema, name, item, value).into()),
        },
        ItemType::Enum => {
            let s = value
                .as_str()
                .ok_or_else(|| type_error(schema, name, item, value))?;
            if s.is_empty() && descriptor.allow_empty {
                return Ok(value.clone());
            }
            descriptor
                .enum_options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(s))
                .map(|option| ConfigValue::String(option.to_string()))
                .ok_or_else(|| value_error(schema, item, value).into())
        }
        ItemType::IpAddressList => {
            let s = value
                .as_str()
                .ok_or_else(|| type_error(schema, name, item, value))?;
            if s.is_empty() || s.eq_ignore_ascii_case("all") || s == "*" {
                return Ok(value.clone());
            }
            for address in s.split(',').map(str::trim) {
                if address.parse::<IpAddr>().is_err() {
                    return Err(value_error(schema, item, value).into());
                }
            }
            Ok(value.clone())
        }
        ItemType::BufferSize => match value {
            ConfigValue::Int(n) if *n >= 0 => Ok(value.clone()),
            ConfigValue::String(s) => {
                if parse_buffer_size(s).is_some() {
                    Ok(value.clone())
                } else {
                    Err(value_error(schema, item, value).into())
                }
            }
            _ => Err(type_error(schema, name, item, value).into()),
        },
    }
}

/// Parse sizes of the form `4096`, `64KB`, `4MB`, `1G`.
fn parse_buffer_size(s: &str) -> Option<i64> {
    let s = s.trim();
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end == 0 {
        return None;
    }
    let base: i64 = s[..digits_end].parse().ok()?;
    let multiplier = match s[digits_end..].trim().to_ascii_uppercase().as_str() {
        "" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        _ => return None,
    };
    base.checked_mul(multiplier)
}
