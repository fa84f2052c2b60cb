use std::collections::BTreeMap;

use crate::errors::RequestError;
use crate::registry::ComponentType;
use crate::schema::ObjectSchema;

/// Read-only lookup table of every known object type, loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    objects: BTreeMap<&'static str, ObjectSchema>,
}

impl SchemaCatalog {
    pub fn new(objects: impl IntoIterator<Item = ObjectSchema>) -> Self {
        Self {
            objects: objects
                .into_iter()
                .map(|schema| (schema.object_type, schema))
                .collect(),
        }
    }

    pub fn get(&self, object_type: &str) -> Option<&ObjectSchema> {
        self.objects.get(object_type)
    }

    pub fn require(&self, object_type: &str) -> Result<&ObjectSchema, RequestError> {
        self.objects
            .get(object_type)
            .ok_or_else(|| RequestError::InvalidCfgObject(object_type.to_string()))
    }

    /// Resolve the owning component from the object-type name.
    pub fn component_of(&self, object_type: &str) -> Result<ComponentType, RequestError> {
        self.require(object_type).map(|schema| schema.component)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectSchema> {
        self.objects.values()
    }

    /// Composite and array types whose changes are replicated to the
    /// standby; these are the types the standby reconciles on full resync.
    pub fn sync_eligible(&self) -> impl Iterator<Item = &ObjectSchema> {
        self.iter()
            .filter(|schema| schema.sync_to_standby && !schema.is_singleton())
    }

    /// Types whose instances carry a generated UID. UID uniqueness is
    /// enforced across all of these together.
    pub fn uid_types(&self) -> impl Iterator<Item = &ObjectSchema> {
        self.iter().filter(|schema| schema.uses_uid)
    }

    /// Types a standby node accepts direct writes for.
    pub fn standby_allowed(&self, object_type: &str) -> bool {
        self.get(object_type)
            .map(|schema| matches!(schema.component, ComponentType::HA | ComponentType::Admin))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
