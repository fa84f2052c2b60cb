use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use parking_lot::RwLockWriteGuard;
use tracing::trace;

use crate::errors::LifecycleError;
use crate::value::ConfigValue;
use crate::value::PropertyBag;

/// One stored object: a singleton value, the named instances of a
/// composite type, or the entries of a value-keyed array type.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigObject {
    Singleton(ConfigValue),
    Composite(BTreeMap<String, PropertyBag>),
    Array(Vec<ConfigValue>),
}

/// The whole configuration tree, object type name -> object.
pub type ConfigTree = BTreeMap<String, ConfigObject>;

/// Read-only store access. Implemented both by `ConfigStore` (taking the
/// read lock per call) and by an open `StoreTxn` (already holding the
/// write lock), so validation code works identically in both contexts.
pub trait StoreReader {
    fn get_singleton(&self, object_type: &str) -> Option<ConfigValue>;
    fn get_composite(&self, object_type: &str, name: &str) -> Option<PropertyBag>;
    fn get_all_composites(&self, object_type: &str) -> BTreeMap<String, PropertyBag>;
    fn get_array(&self, object_type: &str) -> Vec<ConfigValue>;

    fn exists(&self, object_type: &str, name: Option<&str>) -> bool {
        match name {
            Some(n) => self.get_composite(object_type, n).is_some(),
            None => self.get_singleton(object_type).is_some(),
        }
    }

    /// Build the object as it would look after applying `overlay` on top
    /// of the current instance: overlay wins, current values fill gaps.
    /// Never mutates the store.
    fn merge_with_passed_object(
        &self,
        object_type: &str,
        name: Option<&str>,
        overlay: &PropertyBag,
    ) -> PropertyBag {
        let mut merged = name
            .and_then(|n| self.get_composite(object_type, n))
            .unwrap_or_default();
        for (key, value) in overlay {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// True if `uid` is assigned to any live instance of the given types.
    fn uid_exists(&self, object_types: &[&str], uid: &str) -> bool {
        for object_type in object_types {
            for bag in self.get_all_composites(object_type).values() {
                if bag.get("UID").and_then(ConfigValue::as_str) == Some(uid) {
                    return true;
                }
            }
        }
        false
    }
}

fn read_singleton(tree: &ConfigTree, object_type: &str) -> Option<ConfigValue> {
    match tree.get(object_type) {
        Some(ConfigObject::Singleton(value)) => Some(value.clone()),
        _ => None,
    }
}

fn read_composite(tree: &ConfigTree, object_type: &str, name: &str) -> Option<PropertyBag> {
    match tree.get(object_type) {
        Some(ConfigObject::Composite(instances)) => instances.get(name).cloned(),
        _ => None,
    }
}

fn read_all_composites(tree: &ConfigTree, object_type: &str) -> BTreeMap<String, PropertyBag> {
    match tree.get(object_type) {
        Some(ConfigObject::Composite(instances)) => instances.clone(),
        _ => BTreeMap::new(),
    }
}

fn read_array(tree: &ConfigTree, object_type: &str) -> Vec<ConfigValue> {
    match tree.get(object_type) {
        Some(ConfigObject::Array(entries)) => entries.clone(),
        _ => Vec::new(),
    }
}

/// Process-wide configuration store.
///
/// Reads clone values out under the read lock; every mutation path goes
/// through a `StoreTxn` write transaction. The generation counter feeds
/// the flat-view cache invalidation.
pub struct ConfigStore {
    tree: RwLock<ConfigTree>,
    generation: AtomicU64,
    pub(crate) flat_cache: parking_lot::Mutex<super::FlatCache>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(ConfigTree::new()),
            generation: AtomicU64::new(0),
            flat_cache: parking_lot::Mutex::new(super::FlatCache::default()),
        }
    }

    /// Open a write transaction. The tree write lock is held until the
    /// returned transaction is dropped.
    pub fn begin(&self) -> StoreTxn<'_> {
        StoreTxn {
            tree: self.tree.write(),
            generation: &self.generation,
            dirty: false,
        }
    }

    /// Deep copy of the whole tree, for persistence and full resync.
    pub fn snapshot(&self) -> ConfigTree {
        self.tree.read().clone()
    }

    /// Replace the whole tree, used by the startup file loaders.
    pub fn replace(&self, tree: ConfigTree) {
        *self.tree.write() = tree;
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl StoreReader for ConfigStore {
    fn get_singleton(&self, object_type: &str) -> Option<ConfigValue> {
        read_singleton(&self.tree.read(), object_type)
    }

    fn get_composite(&self, object_type: &str, name: &str) -> Option<PropertyBag> {
        read_composite(&self.tree.read(), object_type, name)
    }

    fn get_all_composites(&self, object_type: &str) -> BTreeMap<String, PropertyBag> {
        read_all_composites(&self.tree.read(), object_type)
    }

    fn get_array(&self, object_type: &str) -> Vec<ConfigValue> {
        read_array(&self.tree.read(), object_type)
    }
}

/// An open write transaction on the store.
pub struct StoreTxn<'a> {
    tree: RwLockWriteGuard<'a, ConfigTree>,
    generation: &'a AtomicU64,
    dirty: bool,
}

impl StoreTxn<'_> {
    pub fn set_singleton(&mut self, object_type: &str, value: ConfigValue) {
        trace!("set singleton {} = {:?}", object_type, value);
        self.tree
            .insert(object_type.to_string(), ConfigObject::Singleton(value));
        self.dirty = true;
    }

    pub fn upsert_composite(&mut self, object_type: &str, name: &str, bag: PropertyBag) {
        let entry = self
            .tree
            .entry(object_type.to_string())
            .or_insert_with(|| ConfigObject::Composite(BTreeMap::new()));
        if let ConfigObject::Composite(instances) = entry {
            instances.insert(name.to_string(), bag);
            self.dirty = true;
        }
    }

    pub fn delete_composite(
        &mut self,
        object_type: &str,
        name: &str,
    ) -> Result<(), LifecycleError> {
        let removed = match self.tree.get_mut(object_type) {
            Some(ConfigObject::Composite(instances)) => instances.remove(name).is_some(),
            _ => false,
        };
        if !removed {
            return Err(LifecycleError::ObjectNotFound {
                object: object_type.to_string(),
                name: name.to_string(),
            });
        }
        self.dirty = true;
        Ok(())
    }

    /// Append an entry to an array object unless a structurally-equal
    /// entry (matched on `id_field` when given) is already present.
    /// Returns false when the entry was a duplicate.
    pub fn array_upsert(
        &mut self,
        object_type: &str,
        entry: ConfigValue,
        id_field: Option<&str>,
    ) -> bool {
        let object = self
            .tree
            .entry(object_type.to_string())
            .or_insert_with(|| ConfigObject::Array(Vec::new()));
        if let ConfigObject::Array(entries) = object {
            if entries.iter().any(|e| array_entry_matches(e, &entry, id_field)) {
                return false;
            }
            entries.push(entry);
            self.dirty = true;
            return true;
        }
        false
    }

    /// True if an entry matching `candidate` (on `id_field` when given) is
    /// present.
    pub fn array_contains(
        &self,
        object_type: &str,
        candidate: &ConfigValue,
        id_field: Option<&str>,
    ) -> bool {
        match self.tree.get(object_type) {
            Some(ConfigObject::Array(entries)) => entries
                .iter()
                .any(|e| array_entry_matches(e, candidate, id_field)),
            _ => false,
        }
    }

    /// Remove the entry matching `candidate`; returns false when absent.
    pub fn array_remove(
        &mut self,
        object_type: &str,
        candidate: &ConfigValue,
        id_field: Option<&str>,
    ) -> bool {
        if let Some(ConfigObject::Array(entries)) = self.tree.get_mut(object_type) {
            let before = entries.len();
            entries.retain(|e| !array_entry_matches(e, candidate, id_field));
            if entries.len() != before {
                self.dirty = true;
                return true;
            }
        }
        false
    }
}

/// Array entries match on the type's natural key when one is declared,
/// otherwise on full structural equality.
pub fn array_entry_matches(existing: &ConfigValue, candidate: &ConfigValue, id_field: Option<&str>) -> bool {
    if let Some(field) = id_field {
        if let (Some(a), Some(b)) = (existing.as_object(), candidate.as_object()) {
            return a.get(field).is_some() && a.get(field) == b.get(field);
        }
    }
    existing == candidate
}

impl StoreReader for StoreTxn<'_> {
    fn get_singleton(&self, object_type: &str) -> Option<ConfigValue> {
        read_singleton(&self.tree, object_type)
    }

    fn get_composite(&self, object_type: &str, name: &str) -> Option<PropertyBag> {
        read_composite(&self.tree, object_type, name)
    }

    fn get_all_composites(&self, object_type: &str) -> BTreeMap<String, PropertyBag> {
        read_all_composites(&self.tree, object_type)
    }

    fn get_array(&self, object_type: &str) -> Vec<ConfigValue> {
        read_array(&self.tree, object_type)
    }
}

impl Drop for StoreTxn<'_> {
    fn drop(&mut self) {
        if self.dirty {
            self.generation.fetch_add(1, Ordering::Release);
        }
    }
}
