use std::sync::Arc;

use crate::store::ConfigObject;
use crate::store::ConfigStore;
use crate::value::ConfigValue;
use crate::value::PropertyKey;

/// Cached flat key=value representation of the tree.
///
/// Legacy lookup paths address configuration as `Type.Field.Name` lines.
/// The cache is guarded by its own mutex, distinct from the tree lock;
/// the fill path releases the cache mutex before taking the tree read
/// lock so the two are never held together.
#[derive(Default)]
pub struct FlatCache {
    generation: u64,
    /// `None` until the first fill, so an empty tree still caches.
    lines: Option<Arc<Vec<(PropertyKey, ConfigValue)>>>,
}

impl ConfigStore {
    /// Flat snapshot of the tree, rebuilt only when the tree changed.
    pub fn flat_view(&self) -> Arc<Vec<(PropertyKey, ConfigValue)>> {
        let current = self.generation();
        {
            let cache = self.flat_cache.lock();
            if cache.generation == current {
                if let Some(lines) = &cache.lines {
                    return Arc::clone(lines);
                }
            }
        }

        // Cache is stale. Build outside the cache mutex.
        let lines = Arc::new(flatten(self));

        let mut cache = self.flat_cache.lock();
        cache.generation = current;
        cache.lines = Some(Arc::clone(&lines));
        lines
    }

    /// Flat lookup by structured key.
    pub fn flat_get(&self, key: &PropertyKey) -> Option<ConfigValue> {
        self.flat_view()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

fn flatten(store: &ConfigStore) -> Vec<(PropertyKey, ConfigValue)> {
    let mut lines = Vec::new();
    for (object_type, object) in store.snapshot() {
        match object {
            ConfigObject::Singleton(value) => {
                lines.push((PropertyKey::singleton(&object_type, "Value"), value));
            }
            ConfigObject::Composite(instances) => {
                for (name, bag) in instances {
                    for (field, value) in bag {
                        lines.push((PropertyKey::composite(&object_type, &field, &name), value));
                    }
                }
            }
            ConfigObject::Array(entries) => {
                for (index, entry) in entries.into_iter().enumerate() {
                    lines.push((
                        PropertyKey::composite(&object_type, "Entry", index.to_string()),
                        entry,
                    ));
                }
            }
        }
    }
    lines
}
