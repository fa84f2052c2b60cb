use std::collections::BTreeSet;

use crate::schema::SchemaCatalog;
use crate::store::StoreReader;

/// Tracks which standby instances the primary's resync stream has
/// confirmed.
///
/// Built once per full resync with one entry for every currently-known
/// instance of every sync-eligible composite type. Replaying an entry
/// from the primary clears its flag; whatever is still flagged after the
/// replay exists only on the standby and must be deleted.
#[derive(Debug, Default)]
pub struct StandbyReconciliationSet {
    pending: BTreeSet<(String, String)>,
}

impl StandbyReconciliationSet {
    pub fn build(reader: &dyn StoreReader, catalog: &SchemaCatalog) -> Self {
        let mut pending = BTreeSet::new();
        for schema in catalog.sync_eligible() {
            if schema.is_array() {
                continue;
            }
            for name in reader.get_all_composites(schema.object_type).keys() {
                pending.insert((schema.object_type.to_string(), name.clone()));
            }
        }
        Self { pending }
    }

    /// Mark an instance as confirmed by the primary.
    pub fn clear(&mut self, object_type: &str, name: &str) {
        self.pending
            .remove(&(object_type.to_string(), name.to_string()));
    }

    /// Instances never mentioned by the primary, to be deleted.
    pub fn survivors(self) -> Vec<(String, String)> {
        self.pending.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
