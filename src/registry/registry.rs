use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::errors::RequestError;
use crate::errors::Result;
use crate::registry::ComponentType;
use crate::registry::ConfigSubscriber;
use crate::registry::NullSubscriber;

/// Identity of one registration: a component plus an optional object-type
/// filter. A component registers either with no filter (receives every
/// object of the component) or with filters, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationKey {
    pub component: ComponentType,
    pub object_filter: Option<String>,
}

/// Opaque proof of registration handed back to the subsystem; required
/// for unregistering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationHandle {
    key: RegistrationKey,
}

impl RegistrationHandle {
    pub fn key(&self) -> &RegistrationKey {
        &self.key
    }
}

struct RegistrationEntry {
    subscriber: Arc<dyn ConfigSubscriber>,
    refcount: usize,
}

/// Maps `(component, filter)` pairs to registered subscribers.
///
/// Entries are refcounted: registering the same subscriber again bumps the
/// count and returns the existing handle, unregistering decrements and the
/// entry disappears when the count reaches zero.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: DashMap<RegistrationKey, RegistrationEntry>,
    /// Serializes registration changes so the filtered/unfiltered
    /// conflict scan and the insert are one atomic step. Lookups stay
    /// lock-free on the map.
    write_lock: Mutex<()>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        component: ComponentType,
        object_filter: Option<&str>,
        subscriber: Arc<dyn ConfigSubscriber>,
    ) -> Result<RegistrationHandle> {
        let key = RegistrationKey {
            component,
            object_filter: object_filter.map(str::to_string),
        };
        let _guard = self.write_lock.lock();

        // A filtered registration cannot coexist with an unfiltered one
        // for the same component, in either direction.
        let conflicting = self.entries.iter().any(|entry| {
            entry.key().component == component
                && entry.key() != &key
                && (entry.key().object_filter.is_none() || key.object_filter.is_none())
        });
        if conflicting {
            return Err(RequestError::ArgNotValid(format!(
                "filtered and unfiltered registrations cannot be mixed for component {component}"
            ))
            .into());
        }

        if let Some(mut existing) = self.entries.get_mut(&key) {
            if !Arc::ptr_eq(&existing.subscriber, &subscriber) {
                return Err(RequestError::ArgNotValid(format!(
                    "component {component} is already registered with a different callback"
                ))
                .into());
            }
            existing.refcount += 1;
            trace!(
                "re-registered {} (filter={:?}), refcount={}",
                component,
                key.object_filter,
                existing.refcount
            );
            return Ok(RegistrationHandle { key });
        }

        debug!("registered component {} (filter={:?})", component, key.object_filter);
        self.entries.insert(
            key.clone(),
            RegistrationEntry {
                subscriber,
                refcount: 1,
            },
        );
        Ok(RegistrationHandle { key })
    }

    /// Decrement the registration count; the entry is removed once no
    /// registrations remain.
    pub fn unregister(&self, handle: &RegistrationHandle) {
        let _guard = self.write_lock.lock();
        let mut remove = false;
        if let Some(mut entry) = self.entries.get_mut(&handle.key) {
            entry.refcount = entry.refcount.saturating_sub(1);
            remove = entry.refcount == 0;
        }
        if remove {
            self.entries.remove(&handle.key);
            debug!(
                "unregistered component {} (filter={:?})",
                handle.key.component, handle.key.object_filter
            );
        }
    }

    /// Exact lookup with fallback from a filtered key to the component's
    /// unfiltered registration.
    pub fn lookup(
        &self,
        component: ComponentType,
        object_filter: Option<&str>,
    ) -> Option<Arc<dyn ConfigSubscriber>> {
        if let Some(filter) = object_filter {
            let key = RegistrationKey {
                component,
                object_filter: Some(filter.to_string()),
            };
            if let Some(entry) = self.entries.get(&key) {
                return Some(Arc::clone(&entry.subscriber));
            }
        }
        let key = RegistrationKey {
            component,
            object_filter: None,
        };
        self.entries.get(&key).map(|e| Arc::clone(&e.subscriber))
    }

    /// Lookup that lazily creates an unfiltered no-op registration for
    /// components allowed to operate without one (Store, Engine).
    pub fn lookup_or_default(
        &self,
        component: ComponentType,
        object_filter: Option<&str>,
    ) -> Result<Arc<dyn ConfigSubscriber>> {
        if let Some(subscriber) = self.lookup(component, object_filter) {
            return Ok(subscriber);
        }
        if component.is_callback_optional() {
            debug!("creating just-in-time registration for component {component}");
            let subscriber: Arc<dyn ConfigSubscriber> = Arc::new(NullSubscriber);
            self.register(component, None, Arc::clone(&subscriber))?;
            return Ok(subscriber);
        }
        Err(RequestError::InvalidComponent(component.name().to_string()).into())
    }

    pub fn is_registered(&self, component: ComponentType, object_filter: Option<&str>) -> bool {
        self.lookup(component, object_filter).is_some()
    }
}
