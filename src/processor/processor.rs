use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::errors::LifecycleError;
use crate::errors::RequestError;
use crate::errors::Result;
use crate::errors::SyncError;
use crate::ha::NodeRole;
use crate::metrics::CONFIG_CHANGES;
use crate::metrics::CONFIG_REJECTIONS;
use crate::persist::PersistenceManager;
use crate::processor::CallbackDispatcher;
use crate::processor::ChangeRequest;
use crate::processor::UidGenerator;
use crate::registry::ComponentRegistry;
use crate::schema::ChangeAction;
use crate::schema::ObjectKind;
use crate::schema::ObjectSchema;
use crate::schema::SchemaCatalog;
use crate::schema::SchemaValidator;
use crate::store::ConfigStore;
use crate::store::StoreReader;
use crate::value::ConfigValue;
use crate::value::PropertyBag;

/// Reverse reference table: who may point at an instance of each type.
/// A delete is refused while any referrer still names the instance.
/// List-valued fields hold comma-separated names.
const REFERRERS: [(&str, &str, &str, bool); 7] = [
    ("SecurityProfile", "Endpoint", "SecurityProfile", false),
    ("SecurityProfile", "AdminEndpoint", "SecurityProfile", false),
    ("MessageHub", "Endpoint", "MessageHub", false),
    ("CertificateProfile", "SecurityProfile", "CertificateProfile", false),
    ("ConnectionPolicy", "Endpoint", "ConnectionPolicies", true),
    ("TopicPolicy", "Endpoint", "TopicPolicies", true),
    ("ConfigurationPolicy", "AdminEndpoint", "ConfigurationPolicies", true),
];

/// Where a change entered the pipeline and what it is allowed to skip.
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext {
    pub role: NodeRole,
    /// Schema validation runs unless the change replays already-validated
    /// state (startup file load, v1 sync replay).
    pub validate: bool,
    pub persist: bool,
    /// True when the change arrived over the replication channel.
    pub from_replication: bool,
}

impl ApplyContext {
    pub fn local(role: NodeRole) -> Self {
        Self {
            role,
            validate: true,
            persist: true,
            from_replication: false,
        }
    }

    pub fn replicated(role: NodeRole) -> Self {
        Self {
            role,
            validate: true,
            persist: true,
            from_replication: true,
        }
    }
}

/// The record of one committed change, handed to persistence and
/// replication after the tree lock is released.
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub object_type: String,
    pub name: Option<String>,
    pub action: ChangeAction,
    /// Properties as committed, defaults filled, UID included.
    pub properties: PropertyBag,
    pub uid: Option<String>,
    pub sync_to_standby: bool,
}

/// Forwards committed changes to the standby. Implemented by the HA
/// sync manager; wired in after construction because the sync manager
/// itself needs the processor for the standby apply path.
pub trait ChangeReplicator: Send + Sync {
    fn replicate(&self, change: &AppliedChange) -> std::result::Result<(), SyncError>;
}

/// The configuration mutation pipeline.
///
/// `apply` is the single entry point every mutation funnels through:
/// REST-style callers, the startup file loader, and the HA receiver.
/// The store write lock is held from action classification to commit so
/// validation reads and the uniqueness checks cannot race a concurrent
/// change; persistence and replication run after the lock is released.
pub struct ConfigProcessor {
    store: Arc<ConfigStore>,
    catalog: Arc<SchemaCatalog>,
    registry: Arc<ComponentRegistry>,
    uid_generator: UidGenerator,
    persister: Option<Arc<PersistenceManager>>,
    replicator: RwLock<Option<Arc<dyn ChangeReplicator>>>,
}

impl ConfigProcessor {
    pub fn new(
        store: Arc<ConfigStore>,
        catalog: Arc<SchemaCatalog>,
        registry: Arc<ComponentRegistry>,
        uid_generator: UidGenerator,
        persister: Option<Arc<PersistenceManager>>,
    ) -> Self {
        Self {
            store,
            catalog,
            registry,
            uid_generator,
            persister,
            replicator: RwLock::new(None),
        }
    }

    /// Late wiring of the replication seam.
    pub fn set_replicator(&self, replicator: Arc<dyn ChangeReplicator>) {
        *self.replicator.write() = Some(replicator);
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    /// Write the current tree to disk outside the normal pipeline; used
    /// at shutdown.
    pub fn persist_now(&self) -> Result<()> {
        if let Some(persister) = &self.persister {
            persister.save(&self.store.snapshot())?;
        }
        Ok(())
    }

    /// Run one change request through the full pipeline.
    pub fn apply(&self, request: &ChangeRequest, ctx: &ApplyContext) -> Result<AppliedChange> {
        let schema = self.catalog.require(&request.item)?;
        self.check_role(schema, request, ctx)?;

        let outcome = self.mutate(schema, request, ctx);
        let applied = match outcome {
            Ok(applied) => applied,
            Err(e) => {
                CONFIG_REJECTIONS
                    .with_label_values(&[schema.object_type])
                    .inc();
                return Err(e);
            }
        };

        CONFIG_CHANGES
            .with_label_values(&[schema.object_type, action_label(applied.action)])
            .inc();
        info!(
            "applied {} {}/{}",
            action_label(applied.action),
            applied.object_type,
            applied.name.as_deref().unwrap_or("-")
        );

        // In-memory state is authoritative from here on: a persistence
        // or replication failure is reported but does not undo the
        // committed change.
        if ctx.persist {
            if let Some(persister) = &self.persister {
                if let Err(e) = persister.save(&self.store.snapshot()) {
                    error!(
                        "committed change to {} could not be persisted: {}",
                        applied.object_type, e
                    );
                }
            }
        }

        if ctx.role == NodeRole::Primary && applied.sync_to_standby && !ctx.from_replication {
            if let Some(replicator) = self.replicator.read().as_ref() {
                if let Err(e) = replicator.replicate(&applied) {
                    warn!(
                        "change to {} not replicated to the standby: {}",
                        applied.object_type, e
                    );
                }
            }
        }

        Ok(applied)
    }

    /// A standby node only accepts direct writes for HA and admin
    /// objects, or requests carrying the force flag.
    fn check_role(
        &self,
        schema: &ObjectSchema,
        request: &ChangeRequest,
        ctx: &ApplyContext,
    ) -> Result<()> {
        if ctx.role != NodeRole::Standby || ctx.from_replication {
            return Ok(());
        }
        let allowed = self.catalog.standby_allowed(schema.object_type) || request.standby_force;
        if !allowed {
            return Err(LifecycleError::ConfigNotAllowed(schema.object_type.to_string()).into());
        }
        Ok(())
    }

    /// Validation, dispatch and commit under the tree write lock.
    fn mutate(
        &self,
        schema: &ObjectSchema,
        request: &ChangeRequest,
        ctx: &ApplyContext,
    ) -> Result<AppliedChange> {
        let mut txn = self.store.begin();
        let validator = SchemaValidator::new(&self.catalog);
        let dispatcher = CallbackDispatcher::new(&self.registry);

        // Callbacks run on a standby only for the types that declared
        // interest in standby-side notification.
        let dispatch_enabled = !ctx.from_replication || schema.callback_on_standby;

        match schema.kind {
            ObjectKind::Singleton => {
                let action = if request.delete {
                    ChangeAction::Delete
                } else if txn.get_singleton(schema.object_type).is_some() {
                    ChangeAction::Update
                } else {
                    ChangeAction::Create
                };

                let mut merged = singleton_bag(schema, request, &txn)?;
                if ctx.validate {
                    validator.validate(&txn, schema, None, &mut merged, action)?;
                }

                let prior = txn
                    .get_singleton(schema.object_type)
                    .map(|value| singleton_snapshot(schema, value));
                if dispatch_enabled {
                    dispatcher.dispatch(schema, None, &merged, prior.as_ref(), action)?;
                }

                let value = merged
                    .get(schema.object_type)
                    .cloned()
                    .unwrap_or(ConfigValue::Null);
                txn.set_singleton(schema.object_type, value);

                Ok(AppliedChange {
                    object_type: schema.object_type.to_string(),
                    name: None,
                    action,
                    properties: merged,
                    uid: None,
                    sync_to_standby: schema.sync_to_standby,
                })
            }

            ObjectKind::Composite => {
                let name = request
                    .name
                    .as_deref()
                    .ok_or(RequestError::NullPointer("Name"))?;
                let prior = txn.get_composite(schema.object_type, name);

                let action = self.classify(schema, request, name, prior.is_some())?;
                let mut merged = match action {
                    ChangeAction::Delete => {
                        self.check_not_in_use(&txn, schema.object_type, name)?;
                        prior.clone().unwrap_or_default()
                    }
                    _ => txn.merge_with_passed_object(
                        schema.object_type,
                        Some(name),
                        &request.properties,
                    ),
                };

                if ctx.validate {
                    validator.validate(&txn, schema, Some(name), &mut merged, action)?;
                }

                let mut uid = merged.get("UID").and_then(ConfigValue::as_str).map(str::to_string);
                if schema.uses_uid && action == ChangeAction::Create {
                    let assigned = self.assign_uid(&txn, request)?;
                    merged.insert("UID".to_string(), ConfigValue::String(assigned.clone()));
                    uid = Some(assigned);
                }

                if dispatch_enabled {
                    dispatcher.dispatch(schema, Some(name), &merged, prior.as_ref(), action)?;
                }

                match action {
                    ChangeAction::Delete => {
                        txn.delete_composite(schema.object_type, name)?;
                    }
                    _ => txn.upsert_composite(schema.object_type, name, merged.clone()),
                }

                Ok(AppliedChange {
                    object_type: schema.object_type.to_string(),
                    name: Some(name.to_string()),
                    action,
                    properties: merged,
                    uid,
                    sync_to_standby: schema.sync_to_standby,
                })
            }

            ObjectKind::ArrayOfScalars => {
                let action = if request.delete {
                    ChangeAction::Delete
                } else {
                    ChangeAction::Create
                };
                let mut merged = request.properties.clone();
                if ctx.validate {
                    validator.validate(&txn, schema, None, &mut merged, action)?;
                }
                let entry = ConfigValue::Object(merged.clone());

                // Classify against the current entries before any callback
                // runs, so a duplicate add or a missing delete is refused
                // with no subscriber having seen the change.
                let present = txn.array_contains(schema.object_type, &entry, schema.id_field);
                match action {
                    ChangeAction::Delete if !present => {
                        return Err(LifecycleError::ObjectNotFound {
                            object: schema.object_type.to_string(),
                            name: entry_label(schema, &merged),
                        }
                        .into());
                    }
                    ChangeAction::Create if present => {
                        return Err(LifecycleError::ObjectExists {
                            object: schema.object_type.to_string(),
                            name: entry_label(schema, &merged),
                        }
                        .into());
                    }
                    _ => {}
                }

                if dispatch_enabled {
                    dispatcher.dispatch(schema, None, &merged, None, action)?;
                }

                match action {
                    ChangeAction::Delete => {
                        txn.array_remove(schema.object_type, &entry, schema.id_field);
                    }
                    _ => {
                        txn.array_upsert(schema.object_type, entry, schema.id_field);
                    }
                }

                Ok(AppliedChange {
                    object_type: schema.object_type.to_string(),
                    name: None,
                    action,
                    properties: merged,
                    uid: None,
                    sync_to_standby: schema.sync_to_standby,
                })
            }
        }
    }

    /// Decide create/update/delete from the request flags and the
    /// current store state.
    fn classify(
        &self,
        schema: &ObjectSchema,
        request: &ChangeRequest,
        name: &str,
        exists: bool,
    ) -> Result<ChangeAction> {
        if request.delete {
            if !exists {
                return Err(LifecycleError::ObjectNotFound {
                    object: schema.object_type.to_string(),
                    name: name.to_string(),
                }
                .into());
            }
            return Ok(ChangeAction::Delete);
        }
        if exists {
            return Ok(ChangeAction::Update);
        }
        if request.update {
            return Err(LifecycleError::ObjectNotFound {
                object: schema.object_type.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        Ok(ChangeAction::Create)
    }

    /// UID for a new instance: a replicated change adopts the primary's
    /// UID, a local change generates a fresh one. Either way uniqueness
    /// is enforced under the write lock.
    fn assign_uid(&self, reader: &dyn StoreReader, request: &ChangeRequest) -> Result<String> {
        if let Some(uid) = &request.uid {
            let types: Vec<&str> = self
                .catalog
                .uid_types()
                .map(|schema| schema.object_type)
                .collect();
            if reader.uid_exists(&types, uid) {
                return Err(LifecycleError::ExistingKey(uid.clone()).into());
            }
            debug!("adopting replicated UID {}", uid);
            return Ok(uid.clone());
        }
        self.uid_generator.assign(reader, &self.catalog)
    }

    fn check_not_in_use(
        &self,
        reader: &dyn StoreReader,
        object_type: &str,
        name: &str,
    ) -> Result<()> {
        for (referenced, referrer, field, is_list) in REFERRERS {
            if referenced != object_type {
                continue;
            }
            for bag in reader.get_all_composites(referrer).values() {
                let Some(value) = bag.get(field).and_then(ConfigValue::as_str) else {
                    continue;
                };
                let referenced_here = if is_list {
                    value.split(',').any(|part| part.trim() == name)
                } else {
                    value == name
                };
                if referenced_here {
                    return Err(LifecycleError::ObjectIsInUse {
                        object: object_type.to_string(),
                        name: name.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// Array entries have no instance name; identify them by the natural
/// key when there is one.
fn entry_label(schema: &ObjectSchema, bag: &PropertyBag) -> String {
    schema
        .id_field
        .and_then(|field| bag.get(field))
        .and_then(ConfigValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "entry".to_string())
}

fn action_label(action: ChangeAction) -> &'static str {
    match action {
        ChangeAction::Create => "create",
        ChangeAction::Update => "update",
        ChangeAction::Delete => "delete",
    }
}

/// Singleton requests carry the value keyed by the type name, or under
/// the legacy `Value` alias. Absent both, the current value carries over.
fn singleton_bag(
    schema: &ObjectSchema,
    request: &ChangeRequest,
    reader: &dyn StoreReader,
) -> Result<PropertyBag> {
    let mut bag = PropertyBag::new();
    let value = request
        .properties
        .get(schema.object_type)
        .or_else(|| request.properties.get("Value"))
        .cloned()
        .or_else(|| reader.get_singleton(schema.object_type));
    if let Some(value) = value {
        bag.insert(schema.object_type.to_string(), value);
    }
    for (key, value) in &request.properties {
        if key != schema.object_type && key != "Value" {
            bag.insert(key.clone(), value.clone());
        }
    }
    Ok(bag)
}

fn singleton_snapshot(schema: &ObjectSchema, value: ConfigValue) -> PropertyBag {
    let mut bag = PropertyBag::new();
    bag.insert(schema.object_type.to_string(), value);
    bag
}
