use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;
use tracing::warn;

use crate::errors::Result;
use crate::ha::HaSyncManager;
use crate::ha::NodeRole;
use crate::ha::SyncTransport;
use crate::metrics::register_custom_metrics;
use crate::persist::PersistenceManager;
use crate::processor::AppliedChange;
use crate::processor::ApplyContext;
use crate::processor::ChangeReplicator;
use crate::processor::ChangeRequest;
use crate::processor::ConfigProcessor;
use crate::processor::UidGenerator;
use crate::registry::ComponentRegistry;
use crate::registry::ComponentType;
use crate::registry::ConfigSubscriber;
use crate::registry::RegistrationHandle;
use crate::schema::builtin_catalog;
use crate::service::ServiceSettings;
use crate::store::ConfigStore;
use crate::store::StoreReader;
use crate::value::ConfigValue;

/// Hot runtime switches derived from singleton configuration. Swapped
/// atomically as a block so readers never see a half-updated set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeFlags {
    pub admin_mode: bool,
    pub mq_connectivity_enabled: bool,
    pub fips_enabled: bool,
}

/// The singleton types whose mutation refreshes the flag block.
const FLAG_SINGLETONS: [&str; 2] = ["MQConnectivityEnabled", "FIPS"];

/// Facade owning the whole configuration control plane.
///
/// Constructed once at server startup with `init`, torn down with
/// `shutdown`. Components register their subscribers through it, the
/// REST layer and the HA receiver apply changes through it.
pub struct ConfigService {
    settings: ServiceSettings,
    store: Arc<ConfigStore>,
    registry: Arc<ComponentRegistry>,
    processor: Arc<ConfigProcessor>,
    sync: Arc<HaSyncManager>,
    flags: ArcSwap<RuntimeFlags>,
}

impl ConfigService {
    /// Bring the control plane up: load the persisted tree, wire the
    /// pipeline, assume the configured HA role.
    pub fn init(settings: ServiceSettings, transport: Arc<dyn SyncTransport>) -> Result<Self> {
        settings.validate()?;
        register_custom_metrics();

        let catalog = Arc::new(builtin_catalog());
        let store = Arc::new(ConfigStore::new());
        let registry = Arc::new(ComponentRegistry::new());
        let uid_generator = UidGenerator::new(settings.serial_number.as_deref());
        let persister = Arc::new(PersistenceManager::new(
            settings.config_dir.clone(),
            &settings.dynamic_config_file,
            &settings.server_name,
            &settings.server_version,
        ));

        match persister.load(&catalog)? {
            Some(tree) => {
                info!("loaded {} configured object types from disk", tree.len());
                store.replace(tree);
            }
            None => info!("starting with an empty configuration tree"),
        }

        let processor = Arc::new(ConfigProcessor::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&registry),
            uid_generator.clone(),
            Some(Arc::clone(&persister)),
        ));
        let sync = Arc::new(HaSyncManager::new(Arc::clone(&processor), transport));
        processor.set_replicator(Arc::clone(&sync) as Arc<dyn ChangeReplicator>);
        sync.set_role(initial_role(&settings));

        let service = Self {
            settings,
            store,
            registry,
            processor,
            sync,
            flags: ArcSwap::from_pointee(RuntimeFlags::default()),
        };
        service.ensure_server_uid(&uid_generator)?;
        service.refresh_flags();
        info!(
            "configuration service ready, role {}, server {}",
            service.sync.role(),
            service.settings.server_name
        );
        Ok(service)
    }

    /// Flush the tree one last time and drop the replication role.
    pub fn shutdown(&self) -> Result<()> {
        if let Err(e) = self.processor.persist_now() {
            warn!("final configuration flush failed: {}", e);
        }
        self.sync.set_role(NodeRole::Disabled);
        info!("configuration service stopped");
        Ok(())
    }

    /// Apply one locally-originated change request.
    pub fn apply(&self, request: &ChangeRequest) -> Result<AppliedChange> {
        let ctx = ApplyContext::local(self.sync.role());
        let applied = self.processor.apply(request, &ctx)?;
        if FLAG_SINGLETONS.contains(&applied.object_type.as_str()) {
            self.refresh_flags();
        }
        Ok(applied)
    }

    pub fn register(
        &self,
        component: ComponentType,
        object_filter: Option<&str>,
        subscriber: Arc<dyn ConfigSubscriber>,
    ) -> Result<RegistrationHandle> {
        self.registry.register(component, object_filter, subscriber)
    }

    pub fn unregister(&self, handle: &RegistrationHandle) {
        self.registry.unregister(handle);
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn processor(&self) -> &Arc<ConfigProcessor> {
        &self.processor
    }

    pub fn sync_manager(&self) -> &Arc<HaSyncManager> {
        &self.sync
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Current runtime-flag block; cheap enough for per-request reads.
    pub fn flags(&self) -> Arc<RuntimeFlags> {
        self.flags.load_full()
    }

    /// Admin mode is toggled by the operator path, not by a singleton.
    pub fn set_admin_mode(&self, admin_mode: bool) {
        let mut flags = **self.flags.load();
        flags.admin_mode = admin_mode;
        self.flags.store(Arc::new(flags));
    }

    fn refresh_flags(&self) {
        let admin_mode = self.flags.load().admin_mode;
        let flags = RuntimeFlags {
            admin_mode,
            mq_connectivity_enabled: singleton_bool(&*self.store, "MQConnectivityEnabled"),
            fips_enabled: singleton_bool(&*self.store, "FIPS"),
        };
        self.flags.store(Arc::new(flags));
    }

    /// The server UID is generated exactly once, on first startup, and
    /// persisted with everything else.
    fn ensure_server_uid(&self, uid_generator: &UidGenerator) -> Result<()> {
        if self.store.get_singleton("ServerUID").is_some() {
            return Ok(());
        }
        let uid = uid_generator.generate();
        info!("assigning server UID {}", uid);
        let mut txn = self.store.begin();
        txn.set_singleton("ServerUID", ConfigValue::String(uid));
        drop(txn);
        self.processor.persist_now()
    }
}

fn singleton_bool(reader: &dyn StoreReader, object_type: &str) -> bool {
    reader
        .get_singleton(object_type)
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

fn initial_role(settings: &ServiceSettings) -> NodeRole {
    if !settings.ha.enabled {
        return NodeRole::Disabled;
    }
    match settings.ha.role.as_str() {
        "primary" => NodeRole::Primary,
        "standby" => NodeRole::Standby,
        // `auto` stays standby until the pairing handshake promotes it.
        _ => NodeRole::Standby,
    }
}
