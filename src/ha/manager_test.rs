use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::Error;
use crate::errors::SyncError;
use crate::ha::HaSyncManager;
use crate::ha::NodeRole;
use crate::ha::SyncTransport;
use crate::processor::ApplyContext;
use crate::processor::ChangeReplicator;
use crate::processor::ChangeRequest;
use crate::processor::ConfigProcessor;
use crate::processor::UidGenerator;
use crate::registry::ComponentRegistry;
use crate::registry::ComponentType;
use crate::registry::NullSubscriber;
use crate::schema::builtin_catalog;
use crate::store::ConfigStore;
use crate::store::StoreReader;
use crate::value::ConfigValue;

/// Captures outgoing payloads instead of sending them anywhere.
#[derive(Default)]
struct CapturingTransport {
    sent: Mutex<Vec<String>>,
}

impl SyncTransport for CapturingTransport {
    fn send(&self, payload: &str) -> Result<(), SyncError> {
        self.sent.lock().unwrap().push(payload.to_string());
        Ok(())
    }
}

struct FailingTransport;

impl SyncTransport for FailingTransport {
    fn send(&self, _payload: &str) -> Result<(), SyncError> {
        Err(SyncError::Transport("peer unreachable".to_string()))
    }
}

fn processor() -> Arc<ConfigProcessor> {
    let registry = ComponentRegistry::new();
    for component in [
        ComponentType::Server,
        ComponentType::Transport,
        ComponentType::Security,
        ComponentType::HA,
    ] {
        registry
            .register(component, None, Arc::new(NullSubscriber))
            .unwrap();
    }
    Arc::new(ConfigProcessor::new(
        Arc::new(ConfigStore::new()),
        Arc::new(builtin_catalog()),
        Arc::new(registry),
        UidGenerator::new(Some("SN12345")),
        None,
    ))
}

fn node(role: NodeRole) -> (Arc<HaSyncManager>, Arc<CapturingTransport>, Arc<ConfigProcessor>) {
    let processor = processor();
    let transport = Arc::new(CapturingTransport::default());
    let manager = Arc::new(HaSyncManager::new(
        Arc::clone(&processor),
        Arc::clone(&transport) as Arc<dyn SyncTransport>,
    ));
    manager.set_role(role);
    processor.set_replicator(Arc::clone(&manager) as Arc<dyn ChangeReplicator>);
    (manager, transport, processor)
}

fn create_endpoint(processor: &ConfigProcessor, name: &str, port: i64, ctx: &ApplyContext) {
    processor
        .apply(
            &ChangeRequest::set("Endpoint")
                .named(name)
                .property("Port", port),
            ctx,
        )
        .unwrap();
}

#[test]
fn test_primary_change_reaches_standby() {
    let (_primary_mgr, transport, primary) = node(NodeRole::Primary);
    let (standby_mgr, _, standby) = node(NodeRole::Standby);

    create_endpoint(&primary, "ep1", 1883, &ApplyContext::local(NodeRole::Primary));

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    standby_mgr.apply_message(&sent[0]).unwrap();

    let mirrored = standby.store().get_composite("Endpoint", "ep1").unwrap();
    assert_eq!(
        mirrored.get("Port").and_then(ConfigValue::as_int),
        Some(1883)
    );
    // The standby adopts the primary's UID, not a fresh one.
    let original = primary.store().get_composite("Endpoint", "ep1").unwrap();
    assert_eq!(mirrored.get("UID"), original.get("UID"));
}

#[test]
fn test_delete_replicates() {
    let (_pm, transport, primary) = node(NodeRole::Primary);
    let (standby_mgr, _, standby) = node(NodeRole::Standby);
    let ctx = ApplyContext::local(NodeRole::Primary);

    create_endpoint(&primary, "ep1", 1883, &ctx);
    primary
        .apply(&ChangeRequest::set("Endpoint").named("ep1").deleting(), &ctx)
        .unwrap();

    for payload in transport.sent.lock().unwrap().iter() {
        standby_mgr.apply_message(payload).unwrap();
    }
    assert!(!standby.store().exists("Endpoint", Some("ep1")));
}

#[test]
fn test_wrong_role_refusals() {
    let (manager, _, _) = node(NodeRole::Disabled);

    let err = manager.apply_message("{}").unwrap_err();
    assert!(matches!(err, Error::Sync(SyncError::WrongRole(_))));

    let err = manager.full_resync(std::iter::empty()).unwrap_err();
    assert!(matches!(err, Error::Sync(SyncError::WrongRole(_))));
}

#[test]
fn test_replication_failure_does_not_fail_the_change() {
    let processor = processor();
    let manager = Arc::new(HaSyncManager::new(
        Arc::clone(&processor),
        Arc::new(FailingTransport) as Arc<dyn SyncTransport>,
    ));
    manager.set_role(NodeRole::Primary);
    processor.set_replicator(Arc::clone(&manager) as Arc<dyn ChangeReplicator>);

    // The local commit stands even though the push failed.
    create_endpoint(&processor, "ep1", 1883, &ApplyContext::local(NodeRole::Primary));
    assert!(processor.store().exists("Endpoint", Some("ep1")));
}

#[test]
fn test_full_resync_removes_instances_absent_on_primary() {
    let (_pm, transport, primary) = node(NodeRole::Primary);
    let (standby_mgr, _, standby) = node(NodeRole::Standby);
    let primary_ctx = ApplyContext::local(NodeRole::Primary);
    let standby_ctx = ApplyContext::replicated(NodeRole::Standby);

    // Standby knows {A, B, C}; the primary only streams {A, B}.
    create_endpoint(&standby, "A", 1001, &standby_ctx);
    create_endpoint(&standby, "B", 1002, &standby_ctx);
    create_endpoint(&standby, "C", 1003, &standby_ctx);

    create_endpoint(&primary, "A", 1001, &primary_ctx);
    create_endpoint(&primary, "B", 1002, &primary_ctx);

    let payloads = transport.sent.lock().unwrap().clone();
    standby_mgr
        .full_resync(payloads.iter().map(String::as_str))
        .unwrap();

    assert!(standby.store().exists("Endpoint", Some("A")));
    assert!(standby.store().exists("Endpoint", Some("B")));
    assert!(!standby.store().exists("Endpoint", Some("C")));
}

#[test]
fn test_full_resync_keeps_unsynced_types() {
    let (_pm, transport, primary) = node(NodeRole::Primary);
    let (standby_mgr, _, standby) = node(NodeRole::Standby);

    // HighAvailability is node-local and must survive a resync untouched.
    standby
        .apply(
            &ChangeRequest::set("HighAvailability")
                .named("haconfig")
                .property("HeartbeatTimeout", 30_i64),
            &ApplyContext::local(NodeRole::Standby),
        )
        .unwrap();

    create_endpoint(&primary, "A", 1001, &ApplyContext::local(NodeRole::Primary));
    let payloads = transport.sent.lock().unwrap().clone();
    standby_mgr
        .full_resync(payloads.iter().map(String::as_str))
        .unwrap();

    assert!(standby.store().exists("HighAvailability", Some("haconfig")));
    assert!(standby.store().exists("Endpoint", Some("A")));
}

#[test]
fn test_v1_payload_replay() {
    let (standby_mgr, _, standby) = node(NodeRole::Standby);

    standby_mgr
        .apply_message("Endpoint.Port.ep1 = 1883\nEndpoint.Interface.ep1 = All\n")
        .unwrap();

    let mirrored = standby.store().get_composite("Endpoint", "ep1").unwrap();
    assert_eq!(
        mirrored.get("Port").and_then(ConfigValue::as_int),
        Some(1883)
    );
}
