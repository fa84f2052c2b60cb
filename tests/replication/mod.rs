use std::sync::Arc;

use dynconfig::ChangeRequest;
use dynconfig::ConfigService;
use dynconfig::ConfigValue;
use dynconfig::HaSettings;
use dynconfig::NodeRole;
use dynconfig::StoreReader;
use dynconfig::SyncTransport;
use tempfile::TempDir;

use crate::commons::test_settings;
use crate::commons::CapturingTransport;
use crate::enable_logger;

fn ha_node(dir: &TempDir, role: &str) -> (ConfigService, Arc<CapturingTransport>) {
    let mut settings = test_settings(dir);
    settings.ha = HaSettings {
        enabled: true,
        role: role.to_string(),
        group: "pair1".to_string(),
    };
    let transport = Arc::new(CapturingTransport::default());
    let service =
        ConfigService::init(settings, Arc::clone(&transport) as Arc<dyn SyncTransport>).unwrap();
    for component in [
        dynconfig::ComponentType::Server,
        dynconfig::ComponentType::Transport,
        dynconfig::ComponentType::Security,
        dynconfig::ComponentType::HA,
    ] {
        service
            .register(component, None, Arc::new(dynconfig::NullSubscriber))
            .unwrap();
    }
    (service, transport)
}

#[test]
fn test_steady_state_replication() {
    enable_logger();
    let primary_dir = TempDir::new().unwrap();
    let standby_dir = TempDir::new().unwrap();
    let (primary, wire) = ha_node(&primary_dir, "primary");
    let (standby, _) = ha_node(&standby_dir, "standby");
    assert_eq!(primary.sync_manager().role(), NodeRole::Primary);
    assert_eq!(standby.sync_manager().role(), NodeRole::Standby);

    primary
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .property("Port", 1883_i64),
        )
        .unwrap();
    primary
        .apply(&ChangeRequest::set("LogLevel").property("LogLevel", "MAX"))
        .unwrap();

    for payload in wire.drain() {
        standby.sync_manager().apply_message(&payload).unwrap();
    }

    let mirrored = standby.store().get_composite("Endpoint", "ep1").unwrap();
    assert_eq!(
        mirrored.get("Port").and_then(ConfigValue::as_int),
        Some(1883)
    );
    assert_eq!(
        standby.store().get_singleton("LogLevel"),
        Some(ConfigValue::String("MAX".to_string()))
    );

    // UID parity between the pair.
    let original = primary.store().get_composite("Endpoint", "ep1").unwrap();
    assert_eq!(mirrored.get("UID"), original.get("UID"));
}

#[test]
fn test_full_resync_converges_to_primary() {
    enable_logger();
    let primary_dir = TempDir::new().unwrap();
    let standby_dir = TempDir::new().unwrap();
    let (primary, wire) = ha_node(&primary_dir, "primary");
    let (standby, standby_wire) = ha_node(&standby_dir, "standby");

    // Seed the standby with an extra endpoint the primary never had, by
    // running it as a temporary primary of its own.
    standby.sync_manager().set_role(NodeRole::Primary);
    for name in ["A", "B", "C"] {
        standby
            .apply(
                &ChangeRequest::set("Endpoint")
                    .named(name)
                    .property("Port", 1883_i64),
            )
            .unwrap();
    }
    standby.sync_manager().set_role(NodeRole::Standby);
    standby_wire.drain();

    for name in ["A", "B"] {
        primary
            .apply(
                &ChangeRequest::set("Endpoint")
                    .named(name)
                    .property("Port", 1883_i64),
            )
            .unwrap();
    }

    let payloads = wire.drain();
    standby
        .sync_manager()
        .full_resync(payloads.iter().map(String::as_str))
        .unwrap();

    assert!(standby.store().exists("Endpoint", Some("A")));
    assert!(standby.store().exists("Endpoint", Some("B")));
    // C existed only on the standby and is reconciled away.
    assert!(!standby.store().exists("Endpoint", Some("C")));

    // The resync result is durable.
    let content =
        std::fs::read_to_string(standby_dir.path().join("server_dynamic.json")).unwrap();
    assert!(!content.contains("\"C\""));
}

#[test]
fn test_standby_refuses_local_messaging_config() {
    enable_logger();
    let dir = TempDir::new().unwrap();
    let (standby, _) = ha_node(&dir, "standby");

    let err = standby
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .property("Port", 1883_i64),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        dynconfig::Error::Lifecycle(dynconfig::LifecycleError::ConfigNotAllowed(_))
    ));

    // HA tuning itself stays writable for failover management.
    standby
        .apply(
            &ChangeRequest::set("HighAvailability")
                .named("haconfig")
                .property("HeartbeatTimeout", 30_i64),
        )
        .unwrap();
}
