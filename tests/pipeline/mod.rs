use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use dynconfig::ChangeMode;
use dynconfig::ChangeRequest;
use dynconfig::ComponentType;
use dynconfig::ConfigService;
use dynconfig::ConfigValue;
use dynconfig::Error;
use dynconfig::LifecycleError;
use dynconfig::NullSubscriber;
use dynconfig::StoreReader;
use tempfile::TempDir;

use crate::commons::test_service;
use crate::commons::test_settings;
use crate::commons::CapturingTransport;
use crate::commons::RecordingSubscriber;
use crate::enable_logger;

/// The canonical endpoint walkthrough: create with one explicit
/// property, observe defaults, the callback, the UID and the file.
#[test]
fn test_endpoint_end_to_end() {
    enable_logger();
    let dir = TempDir::new().unwrap();
    let service = ConfigService::init(
        test_settings(&dir),
        Arc::new(CapturingTransport::default()),
    )
    .unwrap();

    let transport_calls = Arc::new(RecordingSubscriber::default());
    service
        .register(
            ComponentType::Transport,
            None,
            Arc::clone(&transport_calls) as Arc<dyn dynconfig::ConfigSubscriber>,
        )
        .unwrap();

    service
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .property("Port", 1883_i64),
        )
        .unwrap();

    // Schema defaults are filled in alongside the explicit property.
    let stored = service.store().get_composite("Endpoint", "ep1").unwrap();
    assert_eq!(stored.get("Port").and_then(ConfigValue::as_int), Some(1883));
    assert_eq!(
        stored.get("Interface").and_then(ConfigValue::as_str),
        Some("All")
    );
    assert_eq!(
        stored.get("MaxMessageSize").and_then(ConfigValue::as_str),
        Some("4096KB")
    );
    assert_eq!(
        stored.get("UID").and_then(ConfigValue::as_str).map(str::len),
        Some(32)
    );

    // Exactly one callback, with the full merged bag.
    let calls = transport_calls.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        (
            "Endpoint".to_string(),
            Some("ep1".to_string()),
            ChangeMode::Props
        )
    );

    // The change is on disk before the call returns.
    let content = std::fs::read_to_string(dir.path().join("server_dynamic.json")).unwrap();
    assert!(content.contains("\"ep1\""));
    assert!(content.contains("\"Port\": 1883"));

    // Update and delete round out the lifecycle.
    service
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .updating()
                .property("Port", 8883_i64),
        )
        .unwrap();
    service
        .apply(&ChangeRequest::set("Endpoint").named("ep1").deleting())
        .unwrap();
    assert!(!service.store().exists("Endpoint", Some("ep1")));

    let err = service
        .apply(&ChangeRequest::set("Endpoint").named("ep1").deleting())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle(LifecycleError::ObjectNotFound { .. })
    ));
}

#[test]
fn test_concurrent_creates_get_unique_uids() {
    enable_logger();
    let dir = TempDir::new().unwrap();
    let service = Arc::new(test_service(&dir, Arc::new(CapturingTransport::default())));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for j in 0..4 {
                    service
                        .apply(
                            &ChangeRequest::set("Endpoint")
                                .named(format!("ep-{i}-{j}"))
                                .property("Port", 1000_i64 + i * 10 + j),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let endpoints = service.store().get_all_composites("Endpoint");
    assert_eq!(endpoints.len(), 32);
    let uids: HashSet<_> = endpoints
        .values()
        .map(|bag| bag.get("UID").and_then(ConfigValue::as_str).unwrap().to_string())
        .collect();
    assert_eq!(uids.len(), 32);
}

#[test]
fn test_file_replacement_keeps_a_valid_predecessor() {
    enable_logger();
    let dir = TempDir::new().unwrap();
    let service = test_service(&dir, Arc::new(CapturingTransport::default()));

    service
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .property("Port", 1883_i64),
        )
        .unwrap();
    service
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep2")
                .property("Port", 8883_i64),
        )
        .unwrap();

    // After any update the .bak sibling is the previous complete file.
    let current = std::fs::read_to_string(dir.path().join("server_dynamic.json")).unwrap();
    let backup = std::fs::read_to_string(dir.path().join("server_dynamic.json.bak")).unwrap();
    assert!(current.contains("\"ep2\""));
    assert!(backup.contains("\"ep1\""));
    assert!(!backup.contains("\"ep2\""));
    // Both parse as complete documents.
    serde_json::from_str::<serde_json::Value>(&current).unwrap();
    serde_json::from_str::<serde_json::Value>(&backup).unwrap();
}

#[test]
fn test_rejected_request_has_no_side_effects() {
    enable_logger();
    let dir = TempDir::new().unwrap();
    let service = test_service(&dir, Arc::new(CapturingTransport::default()));
    let generation = service.store().generation();

    // Unknown schema item.
    let err = service
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .property("Port", 1883_i64)
                .property("NoSuchItem", "x"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!service.store().exists("Endpoint", Some("ep1")));
    assert_eq!(service.store().generation(), generation);
}

#[test]
fn test_singleton_reset_not_delete() {
    enable_logger();
    let dir = TempDir::new().unwrap();
    let service = test_service(&dir, Arc::new(CapturingTransport::default()));

    service
        .apply(&ChangeRequest::set("LogLevel").property("LogLevel", "MAX"))
        .unwrap();
    let err = service
        .apply(&ChangeRequest::set("LogLevel").deleting())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Lifecycle(LifecycleError::SingletonDelete(_))
    ));
    // The value is untouched by the refused delete.
    assert_eq!(
        service.store().get_singleton("LogLevel"),
        Some(ConfigValue::String("MAX".to_string()))
    );
}

#[test]
fn test_add_null_subscriber_components_do_not_block() {
    enable_logger();
    let dir = TempDir::new().unwrap();
    let service = ConfigService::init(
        test_settings(&dir),
        Arc::new(CapturingTransport::default()),
    )
    .unwrap();
    // Engine is callback-optional; TopicMonitor changes apply with no
    // registration at all.
    service
        .apply(&ChangeRequest::set("TopicMonitor").property("TopicString", "a/+"))
        .unwrap();
    assert_eq!(service.store().get_array("TopicMonitor").len(), 1);

    // Transport is not optional: an Endpoint change needs a subscriber.
    let err = service
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .property("Port", 1883_i64),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Dispatch(_)));
    service
        .register(ComponentType::Transport, None, Arc::new(NullSubscriber))
        .unwrap();
    service
        .apply(
            &ChangeRequest::set("Endpoint")
                .named("ep1")
                .property("Port", 1883_i64),
        )
        .unwrap();
}
