use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::DispatchError;
use crate::errors::Error;
use crate::processor::CallbackDispatcher;
use crate::registry::ChangeMode;
use crate::registry::ComponentRegistry;
use crate::registry::ComponentType;
use crate::registry::ConfigSubscriber;
use crate::schema::ChangeAction;
use crate::schema::ObjectKind;
use crate::schema::ObjectSchema;
use crate::value::ConfigValue;
use crate::value::PropertyBag;

/// Appends every invocation to a shared log; optionally fails on a
/// chosen mode so rollback paths can be driven deterministically.
struct Recording {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_on: Option<ChangeMode>,
}

impl ConfigSubscriber for Recording {
    fn on_change(
        &self,
        object_type: &str,
        name: Option<&str>,
        _props: &PropertyBag,
        mode: ChangeMode,
    ) -> Result<(), String> {
        self.log.lock().unwrap().push(format!(
            "{}:{}:{}:{}",
            self.tag,
            object_type,
            name.unwrap_or("-"),
            mode
        ));
        if self.fail_on == Some(mode) {
            return Err(format!("{} refused {}", self.tag, mode));
        }
        Ok(())
    }
}

fn recording(
    tag: &'static str,
    log: &Arc<Mutex<Vec<String>>>,
    fail_on: Option<ChangeMode>,
) -> Arc<dyn ConfigSubscriber> {
    Arc::new(Recording {
        tag,
        log: Arc::clone(log),
        fail_on,
    })
}

fn chain_schema() -> ObjectSchema {
    ObjectSchema::new("Endpoint", ComponentType::Transport, ObjectKind::Composite).callbacks(&[
        ComponentType::Transport,
        ComponentType::Security,
        ComponentType::Engine,
    ])
}

fn bag(entries: &[(&str, ConfigValue)]) -> PropertyBag {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_dispatch_in_schema_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentType::Transport, None, recording("t", &log, None))
        .unwrap();
    registry
        .register(ComponentType::Security, None, recording("s", &log, None))
        .unwrap();
    registry
        .register(ComponentType::Engine, None, recording("e", &log, None))
        .unwrap();

    let dispatcher = CallbackDispatcher::new(&registry);
    let props = bag(&[("Port", ConfigValue::Int(1883))]);
    dispatcher
        .dispatch(&chain_schema(), Some("ep1"), &props, None, ChangeAction::Create)
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "t:Endpoint:ep1:props",
            "s:Endpoint:ep1:props",
            "e:Endpoint:ep1:props"
        ]
    );
}

#[test]
fn test_failed_create_rolls_back_with_deletes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentType::Transport, None, recording("t", &log, None))
        .unwrap();
    registry
        .register(ComponentType::Security, None, recording("s", &log, None))
        .unwrap();
    // The last subscriber in the chain rejects the create.
    registry
        .register(
            ComponentType::Engine,
            None,
            recording("e", &log, Some(ChangeMode::Props)),
        )
        .unwrap();

    let dispatcher = CallbackDispatcher::new(&registry);
    let props = bag(&[("Port", ConfigValue::Int(1883))]);
    let err = dispatcher
        .dispatch(&chain_schema(), Some("ep1"), &props, None, ChangeAction::Create)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Dispatch(DispatchError::CallbackRejected { .. })
    ));
    // Already-notified subscribers are compensated in reverse order, the
    // failed one is not.
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "t:Endpoint:ep1:props",
            "s:Endpoint:ep1:props",
            "e:Endpoint:ep1:props",
            "s:Endpoint:ep1:delete",
            "t:Endpoint:ep1:delete"
        ]
    );
}

#[test]
fn test_failed_update_rolls_back_with_snapshot_restore() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ComponentRegistry::new();
    registry
        .register(ComponentType::Transport, None, recording("t", &log, None))
        .unwrap();
    registry
        .register(
            ComponentType::Security,
            None,
            recording("s", &log, Some(ChangeMode::Props)),
        )
        .unwrap();

    let schema = ObjectSchema::new("Endpoint", ComponentType::Transport, ObjectKind::Composite)
        .callbacks(&[ComponentType::Transport, ComponentType::Security]);
    let dispatcher = CallbackDispatcher::new(&registry);
    let props = bag(&[("Port", ConfigValue::Int(8883))]);
    let prior = bag(&[("Port", ConfigValue::Int(1883))]);

    let err = dispatcher
        .dispatch(&schema, Some("ep1"), &props, Some(&prior), ChangeAction::Update)
        .unwrap_err();

    assert!(matches!(err, Error::Dispatch(_)));
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "t:Endpoint:ep1:props",
            "s:Endpoint:ep1:props",
            "t:Endpoint:ep1:name-restore"
        ]
    );
}

#[test]
fn test_failed_compensation_abandons_the_rest() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ComponentRegistry::new();
    // Transport fails its own rollback; Security's compensation runs
    // first (reverse order), Transport's fails, nothing else follows.
    registry
        .register(
            ComponentType::Transport,
            None,
            recording("t", &log, Some(ChangeMode::Delete)),
        )
        .unwrap();
    registry
        .register(ComponentType::Security, None, recording("s", &log, None))
        .unwrap();
    registry
        .register(
            ComponentType::Engine,
            None,
            recording("e", &log, Some(ChangeMode::Props)),
        )
        .unwrap();

    let dispatcher = CallbackDispatcher::new(&registry);
    let props = bag(&[("Port", ConfigValue::Int(1883))]);
    let err = dispatcher
        .dispatch(&chain_schema(), Some("ep1"), &props, None, ChangeAction::Create)
        .unwrap_err();

    // The original callback failure surfaces, not the rollback failure.
    assert!(matches!(
        err,
        Error::Dispatch(DispatchError::CallbackRejected { ref component, .. }) if component == "Engine"
    ));
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "t:Endpoint:ep1:props",
            "s:Endpoint:ep1:props",
            "e:Endpoint:ep1:props",
            "s:Endpoint:ep1:delete",
            "t:Endpoint:ep1:delete"
        ]
    );
}

#[test]
fn test_missing_subscriber_for_required_component() {
    let registry = ComponentRegistry::new();
    let dispatcher = CallbackDispatcher::new(&registry);
    let schema =
        ObjectSchema::new("Endpoint", ComponentType::Transport, ObjectKind::Composite);

    let err = dispatcher
        .dispatch(
            &schema,
            Some("ep1"),
            &PropertyBag::new(),
            None,
            ChangeAction::Create,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Dispatch(DispatchError::NoSubscriber(_))
    ));
}

#[test]
fn test_callback_optional_component_needs_no_subscriber() {
    let registry = ComponentRegistry::new();
    let dispatcher = CallbackDispatcher::new(&registry);
    // Engine is allowed to run callback-less; a no-op registration is
    // created on the fly.
    let schema = ObjectSchema::new("Queue", ComponentType::Engine, ObjectKind::Composite);

    dispatcher
        .dispatch(
            &schema,
            Some("q1"),
            &PropertyBag::new(),
            None,
            ChangeAction::Create,
        )
        .unwrap();
    assert!(registry.is_registered(ComponentType::Engine, None));
}
