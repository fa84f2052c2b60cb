use std::sync::Arc;

use tracing::debug;
use tracing::error;

use crate::errors::DispatchError;
use crate::errors::Result;
use crate::metrics::ROLLBACK_FAILURES;
use crate::registry::ChangeMode;
use crate::registry::ComponentRegistry;
use crate::registry::ConfigSubscriber;
use crate::schema::ChangeAction;
use crate::schema::ObjectSchema;
use crate::value::PropertyBag;

/// A compensating action recorded during forward dispatch.
struct Compensation {
    component: String,
    undo: Box<dyn FnOnce() -> std::result::Result<(), String>>,
}

/// Invokes the schema-declared subscriber chain for one change, with
/// compensating rollback on partial failure.
///
/// The compensation list is built while dispatching forward: each
/// successful callback pushes its own undo closure, so rollback is the
/// exact reverse replay of what actually ran. A `create` is compensated
/// by a `delete`; an `update` or `delete` is compensated by replaying
/// the pre-change snapshot with the name-restore marker.
pub struct CallbackDispatcher<'a> {
    registry: &'a ComponentRegistry,
}

impl<'a> CallbackDispatcher<'a> {
    pub fn new(registry: &'a ComponentRegistry) -> Self {
        Self { registry }
    }

    pub fn dispatch(
        &self,
        schema: &ObjectSchema,
        name: Option<&str>,
        props: &PropertyBag,
        prior: Option<&PropertyBag>,
        action: ChangeAction,
    ) -> Result<()> {
        let mode = match action {
            ChangeAction::Delete => ChangeMode::Delete,
            _ => ChangeMode::Props,
        };

        let mut compensations: Vec<Compensation> = Vec::new();

        for component in &schema.callbacks {
            let subscriber = self
                .registry
                .lookup_or_default(*component, Some(schema.object_type))
                .map_err(|_| DispatchError::NoSubscriber(component.name().to_string()))?;

            if let Err(detail) =
                subscriber.on_change(schema.object_type, name, props, mode)
            {
                let failure = DispatchError::CallbackRejected {
                    component: component.name().to_string(),
                    object: schema.object_type.to_string(),
                    name: name.unwrap_or_default().to_string(),
                    detail,
                };
                self.rollback(compensations);
                return Err(failure.into());
            }

            compensations.push(self.compensation_for(
                *component,
                Arc::clone(&subscriber),
                schema,
                name,
                props,
                prior,
                action,
            ));
        }

        Ok(())
    }

    /// Reverse replay of the recorded compensations. A failing
    /// compensation aborts the remaining ones: the in-memory state of
    /// the skipped subscribers is then stale, which is reported to the
    /// operator path rather than repaired automatically.
    fn rollback(&self, mut compensations: Vec<Compensation>) {
        let mut compensated = 0usize;
        while let Some(compensation) = compensations.pop() {
            debug!("rolling back callback for {}", compensation.component);
            if let Err(detail) = (compensation.undo)() {
                ROLLBACK_FAILURES.with_label_values(&[&compensation.component]).inc();
                error!(
                    "rollback callback for {} failed after {} compensations: {}; \
                     remaining compensations abandoned",
                    compensation.component, compensated, detail
                );
                return;
            }
            compensated += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compensation_for(
        &self,
        component: crate::registry::ComponentType,
        subscriber: Arc<dyn ConfigSubscriber>,
        schema: &ObjectSchema,
        name: Option<&str>,
        props: &PropertyBag,
        prior: Option<&PropertyBag>,
        action: ChangeAction,
    ) -> Compensation {
        let object_type = schema.object_type.to_string();
        let name = name.map(str::to_string);
        let undo: Box<dyn FnOnce() -> std::result::Result<(), String>> = match action {
            ChangeAction::Create => {
                let props = props.clone();
                Box::new(move || {
                    subscriber.on_change(
                        &object_type,
                        name.as_deref(),
                        &props,
                        ChangeMode::Delete,
                    )
                })
            }
            ChangeAction::Update | ChangeAction::Delete => {
                let snapshot = prior.cloned().unwrap_or_default();
                Box::new(move || {
                    subscriber.on_change(
                        &object_type,
                        name.as_deref(),
                        &snapshot,
                        ChangeMode::NameRestore,
                    )
                })
            }
        };
        Compensation {
            component: component.name().to_string(),
            undo,
        }
    }
}
