//! Lifecycle facade for the configuration control plane.
//!
//! `ConfigService::init` wires the store, schema catalog, registry,
//! processor, persistence and HA sync together from `ServiceSettings`;
//! `shutdown` flushes and detaches. There are no process-wide globals:
//! everything hangs off the service instance.

mod service;
mod settings;


pub use service::*;
pub use settings::*;
