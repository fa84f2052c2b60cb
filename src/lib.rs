//! Dynamic-configuration control plane for a clustered messaging server.
//!
//! The crate owns the server's mutable configuration: a schema-validated
//! object tree, the mutation pipeline that notifies subscribed server
//! components (with compensating rollback on partial failure), crash-safe
//! persistence of the tree, and primary/standby replication with
//! reconciliation. `ConfigService` is the assembled entry point.

mod errors;
mod ha;
mod metrics;
mod persist;
mod processor;
mod registry;
mod schema;
mod service;
mod store;
mod value;

pub use errors::*;
pub use ha::*;
pub use metrics::*;
pub use persist::*;
pub use processor::*;
pub use registry::*;
pub use schema::*;
pub use service::*;
pub use store::*;
pub use value::*;
