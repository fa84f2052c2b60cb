//! Primary/standby configuration replication.
//!
//! The primary pushes every committed sync-eligible change, serialized
//! whole, to the standby; the standby feeds incoming payloads through
//! the normal mutation pipeline and reconciles full resyncs so that
//! instances deleted on the primary disappear locally too.

mod manager;
mod reconcile;
mod role;
mod wire;

#[cfg(test)]
mod manager_test;

pub use manager::*;
pub use reconcile::*;
pub use role::*;
pub use wire::*;
