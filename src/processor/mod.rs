//! The configuration mutation pipeline.
//!
//! One `ConfigProcessor::apply` call carries a change request through
//! `Received -> Validated -> CallbacksInvoked -> Committed -> Persisted ->
//! Replicated`. Failures before the callbacks leave no effect; a failure
//! in a multi-subscriber callback chain triggers compensating rollback of
//! the already-notified subscribers; failures after the commit (disk,
//! replication) are reported but never undo the in-memory change.

mod dispatcher;
mod processor;
mod request;
mod uid;

#[cfg(test)]
mod dispatcher_test;

pub use dispatcher::*;
pub use processor::*;
pub use request::*;
pub use uid::*;
