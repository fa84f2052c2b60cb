use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::errors::Result;
use crate::errors::SyncError;
use crate::ha::decode;
use crate::ha::encode;
use crate::ha::NodeRole;
use crate::ha::StandbyReconciliationSet;
use crate::ha::SyncPayload;
use crate::metrics::SYNC_FAILURES;
use crate::metrics::SYNC_MESSAGES;
use crate::processor::AppliedChange;
use crate::processor::ApplyContext;
use crate::processor::ChangeReplicator;
use crate::processor::ChangeRequest;
use crate::processor::ConfigProcessor;

/// Replication channel to the peer node. The transport itself (socket
/// handling, reconnect, flow control) lives outside this crate.
#[cfg_attr(test, mockall::automock)]
pub trait SyncTransport: Send + Sync {
    fn send(&self, payload: &str) -> std::result::Result<(), SyncError>;
}

/// Keeps the standby's configuration converged with the primary's.
///
/// On the primary this is the processor's `ChangeReplicator`: every
/// committed sync-eligible change is serialized whole and pushed through
/// the transport. On the standby, incoming payloads are fed back through
/// the same processor pipeline, and a full resync reconciles away any
/// instance the primary no longer has.
pub struct HaSyncManager {
    processor: Arc<ConfigProcessor>,
    transport: Arc<dyn SyncTransport>,
    role: RwLock<NodeRole>,
}

impl HaSyncManager {
    pub fn new(processor: Arc<ConfigProcessor>, transport: Arc<dyn SyncTransport>) -> Self {
        Self {
            processor,
            transport,
            role: RwLock::new(NodeRole::Disabled),
        }
    }

    pub fn role(&self) -> NodeRole {
        *self.role.read()
    }

    pub fn set_role(&self, role: NodeRole) {
        let previous = {
            let mut guard = self.role.write();
            std::mem::replace(&mut *guard, role)
        };
        if previous != role {
            info!("node role changed: {} -> {}", previous, role);
        }
    }

    /// Apply one steady-state replication message on the standby.
    pub fn apply_message(&self, payload: &str) -> Result<()> {
        if self.role() != NodeRole::Standby {
            return Err(SyncError::WrongRole(self.role().as_str()).into());
        }
        SYNC_MESSAGES.with_label_values(&["received"]).inc();

        let outcome = match decode(payload, self.processor.catalog())? {
            SyncPayload::Current(request) => self.apply_replicated(&request, true),
            SyncPayload::Legacy(requests) => {
                debug!("replaying {} v1 payload groups", requests.len());
                requests
                    .iter()
                    .try_for_each(|request| self.apply_replicated(request, false))
            }
        };
        if outcome.is_err() {
            SYNC_FAILURES.with_label_values(&["received"]).inc();
        }
        outcome
    }

    /// Full resync: replay the primary's complete change stream, then
    /// delete every local instance the stream never mentioned.
    pub fn full_resync<'a>(&self, payloads: impl IntoIterator<Item = &'a str>) -> Result<()> {
        if self.role() != NodeRole::Standby {
            return Err(SyncError::WrongRole(self.role().as_str()).into());
        }

        let mut set = StandbyReconciliationSet::build(
            self.processor.store().as_ref(),
            self.processor.catalog(),
        );
        info!("full resync started, {} local instances to reconcile", set.len());

        for payload in payloads {
            SYNC_MESSAGES.with_label_values(&["received"]).inc();
            match decode(payload, self.processor.catalog())? {
                SyncPayload::Current(request) => {
                    if let Some(name) = &request.name {
                        set.clear(&request.item, name);
                    }
                    // Already validated on the primary.
                    self.apply_replicated(&request, false)?;
                }
                SyncPayload::Legacy(requests) => {
                    for request in &requests {
                        if let Some(name) = &request.name {
                            set.clear(&request.item, name);
                        }
                        self.apply_replicated(request, false)?;
                    }
                }
            }
        }

        let survivors = set.survivors();
        if !survivors.is_empty() {
            info!("resync deleting {} instances absent on the primary", survivors.len());
        }
        for (object_type, name) in survivors {
            let request = ChangeRequest {
                action: Some("sync".to_string()),
                item: object_type.clone(),
                name: Some(name.clone()),
                composite: true,
                delete: true,
                ..ChangeRequest::default()
            };
            if let Err(e) = self.apply_replicated(&request, false) {
                // Leave the stale instance in place rather than abort the
                // resync; the next resync gets another chance.
                warn!("resync could not delete {}/{}: {}", object_type, name, e);
            }
        }
        Ok(())
    }

    fn apply_replicated(&self, request: &ChangeRequest, validate: bool) -> Result<()> {
        let ctx = ApplyContext {
            role: NodeRole::Standby,
            validate,
            persist: true,
            from_replication: true,
        };
        self.processor.apply(request, &ctx).map(|_| ())
    }
}

impl ChangeReplicator for HaSyncManager {
    fn replicate(&self, change: &AppliedChange) -> std::result::Result<(), SyncError> {
        if self.role() != NodeRole::Primary {
            return Err(SyncError::WrongRole(self.role().as_str()));
        }
        let payload = encode(change, self.processor.catalog())?;
        match self.transport.send(&payload) {
            Ok(()) => {
                SYNC_MESSAGES.with_label_values(&["sent"]).inc();
                debug!(
                    "replicated {}/{}",
                    change.object_type,
                    change.name.as_deref().unwrap_or("-")
                );
                Ok(())
            }
            Err(e) => {
                SYNC_FAILURES.with_label_values(&["sent"]).inc();
                Err(e)
            }
        }
    }
}
