use kube::runtime::events::{Event, EventType};
use kube::{Resource, ResourceExt};
use tokio::time::Duration;
use tracing::{debug, warn};

use super::{NextRun, PhaseOutcome, Stage};
use crate::api::v1alpha1::StarknetRPC;
use crate::client::{EventSink, ObjectStore};
use crate::conditions::{self, AvailablePhase};
use crate::probe::NodeProbe;
use crate::util::config::ImageDefaults;
use crate::util::{Result, StdError};

pub const RESTORE_GATE_DELAY: Duration = Duration::from_secs(30);
pub const READY_RESYNC: Duration = Duration::from_secs(5 * 60);
pub const NOT_READY_RESYNC: Duration = Duration::from_secs(60);

/// Drives one `StarknetRPC` through its phases: storage, archive restore,
/// then the node pod once the restore resolved.
///
/// Holds no state of its own. Everything it knows comes from the object
/// store, so an invocation may stop at any point and the next one picks up
/// from what was persisted.
pub struct RpcReconciler<'a, S, P> {
    pub(crate) store: &'a S,
    pub(crate) probe: &'a P,
    pub(crate) images: &'a ImageDefaults,
    events: Option<&'a dyn EventSink>,
}

impl<'a, S, P> RpcReconciler<'a, S, P>
where
    S: ObjectStore,
    P: NodeProbe,
{
    pub fn new(store: &'a S, probe: &'a P, images: &'a ImageDefaults) -> Self {
        Self {
            store,
            probe,
            images,
            events: None,
        }
    }

    pub fn with_recorder(mut self, events: &'a dyn EventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn reconcile(&self, rpc: &mut StarknetRPC) -> Result<NextRun> {
        conditions::initialize(self.store, rpc).await?;

        if let Some(next) = settle(Stage::Storage, self.reconcile_storage(rpc).await?)? {
            return Ok(next);
        }
        if let Some(next) = settle(Stage::Restore, self.reconcile_restore(rpc).await?)? {
            return Ok(next);
        }

        if !conditions::is_restore_resolved(rpc) {
            debug!("StarknetRPC '{}' waits on the archive restore", rpc.name_any());
            return Ok(NextRun::new(Stage::RestoreGate, RESTORE_GATE_DELAY));
        }

        if let Some(next) = settle(Stage::Node, self.reconcile_node(rpc).await?)? {
            return Ok(next);
        }

        let after = match conditions::available_phase(rpc) {
            Some(AvailablePhase::Ready) => READY_RESYNC,
            _ => NOT_READY_RESYNC,
        };
        Ok(NextRun::new(Stage::Steady, after))
    }

    /// Publishes an event on `rpc`. Failing to do so never fails the invocation.
    pub(crate) async fn publish(&self, rpc: &StarknetRPC, type_: EventType, reason: &str, note: String) {
        let Some(events) = self.events else {
            return;
        };
        let event = Event {
            type_,
            reason: reason.into(),
            note: Some(note),
            action: "Reconciling".into(),
            secondary: None,
        };
        if let Err(e) = events.record(&event, &rpc.object_ref(&())).await {
            warn!("Failed to publish event {} on '{}': {}", reason, rpc.name_any(), e);
        }
    }
}

fn settle(stage: Stage, outcome: PhaseOutcome) -> Result<Option<NextRun>> {
    match outcome {
        PhaseOutcome::Continue => Ok(None),
        PhaseOutcome::RepeatAfter(after) => Ok(Some(NextRun::new(stage, after))),
        PhaseOutcome::Terminate(reason) => Err(StdError::Terminated(format!("{stage}: {reason}")).into()),
    }
}
