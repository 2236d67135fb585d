use k8s_openapi::api::core::v1::Pod;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use tokio::time::Duration;
use tracing::{debug, warn};

use super::reconcile::RpcReconciler;
use super::PhaseOutcome;
use crate::api::v1alpha1::StarknetRPC;
use crate::client::{ignore_not_found, ObjectStore};
use crate::conditions::{self, apply_transitions, AvailablePhase, Transition};
use crate::converge::create_or_reconcile;
use crate::probe::NodeProbe;
use crate::resources::pod;
use crate::util::Result;

pub const TERMINATING_DELAY: Duration = Duration::from_secs(5);

impl<S, P> RpcReconciler<'_, S, P>
where
    S: ObjectStore,
    P: NodeProbe,
{
    pub(crate) async fn reconcile_node(&self, rpc: &mut StarknetRPC) -> Result<PhaseOutcome> {
        let image = pod::ImageReconciler::new(pod::node_image(rpc, self.images));
        let node = create_or_reconcile(self.store, &pod::node_pod(rpc, self.images)?, &[&image]).await?;
        let pod_name = node.object.name_any();

        if node.created {
            self.publish(
                rpc,
                EventType::Normal,
                "NodeCreated",
                format!("Created node pod `{pod_name}`"),
            )
            .await;
            apply_transitions(self.store, rpc, &[Transition::Available(AvailablePhase::Creating)]).await?;
        }

        if pod::is_terminating(&node.object) {
            debug!("Node pod '{}' is terminating", pod_name);
            return Ok(PhaseOutcome::RepeatAfter(TERMINATING_DELAY));
        }

        if pod::should_recreate(&node.object) {
            warn!("Node pod '{}' is unhealthy, recreating it", pod_name);
            apply_transitions(self.store, rpc, &[Transition::Available(AvailablePhase::Failed)]).await?;
            ignore_not_found(
                self.store
                    .delete::<Pod>(&rpc.namespace().unwrap_or_default(), &pod_name)
                    .await,
            )?;
            self.publish(
                rpc,
                EventType::Warning,
                "NodeRecreated",
                format!("Deleted unhealthy node pod `{pod_name}`"),
            )
            .await;
            return Ok(PhaseOutcome::RepeatAfter(Duration::ZERO));
        }

        if let Some(phase) = self.probe_node(rpc, &node.object).await {
            apply_transitions(self.store, rpc, &[Transition::Available(phase)]).await?;
        }
        Ok(PhaseOutcome::Continue)
    }

    /// Phase the probes point to, `None` when nothing should change
    async fn probe_node(&self, rpc: &StarknetRPC, node: &Pod) -> Option<AvailablePhase> {
        match self.probe.is_ready(node).await {
            Ok(true) => match self.probe.is_synced(node).await {
                Ok(true) => Some(AvailablePhase::Ready),
                Ok(false) => Some(AvailablePhase::CatchingUp),
                Err(e) => {
                    debug!("Sync probe of '{}' failed: {}", node.name_any(), e);
                    Some(AvailablePhase::CatchingUp)
                }
            },
            outcome => {
                if let Err(e) = outcome {
                    debug!("Readiness probe of '{}' failed: {}", node.name_any(), e);
                }
                // a starting node not answering yet is expected
                conditions::available_phase(rpc)
                    .is_some_and(|phase| phase.has_served())
                    .then_some(AvailablePhase::Unknown)
            }
        }
    }
}
