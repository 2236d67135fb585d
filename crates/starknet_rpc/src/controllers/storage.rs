use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::reconcile::RpcReconciler;
use super::PhaseOutcome;
use crate::api::v1alpha1::StarknetRPC;
use crate::client::{is_not_found, is_rejected, ObjectStore};
use crate::conditions::{apply_transitions, RestorePhase, Transition};
use crate::converge::{create_or_reconcile, FieldReconciler};
use crate::probe::NodeProbe;
use crate::resources::{self, pvc};
use crate::util::Result;

pub const CLAIM_BINDING_DELAY: Duration = Duration::from_secs(1);

impl<S, P> RpcReconciler<'_, S, P>
where
    S: ObjectStore,
    P: NodeProbe,
{
    /// Ensures the data claim exists with the requested size. A new claim is
    /// empty, so it resets the restore.
    pub(crate) async fn reconcile_storage(&self, rpc: &mut StarknetRPC) -> Result<PhaseOutcome> {
        let claim = create_or_reconcile(self.store, &pvc::data_claim(rpc)?, &[]).await?;

        if claim.created {
            self.publish(
                rpc,
                EventType::Normal,
                "StorageCreated",
                format!("Created data claim `{}`", claim.object.name_any()),
            )
            .await;
            apply_transitions(self.store, rpc, &[Transition::Restore(RestorePhase::Pending)]).await?;
        } else {
            self.grow_storage(rpc, claim.object).await?;
        }

        Ok(PhaseOutcome::Continue)
    }

    /// Requests a larger data claim when the wanted size grew. A resize the API
    /// server refuses is reported and leaves the claim as it is.
    async fn grow_storage(&self, rpc: &StarknetRPC, mut claim: PersistentVolumeClaim) -> Result<()> {
        let size = pvc::StorageSizeReconciler::new(&rpc.spec.storage.size);
        if size.is_up_to_date(&claim) {
            return Ok(());
        }
        size.update(&mut claim);

        match self.store.replace(&claim).await {
            Ok(claim) => {
                info!("Requested {} for data claim '{}'", rpc.spec.storage.size.0, claim.name_any());
                Ok(())
            }
            Err(e) if is_rejected(&e) => {
                warn!("Resize of data claim '{}' rejected: {}", claim.name_any(), e);
                self.publish(
                    rpc,
                    EventType::Warning,
                    "StorageResizeRejected",
                    format!(
                        "Data claim `{}` could not grow to {}: {}",
                        claim.name_any(),
                        rpc.spec.storage.size.0,
                        e
                    ),
                )
                .await;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Continues once the data claim is bound to a volume
    pub(crate) async fn ensure_storage_bound(&self, rpc: &StarknetRPC) -> Result<PhaseOutcome> {
        let namespace = rpc.namespace().unwrap_or_default();
        let claim = match self
            .store
            .get::<PersistentVolumeClaim>(&namespace, &resources::data_claim_name(rpc))
            .await
        {
            Ok(claim) => claim,
            Err(e) if is_not_found(&e) => return Ok(PhaseOutcome::RepeatAfter(CLAIM_BINDING_DELAY)),
            Err(e) => return Err(e.into()),
        };

        if pvc::is_bound(&claim) {
            Ok(PhaseOutcome::Continue)
        } else {
            debug!("Data claim '{}' is not bound yet", claim.name_any());
            Ok(PhaseOutcome::RepeatAfter(CLAIM_BINDING_DELAY))
        }
    }
}
