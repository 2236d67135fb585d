use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::reconcile::RpcReconciler;
use super::storage::CLAIM_BINDING_DELAY;
use super::PhaseOutcome;
use crate::api::v1alpha1::StarknetRPC;
use crate::client::{ignore_not_found, ObjectStore};
use crate::conditions::{self, apply_transitions, RestorePhase, Transition};
use crate::converge::create_or_reconcile;
use crate::probe::NodeProbe;
use crate::resources::job::{self, JobOutcome};
use crate::resources::{self, pvc};
use crate::util::Result;

pub const JOB_STARTED_DELAY: Duration = Duration::from_secs(1);
/// Restores take minutes
pub const JOB_RUNNING_DELAY: Duration = Duration::from_secs(30);

impl<S, P> RpcReconciler<'_, S, P>
where
    S: ObjectStore,
    P: NodeProbe,
{
    pub(crate) async fn reconcile_restore(&self, rpc: &mut StarknetRPC) -> Result<PhaseOutcome> {
        if !rpc.spec.restore_archive.enable {
            debug!("Archive restore disabled for '{}'", rpc.name_any());
            apply_transitions(self.store, rpc, &[Transition::Restore(RestorePhase::Skipped)]).await?;
            return Ok(PhaseOutcome::Continue);
        }

        if conditions::is_restore_resolved(rpc) {
            self.cleanup_restore(rpc).await?;
            return Ok(PhaseOutcome::Continue);
        }

        let scratch = create_or_reconcile(self.store, &pvc::scratch_claim(rpc)?, &[]).await?;
        if !pvc::is_bound(&scratch.object) {
            debug!("Scratch claim '{}' is not bound yet", scratch.object.name_any());
            return Ok(PhaseOutcome::RepeatAfter(CLAIM_BINDING_DELAY));
        }

        match self.ensure_storage_bound(rpc).await? {
            PhaseOutcome::Continue => {}
            waiting => return Ok(waiting),
        }

        let restore = create_or_reconcile(self.store, &job::restore_job(rpc, self.images)?, &[]).await?;
        let job_name = restore.object.name_any();
        if restore.created {
            self.publish(
                rpc,
                EventType::Normal,
                "RestoreStarted",
                format!("Restoring `{}` with job `{}`", rpc.spec.restore_archive.file_name, job_name),
            )
            .await;
            apply_transitions(self.store, rpc, &[Transition::Restore(RestorePhase::Restoring)]).await?;
            return Ok(PhaseOutcome::RepeatAfter(JOB_STARTED_DELAY));
        }

        match job::job_outcome(&restore.object) {
            JobOutcome::Succeeded => {
                if apply_transitions(self.store, rpc, &[Transition::Restore(RestorePhase::Success)]).await? {
                    info!("Archive restore of '{}' completed", rpc.name_any());
                    self.publish(
                        rpc,
                        EventType::Normal,
                        "RestoreSucceeded",
                        format!("Job `{job_name}` restored the archive"),
                    )
                    .await;
                }
                Ok(PhaseOutcome::RepeatAfter(JOB_STARTED_DELAY))
            }
            JobOutcome::Failed => {
                if apply_transitions(self.store, rpc, &[Transition::Restore(RestorePhase::Failed)]).await? {
                    warn!("Archive restore of '{}' failed", rpc.name_any());
                    self.publish(
                        rpc,
                        EventType::Warning,
                        "RestoreFailed",
                        format!("Job `{job_name}` failed, the restore needs manual intervention"),
                    )
                    .await;
                }
                Ok(PhaseOutcome::Terminate(format!("restore job '{job_name}' failed")))
            }
            JobOutcome::Running => {
                debug!("Restore job '{}' still running", job_name);
                Ok(PhaseOutcome::RepeatAfter(JOB_RUNNING_DELAY))
            }
        }
    }

    /// Drops the restore job and its scratch space once they served their purpose
    async fn cleanup_restore(&self, rpc: &StarknetRPC) -> Result<()> {
        let namespace = rpc.namespace().unwrap_or_default();
        ignore_not_found(
            self.store
                .delete::<Job>(&namespace, &resources::restore_job_name(rpc))
                .await,
        )?;
        ignore_not_found(
            self.store
                .delete::<PersistentVolumeClaim>(&namespace, &resources::scratch_claim_name(rpc))
                .await,
        )?;
        Ok(())
    }
}
