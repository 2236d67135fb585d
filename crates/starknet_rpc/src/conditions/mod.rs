//! Condition state machine of a `StarknetRPC`.
//!
//! Two independent axes are tracked on the status block, each as one
//! condition record keyed by its type: [`RESTORE`] follows the archive
//! restore and [`AVAILABLE`] follows the node pod. Phases only ever produce
//! whole records, which are merged into the existing list.

pub mod available;
pub mod restore;

pub use available::AvailablePhase;
pub use restore::RestorePhase;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::ResourceExt;
use std::fmt;
use tracing::info;

use crate::api::v1alpha1::StarknetRPC;
use crate::client::ObjectStore;
use crate::util::status::{find_status_condition, is_status_condition_true, set_status_condition};
use crate::util::Result;

pub const RESTORE: &str = "Restore";
pub const AVAILABLE: &str = "Available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Move one axis to a new phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Restore(RestorePhase),
    Available(AvailablePhase),
}

impl Transition {
    pub fn condition_type(&self) -> &'static str {
        match self {
            Transition::Restore(_) => RESTORE,
            Transition::Available(_) => AVAILABLE,
        }
    }

    pub fn to_condition(&self, observed_generation: Option<i64>) -> Condition {
        let (status, reason, message) = match self {
            Transition::Restore(phase) => (phase.status(), phase.reason(), phase.message()),
            Transition::Available(phase) => (phase.status(), phase.reason(), phase.message()),
        };
        Condition {
            type_: self.condition_type().to_string(),
            status: status.to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: Time(Utc::now()),
            observed_generation,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Restore(phase) => write!(f, "{RESTORE}={phase}"),
            Transition::Available(phase) => write!(f, "{AVAILABLE}={phase}"),
        }
    }
}

/// Merges the transitions into the status of `rpc` and persists it once if
/// anything changed. `rpc` is replaced by the stored object, so a following
/// write in the same invocation carries the new `resourceVersion`.
pub async fn apply_transitions<S: ObjectStore>(
    store: &S,
    rpc: &mut StarknetRPC,
    transitions: &[Transition],
) -> Result<bool> {
    let generation = rpc.metadata.generation;
    let status = rpc.status.get_or_insert_with(Default::default);

    let mut changed = false;
    for transition in transitions {
        changed |= set_status_condition(&mut status.conditions, transition.to_condition(generation));
    }
    if !changed {
        return Ok(false);
    }

    *rpc = store.update_status(&*rpc).await?;

    let applied: Vec<String> = transitions.iter().map(ToString::to_string).collect();
    info!(
        "StarknetRPC '{}' transitioned to {}",
        rpc.name_any(),
        applied.join(", ")
    );
    Ok(true)
}

/// Seeds both axes to `Pending` when the resource has no conditions yet
pub async fn initialize<S: ObjectStore>(store: &S, rpc: &mut StarknetRPC) -> Result<bool> {
    if rpc.status.as_ref().is_some_and(|status| !status.conditions.is_empty()) {
        return Ok(false);
    }
    apply_transitions(
        store,
        rpc,
        &[
            Transition::Restore(RestorePhase::Pending),
            Transition::Available(AvailablePhase::Pending),
        ],
    )
    .await
}

fn conditions(rpc: &StarknetRPC) -> &[Condition] {
    rpc.status
        .as_ref()
        .map(|status| status.conditions.as_slice())
        .unwrap_or_default()
}

pub fn restore_phase(rpc: &StarknetRPC) -> Option<RestorePhase> {
    find_status_condition(conditions(rpc), RESTORE).and_then(|c| RestorePhase::from_reason(&c.reason))
}

pub fn available_phase(rpc: &StarknetRPC) -> Option<AvailablePhase> {
    find_status_condition(conditions(rpc), AVAILABLE).and_then(|c| AvailablePhase::from_reason(&c.reason))
}

/// The restore succeeded or was skipped
pub fn is_restore_resolved(rpc: &StarknetRPC) -> bool {
    is_status_condition_true(conditions(rpc), RESTORE)
}
