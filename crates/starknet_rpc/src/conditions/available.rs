use std::fmt;

use super::ConditionStatus;

/// Lifecycle of the long-running node pod
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailablePhase {
    /// Waiting for the restore to resolve
    Pending,
    /// The pod was created and is starting
    Creating,
    /// Serving requests, still behind the chain head
    CatchingUp,
    /// Serving requests and synced
    Ready,
    /// The pod crashed or was evicted
    Failed,
    /// A previously healthy pod stopped answering probes.
    ///
    /// Kept distinct from `Failed` so that an overloaded node is not recreated,
    /// which could cascade to the other replicas.
    Unknown,
}

impl AvailablePhase {
    pub const ALL: [AvailablePhase; 6] = [
        AvailablePhase::Pending,
        AvailablePhase::Creating,
        AvailablePhase::CatchingUp,
        AvailablePhase::Ready,
        AvailablePhase::Failed,
        AvailablePhase::Unknown,
    ];

    pub fn status(&self) -> ConditionStatus {
        match self {
            AvailablePhase::Ready => ConditionStatus::True,
            AvailablePhase::Failed => ConditionStatus::False,
            AvailablePhase::Pending
            | AvailablePhase::Creating
            | AvailablePhase::CatchingUp
            | AvailablePhase::Unknown => ConditionStatus::Unknown,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AvailablePhase::Pending => "Pending",
            AvailablePhase::Creating => "Creating",
            AvailablePhase::CatchingUp => "CatchingUp",
            AvailablePhase::Ready => "Ready",
            AvailablePhase::Failed => "Failed",
            AvailablePhase::Unknown => "Unknown",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AvailablePhase::Pending => "The RPC is waiting for the initial state to be ready",
            AvailablePhase::Creating => "RPC pod is being scheduled",
            AvailablePhase::CatchingUp => "The node is catching up with the latest block",
            AvailablePhase::Ready => "The node is ready and fully synced",
            AvailablePhase::Failed => "The node failed to start, or another error occurred",
            AvailablePhase::Unknown => "Impossible to determine the status of the node",
        }
    }

    pub fn from_reason(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.reason() == reason)
    }

    /// Whether the node answered probes at some point since it was created
    pub fn has_served(&self) -> bool {
        matches!(self, AvailablePhase::CatchingUp | AvailablePhase::Ready)
    }
}

impl fmt::Display for AvailablePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}
