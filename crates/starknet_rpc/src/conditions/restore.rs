use std::fmt;

use super::ConditionStatus;

/// Progress of the one-shot archive restore into the data volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    /// The restore is being set up
    Pending,
    /// The restore job is running
    Restoring,
    Success,
    /// The restore job failed. Needs manual intervention.
    Failed,
    /// Restore disabled on the resource
    Skipped,
}

impl RestorePhase {
    pub const ALL: [RestorePhase; 5] = [
        RestorePhase::Pending,
        RestorePhase::Restoring,
        RestorePhase::Success,
        RestorePhase::Failed,
        RestorePhase::Skipped,
    ];

    pub fn status(&self) -> ConditionStatus {
        match self {
            RestorePhase::Pending | RestorePhase::Restoring | RestorePhase::Failed => ConditionStatus::False,
            RestorePhase::Success | RestorePhase::Skipped => ConditionStatus::True,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            RestorePhase::Pending => "Pending",
            RestorePhase::Restoring => "Restoring",
            RestorePhase::Success => "Success",
            RestorePhase::Failed => "Failed",
            RestorePhase::Skipped => "Skipped",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RestorePhase::Pending => "Restore operation is being set up",
            RestorePhase::Restoring => "Restore operation is in progress",
            RestorePhase::Success => "Restore operation has completed successfully",
            RestorePhase::Failed => "Restore operation has failed",
            RestorePhase::Skipped => "Restore operation was skipped by the configuration",
        }
    }

    pub fn from_reason(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.reason() == reason)
    }
}

impl fmt::Display for RestorePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}
