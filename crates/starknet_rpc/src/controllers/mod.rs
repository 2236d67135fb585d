pub mod node;
pub mod reconcile;
pub mod restore;
pub mod starknetrpc_controller;
pub mod storage;

use kube::runtime::controller::Action;
use std::fmt;
use tokio::time::Duration;

/// What a phase asks of the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Done for this invocation, run the next phase
    Continue,
    /// Stop here and come back after the delay
    RepeatAfter(Duration),
    /// Stop for good, the resource cannot progress on its own
    Terminate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Storage,
    Restore,
    /// Waiting on the restore to resolve before starting the node
    RestoreGate,
    Node,
    /// Every phase ran to completion
    Steady,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Storage => "storage",
            Stage::Restore => "restore",
            Stage::RestoreGate => "restore_gate",
            Stage::Node => "node",
            Stage::Steady => "steady",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When and why the resource is reconciled again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRun {
    pub stage: Stage,
    pub after: Duration,
}

impl NextRun {
    pub fn new(stage: Stage, after: Duration) -> Self {
        Self { stage, after }
    }

    pub fn action(&self) -> Action {
        Action::requeue(self.after)
    }
}
