use serde::Serialize;

use crate::error::{ExecutionError, RollbackError};
use crate::intent::PrimitiveStep;
use crate::model::{AdminState, Interface, LinkType};

/// Where an interface was left after a failed operation, compared with how
/// it looked before the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// Same name and link type as before the operation. The interface may be
    /// left DOWN.
    Restored,
    /// Left DOWN with part of the new configuration applied.
    PartiallyApplied,
    /// A rollback step failed or the state could not be established.
    Unknown,
}

impl RecoveryOutcome {
    pub fn classify(before: &Interface, after: &Interface) -> Self {
        if after.name == before.name && after.link_type == before.link_type {
            RecoveryOutcome::Restored
        } else if after.admin_state == AdminState::Down {
            RecoveryOutcome::PartiallyApplied
        } else {
            RecoveryOutcome::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSource {
    /// Read back from the OS after the operation
    Observed,
    /// Derived from the steps that reported success
    Tracked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalState {
    pub interface: Interface,
    pub source: StateSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// 0-based index of the failing step
    pub step_index: usize,
    pub step: PrimitiveStep,
    pub reason: ExecutionError,
    /// `None` for the service restart, which has no rollback semantics
    pub recovery: Option<RecoveryOutcome>,
    pub rollback_errors: Vec<RollbackError>,
    pub final_state: Option<FinalState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationResult {
    /// `final_state` is `None` for the service restart
    Success { final_state: Option<FinalState> },
    Failed(Failure),
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success { .. })
    }

    /// Interface name after the operation, when one is involved.
    pub fn final_name(&self) -> Option<&str> {
        let state = match self {
            OperationResult::Success { final_state } => final_state.as_ref(),
            OperationResult::Failed(failure) => failure.final_state.as_ref(),
        };
        state.map(|s| s.interface.name.as_str())
    }

    pub fn recovery(&self) -> Option<RecoveryOutcome> {
        match self {
            OperationResult::Success { .. } => None,
            OperationResult::Failed(failure) => failure.recovery,
        }
    }
}
