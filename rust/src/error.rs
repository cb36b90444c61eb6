//! Error types for each pipeline stage.

use thiserror::Error;

/// Structural problems in the source matrix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Malformed hierarchy at {path}: {reason}")]
    MalformedHierarchy { path: String, reason: String },
}

/// Failures of the critical-path solver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Codes of one cycle in dependency order; the first code repeats at the end.
    #[error("Cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
    #[error("Duplicate WBS code: {0}")]
    DuplicateWbs(String),
}

/// Failures while projecting tasks into a downstream payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("No external identity for employee {employee_code} (task {wbs_code})")]
    UnresolvedIdentity {
        wbs_code: String,
        employee_code: String,
    },
    #[error("Task {0} has not been scheduled")]
    Unscheduled(String),
}

/// Any error a scheduling run can surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl EngineError {
    /// WBS codes (or node paths) the caller should point the user at.
    pub fn offending_codes(&self) -> Vec<String> {
        match self {
            EngineError::Hierarchy(HierarchyError::MalformedHierarchy { path, .. }) => {
                vec![path.clone()]
            }
            EngineError::Schedule(ScheduleError::CyclicDependency(codes)) => {
                let mut codes = codes.clone();
                if codes.len() > 1 && codes.first() == codes.last() {
                    codes.pop();
                }
                codes
            }
            EngineError::Schedule(ScheduleError::DuplicateWbs(code)) => vec![code.clone()],
            EngineError::Payload(PayloadError::UnresolvedIdentity { wbs_code, .. })
            | EngineError::Payload(PayloadError::Unscheduled(wbs_code)) => vec![wbs_code.clone()],
        }
    }
}
