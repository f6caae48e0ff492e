//! Orchestration error taxonomy

use crate::id::{ExecutionId, WorkflowDefinitionId};
use crate::workflow::{StepStatus, StepType, WorkflowStatus};
use thiserror::Error;

/// Orchestration-level structural errors
///
/// Each variant carries a stable machine-readable code via [`code`].
///
/// [`code`]: WorkflowError::code
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No definition registered under the given id
    #[error("workflow definition not found: {0}")]
    DefinitionNotFound(WorkflowDefinitionId),

    /// Definition exists but is disabled
    #[error("workflow definition is disabled: {0}")]
    DefinitionDisabled(WorkflowDefinitionId),

    /// The concurrency ceiling has been reached
    #[error("maximum concurrent workflows reached (limit {limit})")]
    MaxWorkflowsExceeded { limit: usize },

    /// No executor registered for a step type
    #[error("no executor registered for step type '{0}'")]
    ExecutorNotFound(StepType),

    /// No execution with the given id
    #[error("workflow execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    /// Execution exists but has no step with the given id
    #[error("step '{step_id}' not found in execution {execution_id}")]
    StepNotFound {
        execution_id: ExecutionId,
        step_id: String,
    },

    /// A step-level operation was attempted in the wrong step status
    #[error("step '{step_id}' is {status}, which does not permit this operation")]
    InvalidStepStatus { step_id: String, status: StepStatus },

    /// An execution-level transition that the state machine forbids
    #[error("invalid workflow state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    /// A step exceeded its wall-clock budget
    #[error("step '{step_id}' timed out after {timeout_secs}s")]
    StepTimeout { step_id: String, timeout_secs: u64 },

    /// Definition or builder validation failed
    #[error("workflow validation failed: {0}")]
    Validation(String),

    /// An audit write failed; never swallowed
    #[error("audit logging failed: {0}")]
    Audit(String),
}

impl WorkflowError {
    /// Stable machine-readable code for the error class
    pub fn code(&self) -> &'static str {
        match self {
            Self::DefinitionNotFound(_) => "WORKFLOW_NOT_FOUND",
            Self::DefinitionDisabled(_) => "WORKFLOW_DISABLED",
            Self::MaxWorkflowsExceeded { .. } => "MAX_WORKFLOWS_EXCEEDED",
            Self::ExecutorNotFound(_) => "EXECUTOR_NOT_FOUND",
            Self::ExecutionNotFound(_) => "EXECUTION_NOT_FOUND",
            Self::StepNotFound { .. } => "STEP_NOT_FOUND",
            Self::InvalidStepStatus { .. } => "INVALID_STEP_STATUS",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::StepTimeout { .. } => "STEP_TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Audit(_) => "AUDIT_ERROR",
        }
    }
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            WorkflowError::MaxWorkflowsExceeded { limit: 100 }.code(),
            "MAX_WORKFLOWS_EXCEEDED"
        );
        assert_eq!(
            WorkflowError::DefinitionNotFound(WorkflowDefinitionId::new("x")).code(),
            "WORKFLOW_NOT_FOUND"
        );
        assert_eq!(
            WorkflowError::InvalidStateTransition {
                from: WorkflowStatus::Completed,
                to: WorkflowStatus::InProgress,
            }
            .code(),
            "INVALID_STATE_TRANSITION"
        );
    }

    #[test]
    fn test_display_names_the_step() {
        let err = WorkflowError::StepTimeout {
            step_id: "draft-note".into(),
            timeout_secs: 300,
        };
        assert!(err.to_string().contains("draft-note"));
        assert!(err.to_string().contains("300"));
    }
}
