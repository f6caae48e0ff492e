//! Guardrail error types

use careflow_types::{AssistantType, GuardrailViolation};
use thiserror::Error;

/// A hard (error-severity) guardrail rejection
///
/// Carries the full violation list so callers and the audit trail see every
/// rule that fired, not just the first.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// Input failed validation before reaching the model
    #[error("input guardrail rejected {assistant_type} input ({} violations)", .violations.len())]
    InputRejected {
        assistant_type: AssistantType,
        violations: Vec<GuardrailViolation>,
    },

    /// Output failed validation before reaching a human or downstream step
    #[error("output guardrail rejected {assistant_type} response ({} violations)", .violations.len())]
    OutputRejected {
        assistant_type: AssistantType,
        violations: Vec<GuardrailViolation>,
    },

    /// A configuration value outside its legal range
    #[error("invalid guardrail configuration: {0}")]
    InvalidConfig(String),
}

impl GuardrailError {
    /// The violations that caused the rejection, if any
    pub fn violations(&self) -> &[GuardrailViolation] {
        match self {
            Self::InputRejected { violations, .. } | Self::OutputRejected { violations, .. } => {
                violations
            }
            Self::InvalidConfig(_) => &[],
        }
    }
}

/// Result type alias for guardrail operations
pub type Result<T> = std::result::Result<T, GuardrailError>;
