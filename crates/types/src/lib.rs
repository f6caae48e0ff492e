//! Shared data model for the Careflow clinical AI workflow engine
//!
//! This crate defines the vocabulary every other Careflow crate speaks:
//! workflow definitions and executions, assistant requests and responses,
//! guardrail verdicts, consent records, audit log entries, and the
//! orchestration error taxonomy.
//!
//! Definitions are immutable templates; executions are the mutable runtime
//! records derived from them. The two are distinct types so the definition
//! catalog can never be mutated by a live execution.

#![deny(unsafe_code)]

pub mod assistant;
pub mod audit;
pub mod clinical;
pub mod config;
pub mod consent;
pub mod error;
pub mod guardrail;
pub mod id;
pub mod workflow;

pub use assistant::{
    AssistantRequest, AssistantResponse, AssistantType, ConfidenceLevel, ResponseMetadata,
    Suggestion,
};
pub use audit::{
    AiAuditLog, ApprovalStatus, AuditEventType, AuditQueryParams, UsageStatistics,
};
pub use clinical::{
    CodeSuggestion, CodeType, CodingInput, DocumentationInput, InteractionSeverity,
    MedicationOrder, MedicationSafetyInput, MessageDraft, PatientMessageInput, SafetyAlert,
    SafetyAlertType, SoapNote, TriageAssessment, TriageInput, TriagePriority, TriageVitals,
};
pub use config::{RetryPolicy, WorkflowConfig};
pub use consent::ConsentRecord;
pub use error::{WorkflowError, WorkflowResult};
pub use guardrail::{
    GuardrailResult, GuardrailViolation, PhiRedaction, PhiType, RedactedField, ViolationSeverity,
};
pub use id::{ExecutionId, WorkflowDefinitionId};
pub use workflow::{
    StepExecution, StepStatus, StepTemplate, StepType, WorkflowContext, WorkflowDefinition,
    WorkflowDefinitionBuilder, WorkflowExecution, WorkflowStatus, WorkflowTriggerType,
};
