//! Workflow definitions, steps, and runtime execution records
//!
//! A [`WorkflowDefinition`] is an immutable template: an ordered list of
//! [`StepTemplate`]s plus trigger and consent metadata. Launching a workflow
//! snapshots those templates into mutable [`StepExecution`] records inside a
//! [`WorkflowExecution`], which the orchestrator then owns exclusively.

use crate::assistant::AssistantType;
use crate::error::{WorkflowError, WorkflowResult};
use crate::id::{ExecutionId, WorkflowDefinitionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

// ── Trigger and status enums ────────────────────────────────────────────────

/// Domain events that can start workflows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowTriggerType {
    EncounterCreated,
    LabResultReceived,
    DischargeInitiated,
    MedicationOrdered,
    PatientMessageReceived,
    ManualTrigger,
}

impl fmt::Display for WorkflowTriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EncounterCreated => "encounter_created",
            Self::LabResultReceived => "lab_result_received",
            Self::DischargeInitiated => "discharge_initiated",
            Self::MedicationOrdered => "medication_ordered",
            Self::PatientMessageReceived => "patient_message_received",
            Self::ManualTrigger => "manual_trigger",
        };
        write!(f, "{s}")
    }
}

/// Execution state machine
///
/// `Pending` and `InProgress` are transient; `Completed`, `Failed`,
/// `Rejected`, and `Cancelled` are terminal. `AwaitingApproval` holds the
/// execution until an explicit approve or reject call arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    AwaitingApproval,
    Approved,
    Rejected,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Rejected | Self::Cancelled
        )
    }

    /// Whether this status counts against the concurrency ceiling
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Per-step runtime status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
    AwaitingHuman,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::AwaitingHuman => "awaiting_human",
        };
        write!(f, "{s}")
    }
}

/// The kind of work a step performs
///
/// The orchestrator has no built-in knowledge of any of these; callers
/// register one executor per step type in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    AiAssistant,
    HumanReview,
    Validation,
    Notification,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AiAssistant => "ai_assistant",
            Self::HumanReview => "human_review",
            Self::Validation => "validation",
            Self::Notification => "notification",
        };
        write!(f, "{s}")
    }
}

// ── Context ─────────────────────────────────────────────────────────────────

/// Runtime context attached to an execution when it is triggered
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub organization_id: String,
    pub tenant_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
    /// What emitted the trigger (a user id, an integration name, ...)
    pub triggered_by: String,
    pub triggered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl WorkflowContext {
    /// Create a context with the required identity fields
    pub fn new(
        organization_id: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            organization_id: organization_id.into(),
            tenant_id: tenant_id.into(),
            triggered_by: user_id.clone(),
            user_id,
            patient_id: None,
            encounter_id: None,
            triggered_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn with_encounter(mut self, encounter_id: impl Into<String>) -> Self {
        self.encounter_id = Some(encounter_id.into());
        self
    }

    pub fn with_triggered_by(mut self, triggered_by: impl Into<String>) -> Self {
        self.triggered_by = triggered_by.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// ── Step templates and runtime records ──────────────────────────────────────

/// Immutable step blueprint embedded in a workflow definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepTemplate {
    pub id: String,
    pub name: String,
    pub step_type: StepType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_type: Option<AssistantType>,
    /// Opaque configuration passed to the step executor
    pub input: Value,
    pub requires_human_approval: bool,
    /// Total attempt budget: a step with `max_retries = 3` runs at most
    /// three times before the execution fails
    pub max_retries: u32,
}

/// Mutable runtime record for one step of one execution
///
/// Carries a copy of its template fields so live executions never read
/// through to the definition catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: String,
    pub name: String,
    pub step_type: StepType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_type: Option<AssistantType>,
    pub input: Value,
    pub requires_human_approval: bool,
    pub max_retries: u32,
    pub status: StepStatus,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepExecution {
    /// Snapshot a template into a fresh pending record
    pub fn from_template(template: &StepTemplate) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            step_type: template.step_type,
            assistant_type: template.assistant_type,
            input: template.input.clone(),
            requires_human_approval: template.requires_human_approval,
            max_retries: template.max_retries,
            status: StepStatus::Pending,
            retry_count: 0,
            output: None,
            error: None,
            completed_by: None,
            completed_at: None,
        }
    }

    /// Mark the step as running; increments the attempt counter
    pub fn start_attempt(&mut self) {
        self.status = StepStatus::InProgress;
        self.retry_count += 1;
    }

    /// Record a successful result
    pub fn complete(&mut self, output: Value) {
        self.status = StepStatus::Completed;
        self.output = Some(output);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    /// Record a failed attempt
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
    }

    /// Reset to pending ahead of a retry attempt
    pub fn reset_for_retry(&mut self) {
        self.status = StepStatus::Pending;
        self.error = None;
    }

    /// Whether the attempt budget is exhausted
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

// ── Workflow definition ─────────────────────────────────────────────────────

/// Immutable workflow template
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: WorkflowDefinitionId,
    pub name: String,
    pub description: String,
    pub trigger_type: WorkflowTriggerType,
    pub version: String,
    pub steps: Vec<StepTemplate>,
    pub consent_required: bool,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Start building a definition
    pub fn builder() -> WorkflowDefinitionBuilder {
        WorkflowDefinitionBuilder::new()
    }

    /// Structural validation: non-empty identity, at least one step,
    /// unique step ids
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.id.as_str().is_empty() {
            return Err(WorkflowError::Validation(
                "workflow definition id must not be empty".into(),
            ));
        }
        if self.name.is_empty() {
            return Err(WorkflowError::Validation(
                "workflow definition name must not be empty".into(),
            ));
        }
        if self.steps.is_empty() {
            return Err(WorkflowError::Validation(format!(
                "workflow '{}' has no steps",
                self.id
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if step.id.is_empty() {
                return Err(WorkflowError::Validation(format!(
                    "workflow '{}' has a step with an empty id",
                    self.id
                )));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(WorkflowError::Validation(format!(
                    "workflow '{}' has duplicate step id '{}'",
                    self.id, step.id
                )));
            }
        }
        Ok(())
    }
}

/// Builder for workflow definitions
#[derive(Debug, Default)]
pub struct WorkflowDefinitionBuilder {
    id: Option<WorkflowDefinitionId>,
    name: String,
    description: String,
    trigger_type: Option<WorkflowTriggerType>,
    version: String,
    steps: Vec<StepTemplate>,
    consent_required: bool,
    enabled: bool,
}

impl WorkflowDefinitionBuilder {
    pub fn new() -> Self {
        Self {
            version: "1.0.0".into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(WorkflowDefinitionId::new(id));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_trigger(mut self, trigger_type: WorkflowTriggerType) -> Self {
        self.trigger_type = Some(trigger_type);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn require_consent(mut self) -> Self {
        self.consent_required = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Add an AI assistant step
    pub fn add_ai_step(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        assistant_type: AssistantType,
        input: Value,
        requires_human_approval: bool,
        max_retries: u32,
    ) -> Self {
        self.steps.push(StepTemplate {
            id: id.into(),
            name: name.into(),
            step_type: StepType::AiAssistant,
            assistant_type: Some(assistant_type),
            input,
            requires_human_approval,
            max_retries,
        });
        self
    }

    /// Add a human review step
    pub fn add_human_review_step(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
    ) -> Self {
        self.steps.push(StepTemplate {
            id: id.into(),
            name: name.into(),
            step_type: StepType::HumanReview,
            assistant_type: None,
            input,
            requires_human_approval: true,
            max_retries: 1,
        });
        self
    }

    /// Add a validation step
    pub fn add_validation_step(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
        max_retries: u32,
    ) -> Self {
        self.steps.push(StepTemplate {
            id: id.into(),
            name: name.into(),
            step_type: StepType::Validation,
            assistant_type: None,
            input,
            requires_human_approval: false,
            max_retries,
        });
        self
    }

    /// Add a notification step
    pub fn add_notification_step(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
    ) -> Self {
        self.steps.push(StepTemplate {
            id: id.into(),
            name: name.into(),
            step_type: StepType::Notification,
            assistant_type: None,
            input,
            requires_human_approval: false,
            max_retries: 2,
        });
        self
    }

    /// Validate and produce the definition
    pub fn build(self) -> WorkflowResult<WorkflowDefinition> {
        let id = self
            .id
            .ok_or_else(|| WorkflowError::Validation("workflow definition id is required".into()))?;
        let trigger_type = self.trigger_type.ok_or_else(|| {
            WorkflowError::Validation("workflow definition trigger type is required".into())
        })?;
        let now = Utc::now();
        let definition = WorkflowDefinition {
            id,
            name: self.name,
            description: self.description,
            trigger_type,
            version: self.version,
            steps: self.steps,
            consent_required: self.consent_required,
            enabled: self.enabled,
            created_at: now,
            updated_at: now,
        };
        definition.validate()?;
        Ok(definition)
    }
}

// ── Workflow execution ──────────────────────────────────────────────────────

/// Mutable runtime instance of a workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub definition_id: WorkflowDefinitionId,
    pub context: WorkflowContext,
    pub status: WorkflowStatus,
    pub steps: Vec<StepExecution>,
    /// Pointer into `steps`; only moves forward except on retry
    pub current_step_index: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowExecution {
    /// Snapshot a definition's steps into a fresh pending execution
    pub fn new(definition: &WorkflowDefinition, context: WorkflowContext) -> Self {
        Self {
            id: ExecutionId::generate(),
            definition_id: definition.id.clone(),
            context,
            status: WorkflowStatus::Pending,
            steps: definition.steps.iter().map(StepExecution::from_template).collect(),
            current_step_index: 0,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// The step the pointer currently rests on, if any remain
    pub fn current_step(&self) -> Option<&StepExecution> {
        self.steps.get(self.current_step_index)
    }

    /// Mutable access to the current step
    pub fn current_step_mut(&mut self) -> Option<&mut StepExecution> {
        self.steps.get_mut(self.current_step_index)
    }

    /// Find a step by id
    pub fn step(&self, step_id: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Whether the execution has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, to: WorkflowStatus, legal_from: &[WorkflowStatus]) -> WorkflowResult<()> {
        if !legal_from.contains(&self.status) {
            return Err(WorkflowError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Pending → InProgress
    pub fn begin(&mut self) -> WorkflowResult<()> {
        self.transition(WorkflowStatus::InProgress, &[WorkflowStatus::Pending])
    }

    /// InProgress → AwaitingApproval (the run loop exits here)
    pub fn await_approval(&mut self) -> WorkflowResult<()> {
        self.transition(WorkflowStatus::AwaitingApproval, &[WorkflowStatus::InProgress])
    }

    /// AwaitingApproval → Approved
    pub fn approve(&mut self) -> WorkflowResult<()> {
        self.transition(WorkflowStatus::Approved, &[WorkflowStatus::AwaitingApproval])
    }

    /// Approved → InProgress (the run loop re-enters)
    pub fn resume(&mut self) -> WorkflowResult<()> {
        self.transition(WorkflowStatus::InProgress, &[WorkflowStatus::Approved])
    }

    /// InProgress → Completed
    pub fn complete(&mut self) -> WorkflowResult<()> {
        self.transition(WorkflowStatus::Completed, &[WorkflowStatus::InProgress])?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Any non-terminal → Failed
    pub fn fail(&mut self, error: impl Into<String>) -> WorkflowResult<()> {
        self.transition(
            WorkflowStatus::Failed,
            &[
                WorkflowStatus::Pending,
                WorkflowStatus::InProgress,
                WorkflowStatus::AwaitingApproval,
                WorkflowStatus::Approved,
            ],
        )?;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// AwaitingApproval → Rejected
    pub fn reject(&mut self, reason: impl Into<String>) -> WorkflowResult<()> {
        self.transition(
            WorkflowStatus::Rejected,
            &[WorkflowStatus::AwaitingApproval, WorkflowStatus::InProgress],
        )?;
        self.error = Some(reason.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Any non-terminal → Cancelled
    pub fn cancel(&mut self) -> WorkflowResult<()> {
        self.transition(
            WorkflowStatus::Cancelled,
            &[
                WorkflowStatus::Pending,
                WorkflowStatus::InProgress,
                WorkflowStatus::AwaitingApproval,
                WorkflowStatus::Approved,
            ],
        )?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_definition() -> WorkflowDefinition {
        WorkflowDefinition::builder()
            .with_id("test-flow-v1")
            .with_name("Test Flow")
            .with_trigger(WorkflowTriggerType::EncounterCreated)
            .add_ai_step(
                "draft",
                "Draft Note",
                AssistantType::Documentation,
                json!({}),
                true,
                3,
            )
            .add_notification_step("notify", "Notify Provider", json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_id_and_trigger() {
        let missing_id = WorkflowDefinition::builder()
            .with_name("No Id")
            .with_trigger(WorkflowTriggerType::ManualTrigger)
            .add_notification_step("n", "Notify", json!({}))
            .build();
        assert!(missing_id.is_err());

        let missing_trigger = WorkflowDefinition::builder()
            .with_id("no-trigger")
            .with_name("No Trigger")
            .add_notification_step("n", "Notify", json!({}))
            .build();
        assert!(missing_trigger.is_err());
    }

    #[test]
    fn test_builder_rejects_duplicate_step_ids() {
        let result = WorkflowDefinition::builder()
            .with_id("dup")
            .with_name("Dup")
            .with_trigger(WorkflowTriggerType::ManualTrigger)
            .add_notification_step("same", "One", json!({}))
            .add_notification_step("same", "Two", json!({}))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_empty_steps() {
        let result = WorkflowDefinition::builder()
            .with_id("empty")
            .with_name("Empty")
            .with_trigger(WorkflowTriggerType::ManualTrigger)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_execution_snapshots_steps() {
        let def = make_definition();
        let exec = WorkflowExecution::new(&def, WorkflowContext::new("org-1", "tenant-1", "user-1"));

        assert_eq!(exec.status, WorkflowStatus::Pending);
        assert_eq!(exec.steps.len(), 2);
        assert_eq!(exec.current_step_index, 0);
        assert!(exec.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert!(exec.steps.iter().all(|s| s.retry_count == 0));
    }

    #[test]
    fn test_happy_path_transitions() {
        let def = make_definition();
        let mut exec =
            WorkflowExecution::new(&def, WorkflowContext::new("org-1", "tenant-1", "user-1"));

        exec.begin().unwrap();
        assert_eq!(exec.status, WorkflowStatus::InProgress);

        exec.await_approval().unwrap();
        exec.approve().unwrap();
        exec.resume().unwrap();
        exec.complete().unwrap();

        assert!(exec.is_terminal());
        assert!(exec.completed_at.is_some());
    }

    #[test]
    fn test_terminal_states_refuse_transitions() {
        let def = make_definition();
        let mut exec =
            WorkflowExecution::new(&def, WorkflowContext::new("org-1", "tenant-1", "user-1"));
        exec.begin().unwrap();
        exec.cancel().unwrap();

        assert!(matches!(
            exec.begin(),
            Err(WorkflowError::InvalidStateTransition { .. })
        ));
        assert!(exec.fail("late failure").is_err());
        assert!(exec.cancel().is_err());
    }

    #[test]
    fn test_approve_requires_awaiting() {
        let def = make_definition();
        let mut exec =
            WorkflowExecution::new(&def, WorkflowContext::new("org-1", "tenant-1", "user-1"));
        assert!(exec.approve().is_err());
    }

    #[test]
    fn test_step_attempt_accounting() {
        let def = make_definition();
        let mut step = StepExecution::from_template(&def.steps[0]);

        step.start_attempt();
        assert_eq!(step.status, StepStatus::InProgress);
        assert_eq!(step.retry_count, 1);

        step.fail("model unavailable");
        assert!(!step.retries_exhausted());

        step.reset_for_retry();
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.error.is_none());

        step.start_attempt();
        step.fail("model unavailable");
        step.reset_for_retry();
        step.start_attempt();
        step.fail("model unavailable");
        assert!(step.retries_exhausted());
    }

    #[test]
    fn test_status_classification() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Rejected.is_terminal());
        assert!(!WorkflowStatus::AwaitingApproval.is_terminal());
        assert!(WorkflowStatus::Pending.is_active());
        assert!(!WorkflowStatus::AwaitingApproval.is_active());
    }
}
