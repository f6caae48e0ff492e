//! Audit entry construction and read-side aggregation

use crate::error::{AuditError, Result};
use crate::repository::AuditRepository;
use careflow_guardrails::PhiRedactor;
use careflow_types::{
    AiAuditLog, ApprovalStatus, AssistantRequest, AssistantResponse, AssistantType,
    AuditEventType, AuditQueryParams, GuardrailViolation, Suggestion, UsageStatistics,
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Maximum characters kept from a redacted input summary
const SUMMARY_CAP: usize = 500;

/// Builds and persists audit entries, one per significant event
pub struct AuditLogger {
    repository: Arc<dyn AuditRepository>,
    redactor: PhiRedactor,
}

impl AuditLogger {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self {
            repository,
            redactor: PhiRedactor::new(),
        }
    }

    // ── Write side ──────────────────────────────────────────────────────────

    /// Record an assistant request about to be dispatched
    pub async fn log_ai_request(
        &self,
        request: &AssistantRequest,
        workflow_execution_id: Option<&str>,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::AiRequest,
            &request.organization_id,
            &request.tenant_id,
            &request.user_id,
        );
        log.patient_id = request.patient_id.clone();
        log.encounter_id = request.encounter_id.clone();
        log.workflow_execution_id = workflow_execution_id.map(String::from);
        log.assistant_type = Some(request.assistant_type);
        log.input_summary = Some(self.redacted_summary(&request.input));
        log.consent_verified = request.consent_verified;
        self.save(log).await
    }

    /// Record the AI request that starts a workflow execution
    ///
    /// Workflow-level request entries carry the execution id so the full
    /// execution trail starts at the trigger, before any step runs.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_workflow_request(
        &self,
        organization_id: &str,
        tenant_id: &str,
        user_id: &str,
        patient_id: Option<&str>,
        workflow_execution_id: &str,
        definition_id: &str,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::AiRequest,
            organization_id,
            tenant_id,
            user_id,
        );
        log.patient_id = patient_id.map(String::from);
        log.workflow_execution_id = Some(workflow_execution_id.to_string());
        log.input_summary = Some(format!("workflow '{definition_id}' execution started"));
        self.save(log).await
    }

    /// Record an assistant response; stores only a digest of the output
    pub async fn log_ai_response(
        &self,
        request: &AssistantRequest,
        response: &AssistantResponse,
        workflow_execution_id: Option<&str>,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::AiResponse,
            &request.organization_id,
            &request.tenant_id,
            &request.user_id,
        );
        log.patient_id = request.patient_id.clone();
        log.encounter_id = request.encounter_id.clone();
        log.workflow_execution_id = workflow_execution_id.map(String::from);
        log.assistant_type = Some(response.assistant_type);
        log.model_version = Some(response.metadata.model_version.clone());
        log.prompt_template_id = Some(response.metadata.prompt_template_id.clone());
        log.output_hash = Some(hash_suggestions(&response.suggestions)?);
        log.confidence_score = response.average_confidence();
        log.processing_time_ms = Some(response.metadata.processing_time_ms);
        log.consent_verified = request.consent_verified;
        self.save(log).await
    }

    /// Record a human review decision
    #[allow(clippy::too_many_arguments)]
    pub async fn log_human_review(
        &self,
        organization_id: &str,
        tenant_id: &str,
        reviewer_id: &str,
        workflow_execution_id: &str,
        status: ApprovalStatus,
        notes: Option<&str>,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::HumanReview,
            organization_id,
            tenant_id,
            reviewer_id,
        );
        log.workflow_execution_id = Some(workflow_execution_id.to_string());
        log.approval_status = Some(status);
        log.input_summary = notes.map(|n| self.redact_and_cap(n));
        self.save(log).await
    }

    /// Record an approval
    pub async fn log_approval(
        &self,
        organization_id: &str,
        tenant_id: &str,
        approver_id: &str,
        workflow_execution_id: &str,
        notes: Option<&str>,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::Approval,
            organization_id,
            tenant_id,
            approver_id,
        );
        log.workflow_execution_id = Some(workflow_execution_id.to_string());
        log.approval_status = Some(ApprovalStatus::Approved);
        log.input_summary = notes.map(|n| self.redact_and_cap(n));
        self.save(log).await
    }

    /// Record a rejection with its reason
    pub async fn log_rejection(
        &self,
        organization_id: &str,
        tenant_id: &str,
        reviewer_id: &str,
        workflow_execution_id: &str,
        reason: &str,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::Rejection,
            organization_id,
            tenant_id,
            reviewer_id,
        );
        log.workflow_execution_id = Some(workflow_execution_id.to_string());
        log.approval_status = Some(ApprovalStatus::Rejected);
        log.input_summary = Some(self.redact_and_cap(reason));
        self.save(log).await
    }

    /// Record a guardrail rejection with the full violation list
    #[allow(clippy::too_many_arguments)]
    pub async fn log_guardrail_violation(
        &self,
        organization_id: &str,
        tenant_id: &str,
        user_id: &str,
        assistant_type: AssistantType,
        violations: Vec<GuardrailViolation>,
        input: &Value,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::GuardrailViolation,
            organization_id,
            tenant_id,
            user_id,
        );
        log.assistant_type = Some(assistant_type);
        log.guardrails_passed = false;
        log.violations = violations;
        log.input_summary = Some(self.redacted_summary(input));
        self.save(log).await
    }

    /// Record the outcome of a consent evaluation
    #[allow(clippy::too_many_arguments)]
    pub async fn log_consent_check(
        &self,
        organization_id: &str,
        tenant_id: &str,
        user_id: &str,
        patient_id: &str,
        granted: bool,
        reason: Option<&str>,
    ) -> Result<AiAuditLog> {
        let mut log = AiAuditLog::new(
            AuditEventType::ConsentCheck,
            organization_id,
            tenant_id,
            user_id,
        );
        log.patient_id = Some(patient_id.to_string());
        log.consent_verified = granted;
        log.input_summary = reason.map(|r| self.redact_and_cap(r));
        self.save(log).await
    }

    async fn save(&self, log: AiAuditLog) -> Result<AiAuditLog> {
        self.repository.save(log.clone()).await?;
        tracing::debug!(
            audit_id = %log.id,
            event_type = %log.event_type,
            organization_id = %log.organization_id,
            "audit entry saved"
        );
        Ok(log)
    }

    // ── Read side ───────────────────────────────────────────────────────────

    /// Matching entries, newest first
    pub async fn query_logs(&self, params: &AuditQueryParams) -> Result<Vec<AiAuditLog>> {
        self.repository.query(params).await
    }

    /// Number of matching entries
    pub async fn count_logs(&self, params: &AuditQueryParams) -> Result<u64> {
        self.repository.count(params).await
    }

    /// Every entry touching one patient
    pub async fn patient_audit_trail(
        &self,
        organization_id: &str,
        patient_id: &str,
    ) -> Result<Vec<AiAuditLog>> {
        let params = AuditQueryParams::for_organization(organization_id).with_patient(patient_id);
        self.repository.query(&params).await
    }

    /// Every entry belonging to one workflow execution
    pub async fn workflow_audit_trail(
        &self,
        organization_id: &str,
        execution_id: &str,
    ) -> Result<Vec<AiAuditLog>> {
        let params = AuditQueryParams::for_organization(organization_id).with_execution(execution_id);
        self.repository.query(&params).await
    }

    /// Aggregate counts and means across matched entries
    ///
    /// Pure read-side computation; pagination in `params` is ignored so the
    /// statistics cover every match.
    pub async fn usage_statistics(&self, params: &AuditQueryParams) -> Result<UsageStatistics> {
        let mut unpaged = params.clone();
        unpaged.offset = None;
        unpaged.limit = None;
        let logs = self.repository.query(&unpaged).await?;

        let mut stats = UsageStatistics {
            total_events: logs.len() as u64,
            ..Default::default()
        };
        let mut confidence_sum = 0.0;
        let mut confidence_n = 0u64;
        let mut time_sum = 0u64;
        let mut time_n = 0u64;

        for log in &logs {
            *stats
                .events_by_type
                .entry(log.event_type.to_string())
                .or_insert(0) += 1;
            if let Some(assistant) = log.assistant_type {
                *stats
                    .events_by_assistant
                    .entry(assistant.to_string())
                    .or_insert(0) += 1;
            }
            if let Some(score) = log.confidence_score {
                confidence_sum += score;
                confidence_n += 1;
            }
            if let Some(ms) = log.processing_time_ms {
                time_sum += ms;
                time_n += 1;
            }
        }

        if confidence_n > 0 {
            stats.average_confidence = Some(confidence_sum / confidence_n as f64);
        }
        if time_n > 0 {
            stats.average_processing_time_ms = Some(time_sum as f64 / time_n as f64);
        }
        Ok(stats)
    }

    // ── Redaction helpers ───────────────────────────────────────────────────

    fn redacted_summary(&self, input: &Value) -> String {
        let serialized = input.to_string();
        self.redact_and_cap(&serialized)
    }

    fn redact_and_cap(&self, text: &str) -> String {
        let redacted = self.redactor.redact(text).redacted_text;
        if redacted.chars().count() <= SUMMARY_CAP {
            redacted
        } else {
            let truncated: String = redacted.chars().take(SUMMARY_CAP - 3).collect();
            format!("{truncated}...")
        }
    }
}

/// SHA-256 hex digest of the serialized suggestion list
fn hash_suggestions(suggestions: &[Suggestion]) -> Result<String> {
    let serialized = serde_json::to_string(suggestions).map_err(AuditError::Serialization)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
