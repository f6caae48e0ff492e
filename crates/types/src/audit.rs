//! Audit log entries and query parameters
//!
//! Entries are immutable once saved and never carry raw assistant input or
//! output. Input appears only as a redacted, length-capped summary; output
//! only as a cryptographic digest.

use crate::assistant::AssistantType;
use crate::guardrail::GuardrailViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// The events the audit trail records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AiRequest,
    AiResponse,
    HumanReview,
    Approval,
    Rejection,
    GuardrailViolation,
    ConsentCheck,
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AiRequest => "ai_request",
            Self::AiResponse => "ai_response",
            Self::HumanReview => "human_review",
            Self::Approval => "approval",
            Self::Rejection => "rejection",
            Self::GuardrailViolation => "guardrail_violation",
            Self::ConsentCheck => "consent_check",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a human review
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
    Pending,
}

/// One immutable audit entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiAuditLog {
    pub id: String,
    pub event_type: AuditEventType,
    pub organization_id: String,
    pub tenant_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_type: Option<AssistantType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_id: Option<String>,
    /// PHI-scrubbed, length-capped description of the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_summary: Option<String>,
    /// SHA-256 hex digest of the serialized output, never the output itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    pub consent_verified: bool,
    pub guardrails_passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<GuardrailViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl AiAuditLog {
    /// Blank entry of a given type; the logger fills in the rest
    pub fn new(
        event_type: AuditEventType,
        organization_id: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("audit-{}", uuid::Uuid::new_v4()),
            event_type,
            organization_id: organization_id.into(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            patient_id: None,
            encounter_id: None,
            workflow_execution_id: None,
            assistant_type: None,
            model_version: None,
            prompt_template_id: None,
            input_summary: None,
            output_hash: None,
            confidence_score: None,
            approval_status: None,
            consent_verified: false,
            guardrails_passed: true,
            violations: Vec::new(),
            processing_time_ms: None,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// Read-side filter over the audit trail
///
/// `organization_id` is mandatory; every other field narrows the match.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditQueryParams {
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_type: Option<AssistantType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<AuditEventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl AuditQueryParams {
    pub fn for_organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            ..Default::default()
        }
    }

    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn with_execution(mut self, execution_id: impl Into<String>) -> Self {
        self.workflow_execution_id = Some(execution_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_assistant_type(mut self, assistant_type: AssistantType) -> Self {
        self.assistant_type = Some(assistant_type);
        self
    }

    pub fn with_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// Whether a log entry satisfies every set filter (pagination aside)
    pub fn matches(&self, log: &AiAuditLog) -> bool {
        if log.organization_id != self.organization_id {
            return false;
        }
        if let Some(tenant) = &self.tenant_id {
            if &log.tenant_id != tenant {
                return false;
            }
        }
        if let Some(user) = &self.user_id {
            if &log.user_id != user {
                return false;
            }
        }
        if let Some(patient) = &self.patient_id {
            if log.patient_id.as_deref() != Some(patient.as_str()) {
                return false;
            }
        }
        if let Some(execution) = &self.workflow_execution_id {
            if log.workflow_execution_id.as_deref() != Some(execution.as_str()) {
                return false;
            }
        }
        if let Some(assistant) = self.assistant_type {
            if log.assistant_type != Some(assistant) {
                return false;
            }
        }
        if let Some(event) = self.event_type {
            if log.event_type != event {
                return false;
            }
        }
        if let Some(from) = self.from {
            if log.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if log.timestamp > to {
                return false;
            }
        }
        true
    }
}

/// Aggregated usage numbers computed from matched audit entries
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UsageStatistics {
    pub total_events: u64,
    pub events_by_type: HashMap<String, u64>,
    pub events_by_assistant: HashMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_processing_time_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log(org: &str, event: AuditEventType) -> AiAuditLog {
        AiAuditLog::new(event, org, "tenant-1", "user-1")
    }

    #[test]
    fn test_matches_requires_organization() {
        let params = AuditQueryParams::for_organization("org-1");
        assert!(params.matches(&make_log("org-1", AuditEventType::AiRequest)));
        assert!(!params.matches(&make_log("org-2", AuditEventType::AiRequest)));
    }

    #[test]
    fn test_matches_event_and_assistant_filters() {
        let params = AuditQueryParams::for_organization("org-1")
            .with_event_type(AuditEventType::AiResponse)
            .with_assistant_type(AssistantType::Triage);

        let mut log = make_log("org-1", AuditEventType::AiResponse);
        assert!(!params.matches(&log));

        log.assistant_type = Some(AssistantType::Triage);
        assert!(params.matches(&log));

        log.event_type = AuditEventType::AiRequest;
        assert!(!params.matches(&log));
    }

    #[test]
    fn test_matches_date_range() {
        let now = Utc::now();
        let params = AuditQueryParams::for_organization("org-1")
            .with_range(now - chrono::Duration::hours(1), now + chrono::Duration::hours(1));

        let mut log = make_log("org-1", AuditEventType::ConsentCheck);
        assert!(params.matches(&log));

        log.timestamp = now - chrono::Duration::hours(2);
        assert!(!params.matches(&log));
    }

    #[test]
    fn test_matches_patient_filter() {
        let params = AuditQueryParams::for_organization("org-1").with_patient("patient-9");

        let mut log = make_log("org-1", AuditEventType::AiRequest);
        assert!(!params.matches(&log));

        log.patient_id = Some("patient-9".into());
        assert!(params.matches(&log));
    }
}
