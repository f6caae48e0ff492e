//! Assistant request/response model
//!
//! Every assistant adapter speaks the same contract: a typed
//! [`AssistantRequest`] in, an [`AssistantResponse`] of confidence-scored
//! [`Suggestion`]s out. Suggestions are immutable once produced; guardrails
//! may append warnings or filter the list but never rewrite content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// The five clinical assistant variants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantType {
    Documentation,
    Triage,
    Coding,
    MedicationSafety,
    PatientMessaging,
}

impl fmt::Display for AssistantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Documentation => "documentation",
            Self::Triage => "triage",
            Self::Coding => "coding",
            Self::MedicationSafety => "medication_safety",
            Self::PatientMessaging => "patient_messaging",
        };
        write!(f, "{s}")
    }
}

/// Five-level ordinal confidence bucket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// Map a raw model score into a bucket. Lower bounds are inclusive:
    /// 0.4 is Low, 0.6 Medium, 0.8 High, 0.9 VeryHigh.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::VeryHigh
        } else if score >= 0.8 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else if score >= 0.4 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        };
        write!(f, "{s}")
    }
}

/// One advisory suggestion produced by an assistant
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    /// Type tag, e.g. `soap_note`, `icd_code`, `safety_alert`
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
    pub confidence: ConfidenceLevel,
    pub confidence_score: f64,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub requires_approval: bool,
}

impl Suggestion {
    /// New suggestion with a generated id, deriving the confidence bucket
    /// from the score
    pub fn new(kind: impl Into<String>, content: Value, confidence_score: f64) -> Self {
        Self {
            id: format!("sug-{}", uuid::Uuid::new_v4()),
            kind: kind.into(),
            content,
            confidence: ConfidenceLevel::from_score(confidence_score),
            confidence_score,
            rationale: String::new(),
            warnings: Vec::new(),
            requires_approval: false,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn requiring_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }
}

/// Request handed to an assistant adapter
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub request_id: String,
    pub assistant_type: AssistantType,
    pub organization_id: String,
    pub tenant_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
    /// Typed input payload, shape depends on the assistant type
    pub input: Value,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, Value>,
    pub consent_verified: bool,
    pub timestamp: DateTime<Utc>,
}

impl AssistantRequest {
    /// Create a request with a generated request id
    pub fn new(
        assistant_type: AssistantType,
        organization_id: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            request_id: format!("req-{}", uuid::Uuid::new_v4()),
            assistant_type,
            organization_id: organization_id.into(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            patient_id: None,
            encounter_id: None,
            input,
            context: HashMap::new(),
            consent_verified: false,
            timestamp: Utc::now(),
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

    pub fn with_consent_verified(mut self) -> Self {
        self.consent_verified = true;
        self
    }
}

/// Provenance metadata attached to every response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model_version: String,
    pub prompt_template_id: String,
    pub processing_time_ms: u64,
    pub phi_minimized: bool,
}

/// Assistant output: an ordered list of suggestions plus review policy
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub request_id: String,
    pub assistant_type: AssistantType,
    pub suggestions: Vec<Suggestion>,
    pub metadata: ResponseMetadata,
    pub requires_human_review: bool,
    pub timestamp: DateTime<Utc>,
}

impl AssistantResponse {
    /// Mean confidence score across suggestions, if any
    pub fn average_confidence(&self) -> Option<f64> {
        if self.suggestions.is_empty() {
            return None;
        }
        let sum: f64 = self.suggestions.iter().map(|s| s.confidence_score).sum();
        Some(sum / self.suggestions.len() as f64)
    }
}
