//! Typed payloads for the clinical assistants
//!
//! Assistant inputs and suggestion contents cross the adapter boundary as
//! `serde_json::Value`; these structs give them a checked shape on either
//! side of that boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Documentation ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentationInput {
    pub encounter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

/// Structured clinical note draft
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

impl SoapNote {
    /// A note is usable when at least one section has content
    pub fn has_content(&self) -> bool {
        !(self.subjective.trim().is_empty()
            && self.objective.trim().is_empty()
            && self.assessment.trim().is_empty()
            && self.plan.trim().is_empty())
    }
}

// ── Triage ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TriageVitals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_systolic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_diastolic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriageInput {
    pub chief_complaint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<TriageVitals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_history: Vec<String>,
}

/// Triage urgency, ordered most to least urgent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriagePriority {
    Critical,
    Urgent,
    SemiUrgent,
    NonUrgent,
}

impl fmt::Display for TriagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::Urgent => "urgent",
            Self::SemiUrgent => "semi_urgent",
            Self::NonUrgent => "non_urgent",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub priority: TriagePriority,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub red_flags: Vec<String>,
    pub recommended_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_minutes: Option<u32>,
}

// ── Coding ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodingInput {
    pub encounter_notes: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnoses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procedures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    Icd10,
    Cpt,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeSuggestion {
    pub code: String,
    pub description: String,
    pub category: String,
    pub code_type: CodeType,
}

// ── Medication safety ───────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicationOrder {
    pub name: String,
    pub dosage: String,
    pub route: String,
    pub frequency: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicationSafetyInput {
    pub proposed_medication: MedicationOrder,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub current_medications: Vec<MedicationOrder>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renal_function: Option<String>,
}

/// Drug interaction severity, ordered most to least severe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSeverity {
    Contraindicated,
    Major,
    Moderate,
    Minor,
}

impl InteractionSeverity {
    /// Whether this severity mandates human review
    pub fn blocks_autonomy(&self) -> bool {
        matches!(self, Self::Contraindicated | Self::Major)
    }
}

impl fmt::Display for InteractionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Contraindicated => "contraindicated",
            Self::Major => "major",
            Self::Moderate => "moderate",
            Self::Minor => "minor",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyAlertType {
    Interaction,
    Allergy,
    Contraindication,
    Dosing,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub alert_type: SafetyAlertType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<InteractionSeverity>,
    pub description: String,
    pub recommended_action: String,
}

impl SafetyAlert {
    /// Whether the alert forces human review on its own
    pub fn requires_review(&self) -> bool {
        match self.alert_type {
            SafetyAlertType::Allergy | SafetyAlertType::Contraindication => true,
            SafetyAlertType::Interaction => {
                self.severity.map(|s| s.blocks_autonomy()).unwrap_or(true)
            }
            SafetyAlertType::Dosing => false,
        }
    }
}

// ── Patient messaging ───────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatientMessageInput {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_history: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageDraft {
    pub body: String,
    pub tone: String,
    pub escalation_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_followup: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soap_note_content_detection() {
        let empty = SoapNote::default();
        assert!(!empty.has_content());

        let note = SoapNote {
            plan: "follow up in two weeks".into(),
            ..Default::default()
        };
        assert!(note.has_content());

        let whitespace = SoapNote {
            subjective: "   ".into(),
            ..Default::default()
        };
        assert!(!whitespace.has_content());
    }

    #[test]
    fn test_interaction_severity_review_policy() {
        assert!(InteractionSeverity::Contraindicated.blocks_autonomy());
        assert!(InteractionSeverity::Major.blocks_autonomy());
        assert!(!InteractionSeverity::Moderate.blocks_autonomy());
        assert!(!InteractionSeverity::Minor.blocks_autonomy());
    }

    #[test]
    fn test_safety_alert_review_policy() {
        let allergy = SafetyAlert {
            alert_type: SafetyAlertType::Allergy,
            severity: None,
            description: "penicillin allergy on file".into(),
            recommended_action: "select a non-beta-lactam".into(),
        };
        assert!(allergy.requires_review());

        let minor = SafetyAlert {
            alert_type: SafetyAlertType::Interaction,
            severity: Some(InteractionSeverity::Minor),
            description: String::new(),
            recommended_action: String::new(),
        };
        assert!(!minor.requires_review());

        // An interaction with unknown severity is treated conservatively
        let unknown = SafetyAlert {
            alert_type: SafetyAlertType::Interaction,
            severity: None,
            description: String::new(),
            recommended_action: String::new(),
        };
        assert!(unknown.requires_review());
    }

    #[test]
    fn test_payloads_round_trip_through_value() {
        let input = TriageInput {
            chief_complaint: "chest pain".into(),
            symptoms: vec!["shortness of breath".into()],
            vitals: Some(TriageVitals {
                oxygen_saturation: Some(85.0),
                ..Default::default()
            }),
            age: Some(67),
            medical_history: vec![],
        };
        let value = serde_json::to_value(&input).unwrap();
        let back: TriageInput = serde_json::from_value(value).unwrap();
        assert_eq!(back.chief_complaint, "chest pain");
        assert_eq!(back.vitals.unwrap().oxygen_saturation, Some(85.0));
    }
}
