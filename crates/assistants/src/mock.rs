//! Deterministic mock models for tests and demos
//!
//! Each mock implements its model trait with fixed keyword tables and
//! fixed confidences. No randomness and no clocks; the same input always
//! produces the same draft.

use crate::coding::{CodingDraft, CodingModel, ScoredCode};
use crate::documentation::{DocumentationDraft, DocumentationModel};
use crate::medication_safety::{MedicationSafetyModel, SafetyDraft, ScoredAlert};
use crate::patient_messaging::{MessageUrgency, PatientMessagingModel, ScoredDraft};
use crate::triage::{TriageDraft, TriageModel};
use async_trait::async_trait;
use careflow_types::{
    CodeSuggestion, CodeType, CodingInput, DocumentationInput, InteractionSeverity, MessageDraft,
    MedicationSafetyInput, PatientMessageInput, SafetyAlert, SafetyAlertType, SoapNote,
    TriageAssessment, TriageInput, TriagePriority,
};
use serde_json::Value;
use std::collections::HashMap;

// ── Documentation ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default)]
pub struct MockDocumentationModel;

impl MockDocumentationModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentationModel for MockDocumentationModel {
    async fn draft_note(
        &self,
        input: &DocumentationInput,
        _context: &HashMap<String, Value>,
    ) -> anyhow::Result<DocumentationDraft> {
        let complaint = input
            .chief_complaint
            .clone()
            .unwrap_or_else(|| "unspecified concern".to_string());
        let symptoms = if input.symptoms.is_empty() {
            "no additional symptoms reported".to_string()
        } else {
            format!("reports {}", input.symptoms.join(", "))
        };
        let note = SoapNote {
            subjective: format!("Patient presents with {complaint}; {symptoms}."),
            objective: format!(
                "Seen for a {} encounter. Examination findings documented in chart.",
                input.encounter_type
            ),
            assessment: format!("Clinical picture consistent with {complaint}."),
            plan: "Supportive care discussed. Follow up if symptoms persist or worsen.".to_string(),
        };
        Ok(DocumentationDraft {
            note,
            confidence: 0.82,
        })
    }
}

// ── Triage ──────────────────────────────────────────────────────────────────

const EMERGENT_COMPLAINTS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "difficulty breathing",
    "severe bleeding",
    "unresponsive",
    "stroke",
    "facial droop",
    "anaphylaxis",
];

const URGENT_COMPLAINTS: &[&str] = &[
    "high fever",
    "severe pain",
    "head injury",
    "persistent vomiting",
    "dehydration",
];

#[derive(Clone, Copy, Debug, Default)]
pub struct MockTriageModel;

impl MockTriageModel {
    pub fn new() -> Self {
        Self
    }

    fn vital_red_flags(input: &TriageInput) -> Vec<String> {
        let mut flags = Vec::new();
        let Some(vitals) = input.vitals else {
            return flags;
        };
        if let Some(spo2) = vitals.oxygen_saturation {
            if spo2 < 90.0 {
                flags.push(format!("oxygen saturation {spo2}% (hypoxia)"));
            }
        }
        if let Some(hr) = vitals.heart_rate {
            if hr > 120.0 {
                flags.push(format!("heart rate {hr} bpm (tachycardia)"));
            } else if hr < 40.0 {
                flags.push(format!("heart rate {hr} bpm (bradycardia)"));
            }
        }
        if let Some(temp) = vitals.temperature {
            if temp > 104.0 {
                flags.push(format!("temperature {temp}F (hyperpyrexia)"));
            }
        }
        if let Some(sys) = vitals.blood_pressure_systolic {
            if sys > 180.0 {
                flags.push(format!("systolic pressure {sys} mmHg (hypertensive crisis)"));
            } else if sys < 90.0 {
                flags.push(format!("systolic pressure {sys} mmHg (hypotension)"));
            }
        }
        if let Some(rr) = vitals.respiratory_rate {
            if rr > 30.0 {
                flags.push(format!("respiratory rate {rr}/min (tachypnea)"));
            }
        }
        flags
    }
}

#[async_trait]
impl TriageModel for MockTriageModel {
    async fn assess(
        &self,
        input: &TriageInput,
        _context: &HashMap<String, Value>,
    ) -> anyhow::Result<TriageDraft> {
        let text = format!(
            "{} {}",
            input.chief_complaint.to_lowercase(),
            input.symptoms.join(" ").to_lowercase()
        );
        let mut red_flags: Vec<String> = EMERGENT_COMPLAINTS
            .iter()
            .filter(|phrase| text.contains(*phrase))
            .map(|phrase| format!("complaint mentions {phrase}"))
            .collect();
        let emergent_complaint = !red_flags.is_empty();
        red_flags.extend(Self::vital_red_flags(input));

        let urgent_complaint = URGENT_COMPLAINTS.iter().any(|p| text.contains(p));

        let (priority, action, wait, confidence) = if emergent_complaint {
            (
                TriagePriority::Critical,
                "Immediate clinical evaluation; activate emergency response if needed",
                0,
                0.92,
            )
        } else if !red_flags.is_empty() || urgent_complaint {
            (
                TriagePriority::Urgent,
                "Clinician evaluation within 30 minutes",
                30,
                0.85,
            )
        } else if input.symptoms.len() >= 3 {
            (
                TriagePriority::SemiUrgent,
                "Clinician evaluation within 2 hours",
                120,
                0.80,
            )
        } else {
            (
                TriagePriority::NonUrgent,
                "Routine scheduling or nurse callback",
                240,
                0.85,
            )
        };

        Ok(TriageDraft {
            assessment: TriageAssessment {
                priority,
                red_flags,
                recommended_action: action.to_string(),
                estimated_wait_minutes: Some(wait),
            },
            confidence,
        })
    }
}

// ── Coding ──────────────────────────────────────────────────────────────────

const ICD_TABLE: &[(&str, &str, &str, f64)] = &[
    ("hypertension", "I10", "Essential (primary) hypertension", 0.9),
    ("diabetes", "E11.9", "Type 2 diabetes mellitus without complications", 0.9),
    ("upper respiratory", "J06.9", "Acute upper respiratory infection, unspecified", 0.85),
    ("headache", "R51.9", "Headache, unspecified", 0.85),
    ("back pain", "M54.5", "Low back pain", 0.85),
];

const CPT_TABLE: &[(&str, &str, &str, f64)] = &[
    ("office visit", "99213", "Office or other outpatient visit, established patient", 0.85),
    ("new patient", "99203", "Office or other outpatient visit, new patient", 0.85),
    ("cbc", "85025", "Complete blood count with differential", 0.9),
    ("ekg", "93000", "Electrocardiogram, complete", 0.9),
    ("x-ray", "71046", "Radiologic examination, chest, 2 views", 0.85),
];

#[derive(Clone, Copy, Debug, Default)]
pub struct MockCodingModel;

impl MockCodingModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CodingModel for MockCodingModel {
    async fn suggest_codes(
        &self,
        input: &CodingInput,
        _context: &HashMap<String, Value>,
    ) -> anyhow::Result<CodingDraft> {
        let mut codes = Vec::new();

        let mut matched_diagnosis = false;
        for diagnosis in &input.diagnoses {
            let lowered = diagnosis.to_lowercase();
            for (keyword, code, description, confidence) in ICD_TABLE {
                if lowered.contains(keyword) {
                    matched_diagnosis = true;
                    codes.push(ScoredCode {
                        code: CodeSuggestion {
                            code: (*code).to_string(),
                            description: (*description).to_string(),
                            category: "diagnosis".to_string(),
                            code_type: CodeType::Icd10,
                        },
                        confidence: *confidence,
                        rationale: format!("Documented diagnosis '{diagnosis}' matches {code}"),
                    });
                }
            }
        }
        if !matched_diagnosis {
            codes.push(ScoredCode {
                code: CodeSuggestion {
                    code: "Z00.00".to_string(),
                    description: "Encounter for general adult medical examination".to_string(),
                    category: "diagnosis".to_string(),
                    code_type: CodeType::Icd10,
                },
                confidence: 0.6,
                rationale: "No documented diagnosis matched; general examination code".to_string(),
            });
        }

        for procedure in &input.procedures {
            let lowered = procedure.to_lowercase();
            let mut matched = false;
            for (keyword, code, description, confidence) in CPT_TABLE {
                if lowered.contains(keyword) {
                    matched = true;
                    codes.push(ScoredCode {
                        code: CodeSuggestion {
                            code: (*code).to_string(),
                            description: (*description).to_string(),
                            category: "procedure".to_string(),
                            code_type: CodeType::Cpt,
                        },
                        confidence: *confidence,
                        rationale: format!("Documented procedure '{procedure}' matches {code}"),
                    });
                }
            }
            if !matched {
                codes.push(ScoredCode {
                    code: CodeSuggestion {
                        code: "99213".to_string(),
                        description: "Office or other outpatient visit, established patient"
                            .to_string(),
                        category: "procedure".to_string(),
                        code_type: CodeType::Cpt,
                    },
                    confidence: 0.65,
                    rationale: format!(
                        "Procedure '{procedure}' not recognized; default evaluation code"
                    ),
                });
            }
        }

        Ok(CodingDraft { codes })
    }
}

// ── Medication safety ───────────────────────────────────────────────────────

const INTERACTION_TABLE: &[(&str, &str, InteractionSeverity, &str)] = &[
    (
        "warfarin",
        "aspirin",
        InteractionSeverity::Major,
        "Combined anticoagulant and antiplatelet therapy raises bleeding risk",
    ),
    (
        "lisinopril",
        "spironolactone",
        InteractionSeverity::Major,
        "ACE inhibitor with potassium-sparing diuretic risks hyperkalemia",
    ),
    (
        "metformin",
        "ibuprofen",
        InteractionSeverity::Moderate,
        "NSAID use may reduce renal clearance of metformin",
    ),
];

const PENICILLIN_CLASS: &[&str] = &["penicillin", "amoxicillin", "ampicillin"];
const NSAID_CLASS: &[&str] = &["aspirin", "ibuprofen", "naproxen"];

#[derive(Clone, Copy, Debug, Default)]
pub struct MockMedicationSafetyModel;

impl MockMedicationSafetyModel {
    pub fn new() -> Self {
        Self
    }

    fn same_class(a: &str, b: &str) -> bool {
        let in_class = |class: &[&str]| {
            class.iter().any(|m| a.contains(m)) && class.iter().any(|m| b.contains(m))
        };
        in_class(PENICILLIN_CLASS) || in_class(NSAID_CLASS)
    }
}

#[async_trait]
impl MedicationSafetyModel for MockMedicationSafetyModel {
    async fn screen(
        &self,
        input: &MedicationSafetyInput,
        _context: &HashMap<String, Value>,
    ) -> anyhow::Result<SafetyDraft> {
        let proposed = input.proposed_medication.name.to_lowercase();
        let mut alerts = Vec::new();

        for current in &input.current_medications {
            let existing = current.name.to_lowercase();
            for (a, b, severity, description) in INTERACTION_TABLE {
                let hit = (proposed.contains(a) && existing.contains(b))
                    || (proposed.contains(b) && existing.contains(a));
                if hit {
                    alerts.push(ScoredAlert {
                        alert: SafetyAlert {
                            alert_type: SafetyAlertType::Interaction,
                            severity: Some(*severity),
                            description: format!(
                                "{} with {}: {}",
                                input.proposed_medication.name, current.name, description
                            ),
                            recommended_action: "Review the combination with the prescriber"
                                .to_string(),
                        },
                        confidence: 0.93,
                    });
                }
            }
        }

        for allergy in &input.allergies {
            let allergen = allergy.to_lowercase();
            if proposed.contains(&allergen) || Self::same_class(&proposed, &allergen) {
                alerts.push(ScoredAlert {
                    alert: SafetyAlert {
                        alert_type: SafetyAlertType::Allergy,
                        severity: None,
                        description: format!(
                            "Documented {allergy} allergy; {} carries cross-sensitivity risk",
                            input.proposed_medication.name
                        ),
                        recommended_action: "Select an alternative agent outside the allergen class"
                            .to_string(),
                    },
                    confidence: 0.95,
                });
            }
        }

        let bleeding_condition = input
            .conditions
            .iter()
            .any(|c| c.to_lowercase().contains("bleeding"));
        if bleeding_condition && NSAID_CLASS.iter().any(|m| proposed.contains(m)) {
            alerts.push(ScoredAlert {
                alert: SafetyAlert {
                    alert_type: SafetyAlertType::Contraindication,
                    severity: Some(InteractionSeverity::Contraindicated),
                    description: format!(
                        "{} is contraindicated with an active bleeding disorder",
                        input.proposed_medication.name
                    ),
                    recommended_action: "Do not dispense; escalate to the prescriber".to_string(),
                },
                confidence: 0.95,
            });
        }
        if proposed.contains("metformin") {
            if let Some(renal) = &input.renal_function {
                if renal.to_lowercase().contains("impaired") {
                    alerts.push(ScoredAlert {
                        alert: SafetyAlert {
                            alert_type: SafetyAlertType::Contraindication,
                            severity: Some(InteractionSeverity::Contraindicated),
                            description: format!(
                                "Metformin is contraindicated with {renal} renal function"
                            ),
                            recommended_action: "Hold the order pending renal dosing review"
                                .to_string(),
                        },
                        confidence: 0.95,
                    });
                }
            }
        }

        if input.age.map(|a| a >= 65).unwrap_or(false) {
            alerts.push(ScoredAlert {
                alert: SafetyAlert {
                    alert_type: SafetyAlertType::Dosing,
                    severity: None,
                    description: "Patient is 65 or older; consider geriatric dose adjustment"
                        .to_string(),
                    recommended_action: "Verify the dose against geriatric guidance".to_string(),
                },
                confidence: 0.85,
            });
        }
        if input.weight_kg.map(|w| w < 50.0).unwrap_or(false) {
            alerts.push(ScoredAlert {
                alert: SafetyAlert {
                    alert_type: SafetyAlertType::Dosing,
                    severity: None,
                    description: "Low body weight; weight-based dosing review advised".to_string(),
                    recommended_action: "Recalculate the dose for the documented weight"
                        .to_string(),
                },
                confidence: 0.85,
            });
        }

        Ok(SafetyDraft { alerts })
    }
}

// ── Patient messaging ───────────────────────────────────────────────────────

const EMERGENT_PHRASES: &[&str] = &[
    "chest pain",
    "trouble breathing",
    "difficulty breathing",
    "severe bleeding",
    "suicid",
    "unconscious",
    "stroke",
];

const URGENT_PHRASES: &[&str] = &[
    "high fever",
    "severe pain",
    "getting worse",
    "worsening",
    "reaction to",
    "allergic reaction",
];

#[derive(Clone, Copy, Debug, Default)]
pub struct MockPatientMessagingModel;

impl MockPatientMessagingModel {
    pub fn new() -> Self {
        Self
    }

    fn classify(text: &str) -> MessageUrgency {
        let lowered = text.to_lowercase();
        if EMERGENT_PHRASES.iter().any(|p| lowered.contains(p)) {
            MessageUrgency::Emergent
        } else if URGENT_PHRASES.iter().any(|p| lowered.contains(p)) {
            MessageUrgency::Urgent
        } else {
            MessageUrgency::Routine
        }
    }
}

#[async_trait]
impl PatientMessagingModel for MockPatientMessagingModel {
    async fn draft_reply(
        &self,
        input: &PatientMessageInput,
        _context: &HashMap<String, Value>,
    ) -> anyhow::Result<ScoredDraft> {
        let urgency = Self::classify(&input.message);
        let (body, followup, confidence) = match urgency {
            MessageUrgency::Emergent => (
                "Thank you for reaching out. Based on what you describe, please seek \
                 emergency care right away or call emergency services. Our team has been \
                 notified and will follow up with you."
                    .to_string(),
                Some("Flag for immediate clinical callback".to_string()),
                0.9,
            ),
            MessageUrgency::Urgent => (
                "Thank you for letting us know. Your message needs prompt clinical \
                 attention, and a member of our care team will contact you today. If your \
                 symptoms worsen, please seek urgent care."
                    .to_string(),
                Some("Schedule a same-day clinical callback".to_string()),
                0.82,
            ),
            MessageUrgency::Routine => (
                "Thank you for your message. Our team has received your request and will \
                 respond within one business day. Please let us know if anything changes \
                 in the meantime."
                    .to_string(),
                None,
                0.78,
            ),
        };

        Ok(ScoredDraft {
            draft: MessageDraft {
                body,
                tone: "empathetic_professional".to_string(),
                escalation_required: urgency != MessageUrgency::Routine,
                suggested_followup: followup,
            },
            urgency,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_triage_vitals_thresholds() {
        let model = MockTriageModel::new();
        let input: TriageInput = serde_json::from_value(serde_json::json!({
            "chief_complaint": "dizziness",
            "vitals": { "blood_pressure_systolic": 200.0 }
        }))
        .unwrap();
        let draft = model.assess(&input, &HashMap::new()).await.unwrap();
        assert_eq!(draft.assessment.priority, TriagePriority::Urgent);
        assert_eq!(draft.assessment.red_flags.len(), 1);
    }

    #[tokio::test]
    async fn test_coding_matches_are_case_insensitive() {
        let model = MockCodingModel::new();
        let input: CodingInput = serde_json::from_value(serde_json::json!({
            "encounter_notes": "",
            "diagnoses": ["Essential Hypertension"],
            "procedures": ["EKG"]
        }))
        .unwrap();
        let draft = model.suggest_codes(&input, &HashMap::new()).await.unwrap();
        let codes: Vec<&str> = draft.codes.iter().map(|c| c.code.code.as_str()).collect();
        assert!(codes.contains(&"I10"));
        assert!(codes.contains(&"93000"));
    }

    #[tokio::test]
    async fn test_interaction_table_is_symmetric() {
        let model = MockMedicationSafetyModel::new();
        let forward: MedicationSafetyInput = serde_json::from_value(serde_json::json!({
            "proposed_medication": { "name": "aspirin", "dosage": "81 mg", "route": "oral", "frequency": "daily" },
            "current_medications": [{ "name": "warfarin", "dosage": "5 mg", "route": "oral", "frequency": "daily" }]
        }))
        .unwrap();
        let draft = model.screen(&forward, &HashMap::new()).await.unwrap();
        assert_eq!(draft.alerts.len(), 1);
        assert_eq!(
            draft.alerts[0].alert.severity,
            Some(InteractionSeverity::Major)
        );
    }

    #[tokio::test]
    async fn test_message_classification() {
        assert_eq!(
            MockPatientMessagingModel::classify("I have chest pain"),
            MessageUrgency::Emergent
        );
        assert_eq!(
            MockPatientMessagingModel::classify("my rash is getting worse"),
            MessageUrgency::Urgent
        );
        assert_eq!(
            MockPatientMessagingModel::classify("requesting records"),
            MessageUrgency::Routine
        );
    }
}
