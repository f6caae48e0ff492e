//! Medication safety assistant: interaction, allergy, and dosing checks

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use careflow_types::{
    AssistantRequest, AssistantResponse, AssistantType, MedicationSafetyInput, ResponseMetadata,
    SafetyAlert, Suggestion,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// A single alert with the model's confidence in it
#[derive(Clone, Debug)]
pub struct ScoredAlert {
    pub alert: SafetyAlert,
    pub confidence: f64,
}

/// Model draft: the alert set for one proposed order
#[derive(Clone, Debug)]
pub struct SafetyDraft {
    pub alerts: Vec<ScoredAlert>,
}

/// Compact verdict for callers that only need a go/no-go signal
#[derive(Clone, Debug)]
pub struct SafetyQuickCheck {
    pub safe_to_proceed: bool,
    pub alert_count: usize,
    pub blocking_alerts: Vec<SafetyAlert>,
}

/// Injected model interface for safety screening
#[async_trait]
pub trait MedicationSafetyModel: Send + Sync {
    async fn screen(
        &self,
        input: &MedicationSafetyInput,
        context: &HashMap<String, Value>,
    ) -> anyhow::Result<SafetyDraft>;
}

/// Adapter producing one suggestion per safety alert
///
/// Review policy follows [`SafetyAlert::requires_review`]: allergy and
/// contraindication alerts always escalate, interactions escalate on
/// severe or unknown severity, dosing notes never do. A clean screen
/// produces an informational no-alert suggestion and skips review.
pub struct MedicationSafetyAssistant {
    model: Arc<dyn MedicationSafetyModel>,
    model_version: String,
}

impl MedicationSafetyAssistant {
    pub fn new(model: Arc<dyn MedicationSafetyModel>) -> Self {
        Self {
            model,
            model_version: "medication-safety-model-v1.0".into(),
        }
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    pub async fn generate_suggestions(
        &self,
        request: &AssistantRequest,
    ) -> Result<AssistantResponse> {
        let started = Instant::now();
        let input: MedicationSafetyInput = serde_json::from_value(request.input.clone())
            .map_err(|e| AssistantError::InvalidInput {
                assistant_type: AssistantType::MedicationSafety,
                reason: e.to_string(),
            })?;

        let draft = self
            .model
            .screen(&input, &request.context)
            .await
            .map_err(|source| AssistantError::Model {
                assistant_type: AssistantType::MedicationSafety,
                source,
            })?;

        let needs_review = draft.alerts.iter().any(|a| a.alert.requires_review());
        let mut suggestions = Vec::new();

        if draft.alerts.is_empty() {
            let content = serde_json::json!({
                "medication": input.proposed_medication.name,
                "alerts": [],
                "summary": "no safety concerns identified",
            });
            suggestions.push(
                Suggestion::new("safety_alert", content, 0.95).with_rationale(format!(
                    "Screened {} against {} current medication(s), {} allerg(ies), and {} condition(s)",
                    input.proposed_medication.name,
                    input.current_medications.len(),
                    input.allergies.len(),
                    input.conditions.len()
                )),
            );
        } else {
            for scored in draft.alerts {
                let escalates = scored.alert.requires_review();
                let content = serde_json::to_value(&scored.alert).map_err(|source| {
                    AssistantError::Encoding {
                        assistant_type: AssistantType::MedicationSafety,
                        source,
                    }
                })?;
                let mut warnings = Vec::new();
                if escalates {
                    warnings.push(
                        "Safety alert requires pharmacist or prescriber review".to_string(),
                    );
                }
                let mut suggestion = Suggestion::new("safety_alert", content, scored.confidence)
                    .with_rationale(scored.alert.description.clone())
                    .with_warnings(warnings);
                if escalates {
                    suggestion = suggestion.requiring_approval();
                }
                suggestions.push(suggestion);
            }
        }

        tracing::info!(
            medication = %input.proposed_medication.name,
            alerts = suggestions.len(),
            needs_review,
            "medication safety screen complete"
        );

        Ok(AssistantResponse {
            request_id: request.request_id.clone(),
            assistant_type: AssistantType::MedicationSafety,
            suggestions,
            metadata: ResponseMetadata {
                model_version: self.model_version.clone(),
                prompt_template_id: "medication-safety-v1".into(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                phi_minimized: true,
            },
            requires_human_review: needs_review,
            timestamp: Utc::now(),
        })
    }

    /// Screen an order and reduce the result to a go/no-go verdict
    pub async fn quick_check(&self, request: &AssistantRequest) -> Result<SafetyQuickCheck> {
        let response = self.generate_suggestions(request).await?;
        let mut blocking = Vec::new();
        let mut alert_count = 0;
        for suggestion in &response.suggestions {
            if let Ok(alert) = serde_json::from_value::<SafetyAlert>(suggestion.content.clone()) {
                alert_count += 1;
                if alert.requires_review() {
                    blocking.push(alert);
                }
            }
        }
        Ok(SafetyQuickCheck {
            safe_to_proceed: blocking.is_empty(),
            alert_count,
            blocking_alerts: blocking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockMedicationSafetyModel;
    use careflow_types::{InteractionSeverity, SafetyAlertType};
    use serde_json::json;

    fn assistant() -> MedicationSafetyAssistant {
        MedicationSafetyAssistant::new(Arc::new(MockMedicationSafetyModel::new()))
    }

    fn request(input: Value) -> AssistantRequest {
        AssistantRequest::new(
            AssistantType::MedicationSafety,
            "org-1",
            "tenant-1",
            "user-1",
            input,
        )
    }

    fn order(name: &str) -> Value {
        json!({ "name": name, "dosage": "10 mg", "route": "oral", "frequency": "daily" })
    }

    #[tokio::test]
    async fn test_major_interaction_forces_review() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "proposed_medication": order("warfarin"),
                "current_medications": [order("aspirin")]
            })))
            .await
            .unwrap();

        assert!(response.requires_human_review);
        let alert: SafetyAlert =
            serde_json::from_value(response.suggestions[0].content.clone()).unwrap();
        assert_eq!(alert.alert_type, SafetyAlertType::Interaction);
        assert_eq!(alert.severity, Some(InteractionSeverity::Major));
    }

    #[tokio::test]
    async fn test_allergy_cross_sensitivity_detected() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "proposed_medication": order("amoxicillin"),
                "allergies": ["penicillin"]
            })))
            .await
            .unwrap();

        assert!(response.requires_human_review);
        let kinds: Vec<SafetyAlertType> = response
            .suggestions
            .iter()
            .map(|s| {
                serde_json::from_value::<SafetyAlert>(s.content.clone())
                    .unwrap()
                    .alert_type
            })
            .collect();
        assert!(kinds.contains(&SafetyAlertType::Allergy));
    }

    #[tokio::test]
    async fn test_clean_screen_skips_review() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "proposed_medication": order("acetaminophen")
            })))
            .await
            .unwrap();

        assert!(!response.requires_human_review);
        assert_eq!(response.suggestions.len(), 1);
        assert!(!response.suggestions[0].requires_approval);
    }

    #[tokio::test]
    async fn test_nsaid_contraindicated_with_bleeding_disorder() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "proposed_medication": order("aspirin"),
                "conditions": ["bleeding disorder"]
            })))
            .await
            .unwrap();

        assert!(response.requires_human_review);
        let alert: SafetyAlert =
            serde_json::from_value(response.suggestions[0].content.clone()).unwrap();
        assert_eq!(alert.alert_type, SafetyAlertType::Contraindication);
        assert!(response.suggestions[0].requires_approval);
    }

    #[tokio::test]
    async fn test_quick_check_blocks_on_contraindication() {
        let check = assistant()
            .quick_check(&request(json!({
                "proposed_medication": order("metformin"),
                "renal_function": "severely impaired"
            })))
            .await
            .unwrap();

        assert!(!check.safe_to_proceed);
        assert!(!check.blocking_alerts.is_empty());
    }

    #[tokio::test]
    async fn test_dosing_note_alone_does_not_block() {
        let check = assistant()
            .quick_check(&request(json!({
                "proposed_medication": order("acetaminophen"),
                "age": 82
            })))
            .await
            .unwrap();

        assert!(check.safe_to_proceed);
        assert_eq!(check.alert_count, 1);
    }
}
