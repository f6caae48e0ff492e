//! Triage assistant: urgency assessment from symptoms and vitals

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use careflow_types::{
    AssistantRequest, AssistantResponse, AssistantType, ResponseMetadata, Suggestion,
    TriageAssessment, TriageInput, TriagePriority,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Model draft: an assessment plus the model's confidence
#[derive(Clone, Debug)]
pub struct TriageDraft {
    pub assessment: TriageAssessment,
    pub confidence: f64,
}

/// Injected model interface for triage assessment
#[async_trait]
pub trait TriageModel: Send + Sync {
    async fn assess(
        &self,
        input: &TriageInput,
        context: &HashMap<String, Value>,
    ) -> anyhow::Result<TriageDraft>;
}

/// Adapter turning model assessments into suggestions
///
/// Review policy: mandatory only when the priority is critical or the
/// model surfaced red flags; routine assessments may flow unreviewed.
pub struct TriageAssistant {
    model: Arc<dyn TriageModel>,
    model_version: String,
}

impl TriageAssistant {
    pub fn new(model: Arc<dyn TriageModel>) -> Self {
        Self {
            model,
            model_version: "triage-model-v1.0".into(),
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
        let input: TriageInput = serde_json::from_value(request.input.clone()).map_err(|e| {
            AssistantError::InvalidInput {
                assistant_type: AssistantType::Triage,
                reason: e.to_string(),
            }
        })?;

        let draft = self
            .model
            .assess(&input, &request.context)
            .await
            .map_err(|source| AssistantError::Model {
                assistant_type: AssistantType::Triage,
                source,
            })?;

        let needs_review = draft.assessment.priority == TriagePriority::Critical
            || !draft.assessment.red_flags.is_empty();

        let mut warnings = Vec::new();
        if draft.assessment.priority == TriagePriority::Critical {
            warnings.push("Critical priority; immediate clinical evaluation required".to_string());
        }
        for flag in &draft.assessment.red_flags {
            warnings.push(format!("Red flag: {flag}"));
        }

        let content = serde_json::to_value(&draft.assessment).map_err(|source| {
            AssistantError::Encoding {
                assistant_type: AssistantType::Triage,
                source,
            }
        })?;

        let mut suggestion = Suggestion::new("triage_assessment", content, draft.confidence)
            .with_rationale(format!(
                "Assessed from chief complaint '{}' with {} documented symptom(s)",
                input.chief_complaint,
                input.symptoms.len()
            ))
            .with_warnings(warnings);
        if needs_review {
            suggestion = suggestion.requiring_approval();
        }

        tracing::info!(
            priority = %draft.assessment.priority,
            red_flags = draft.assessment.red_flags.len(),
            "triage assessment produced"
        );

        Ok(AssistantResponse {
            request_id: request.request_id.clone(),
            assistant_type: AssistantType::Triage,
            suggestions: vec![suggestion],
            metadata: ResponseMetadata {
                model_version: self.model_version.clone(),
                prompt_template_id: "triage-assessment-v1".into(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                phi_minimized: true,
            },
            requires_human_review: needs_review,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTriageModel;
    use serde_json::json;

    fn assistant() -> TriageAssistant {
        TriageAssistant::new(Arc::new(MockTriageModel::new()))
    }

    fn request(input: Value) -> AssistantRequest {
        AssistantRequest::new(AssistantType::Triage, "org-1", "tenant-1", "user-1", input)
    }

    #[tokio::test]
    async fn test_chest_pain_with_hypoxia_is_critical() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "chief_complaint": "chest pain",
                "vitals": { "oxygen_saturation": 85.0 }
            })))
            .await
            .unwrap();

        let assessment: TriageAssessment =
            serde_json::from_value(response.suggestions[0].content.clone()).unwrap();
        assert_eq!(assessment.priority, TriagePriority::Critical);
        assert!(response.requires_human_review);
        assert!(response.suggestions[0].requires_approval);
        assert!(!assessment.red_flags.is_empty());
    }

    #[tokio::test]
    async fn test_routine_complaint_skips_review() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "chief_complaint": "medication refill request"
            })))
            .await
            .unwrap();

        let assessment: TriageAssessment =
            serde_json::from_value(response.suggestions[0].content.clone()).unwrap();
        assert_eq!(assessment.priority, TriagePriority::NonUrgent);
        assert!(!response.requires_human_review);
        assert!(!response.suggestions[0].requires_approval);
    }

    #[tokio::test]
    async fn test_red_flags_force_review_even_below_critical() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "chief_complaint": "leg swelling",
                "vitals": { "heart_rate": 135.0 }
            })))
            .await
            .unwrap();
        // Tachycardia is a red flag regardless of the final priority bucket
        assert!(response.requires_human_review);
    }
}
