//! Documentation assistant: drafts SOAP notes from encounter data

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use careflow_types::{
    AssistantRequest, AssistantResponse, AssistantType, DocumentationInput, ResponseMetadata,
    SoapNote, Suggestion,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Model draft: a structured note plus the model's confidence
#[derive(Clone, Debug)]
pub struct DocumentationDraft {
    pub note: SoapNote,
    pub confidence: f64,
}

/// Injected model interface for note drafting
#[async_trait]
pub trait DocumentationModel: Send + Sync {
    async fn draft_note(
        &self,
        input: &DocumentationInput,
        context: &HashMap<String, Value>,
    ) -> anyhow::Result<DocumentationDraft>;
}

/// Adapter turning model drafts into reviewed suggestions
///
/// Documentation drafts are always review-mandatory; a clinician signs
/// every note.
pub struct DocumentationAssistant {
    model: Arc<dyn DocumentationModel>,
    model_version: String,
}

impl DocumentationAssistant {
    pub fn new(model: Arc<dyn DocumentationModel>) -> Self {
        Self {
            model,
            model_version: "documentation-model-v1.0".into(),
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
        let input: DocumentationInput = serde_json::from_value(request.input.clone())
            .map_err(|e| AssistantError::InvalidInput {
                assistant_type: AssistantType::Documentation,
                reason: e.to_string(),
            })?;

        let draft = self
            .model
            .draft_note(&input, &request.context)
            .await
            .map_err(|source| AssistantError::Model {
                assistant_type: AssistantType::Documentation,
                source,
            })?;

        let content = serde_json::to_value(&draft.note).map_err(|source| {
            AssistantError::Encoding {
                assistant_type: AssistantType::Documentation,
                source,
            }
        })?;

        let mut warnings = vec![
            "Draft note requires clinician review and signature".to_string(),
            "Verify all clinical details against the encounter record".to_string(),
        ];
        if draft.confidence < 0.75 {
            warnings.push("Lower confidence draft; careful review recommended".to_string());
        }

        let suggestion = Suggestion::new("soap_note", content, draft.confidence)
            .with_rationale(format!(
                "Drafted from the {} encounter documentation",
                input.encounter_type
            ))
            .with_warnings(warnings)
            .requiring_approval();

        Ok(AssistantResponse {
            request_id: request.request_id.clone(),
            assistant_type: AssistantType::Documentation,
            suggestions: vec![suggestion],
            metadata: ResponseMetadata {
                model_version: self.model_version.clone(),
                prompt_template_id: "documentation-soap-v1".into(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                phi_minimized: true,
            },
            requires_human_review: true,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDocumentationModel;
    use careflow_types::ConfidenceLevel;
    use serde_json::json;

    fn assistant() -> DocumentationAssistant {
        DocumentationAssistant::new(Arc::new(MockDocumentationModel::new()))
    }

    fn request(input: Value) -> AssistantRequest {
        AssistantRequest::new(
            AssistantType::Documentation,
            "org-1",
            "tenant-1",
            "user-1",
            input,
        )
    }

    #[tokio::test]
    async fn test_always_requires_review() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "encounter_type": "office_visit",
                "chief_complaint": "persistent cough",
                "symptoms": ["cough", "fatigue"]
            })))
            .await
            .unwrap();

        assert!(response.requires_human_review);
        assert_eq!(response.suggestions.len(), 1);
        assert!(response.suggestions[0].requires_approval);
        assert_eq!(response.suggestions[0].kind, "soap_note");
    }

    #[tokio::test]
    async fn test_note_content_is_structured() {
        let response = assistant()
            .generate_suggestions(&request(json!({
                "encounter_type": "office_visit",
                "chief_complaint": "headache"
            })))
            .await
            .unwrap();

        let note: SoapNote =
            serde_json::from_value(response.suggestions[0].content.clone()).unwrap();
        assert!(note.has_content());
        assert!(note.subjective.contains("headache"));
        assert_eq!(
            response.suggestions[0].confidence,
            ConfidenceLevel::from_score(response.suggestions[0].confidence_score)
        );
    }

    #[tokio::test]
    async fn test_malformed_input_rejected() {
        let err = assistant()
            .generate_suggestions(&request(json!({"unexpected": true})))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::InvalidInput { .. }));
    }
}
