//! Patient messaging assistant: drafts replies to patient portal messages

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use careflow_types::{
    AssistantRequest, AssistantResponse, AssistantType, MessageDraft, PatientMessageInput,
    ResponseMetadata, Suggestion,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Clinical urgency read from the inbound message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageUrgency {
    Emergent,
    Urgent,
    Routine,
}

impl fmt::Display for MessageUrgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Emergent => "emergent",
            Self::Urgent => "urgent",
            Self::Routine => "routine",
        };
        write!(f, "{s}")
    }
}

/// Model draft: a reply plus the detected urgency and confidence
#[derive(Clone, Debug)]
pub struct ScoredDraft {
    pub draft: MessageDraft,
    pub urgency: MessageUrgency,
    pub confidence: f64,
}

/// Injected model interface for reply drafting
#[async_trait]
pub trait PatientMessagingModel: Send + Sync {
    async fn draft_reply(
        &self,
        input: &PatientMessageInput,
        context: &HashMap<String, Value>,
    ) -> anyhow::Result<ScoredDraft>;
}

/// Adapter turning drafted replies into reviewed suggestions
///
/// Drafts are always review-mandatory; no message reaches a patient
/// without staff sign-off. Emergent or urgent messages additionally set
/// the escalation flag on the draft.
pub struct PatientMessagingAssistant {
    model: Arc<dyn PatientMessagingModel>,
    model_version: String,
}

impl PatientMessagingAssistant {
    pub fn new(model: Arc<dyn PatientMessagingModel>) -> Self {
        Self {
            model,
            model_version: "patient-messaging-model-v1.0".into(),
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
        let input: PatientMessageInput = serde_json::from_value(request.input.clone())
            .map_err(|e| AssistantError::InvalidInput {
                assistant_type: AssistantType::PatientMessaging,
                reason: e.to_string(),
            })?;

        let scored = self
            .model
            .draft_reply(&input, &request.context)
            .await
            .map_err(|source| AssistantError::Model {
                assistant_type: AssistantType::PatientMessaging,
                source,
            })?;

        let mut draft = scored.draft;
        if scored.urgency != MessageUrgency::Routine {
            draft.escalation_required = true;
        }

        let mut warnings =
            vec!["Draft reply requires staff review before sending".to_string()];
        match scored.urgency {
            MessageUrgency::Emergent => warnings.push(
                "Message suggests an emergency; direct the patient to emergency care".to_string(),
            ),
            MessageUrgency::Urgent => {
                warnings.push("Message needs a same-day clinical response".to_string())
            }
            MessageUrgency::Routine => {}
        }

        let content = serde_json::to_value(&draft).map_err(|source| {
            AssistantError::Encoding {
                assistant_type: AssistantType::PatientMessaging,
                source,
            }
        })?;

        let suggestion = Suggestion::new("message_draft", content, scored.confidence)
            .with_rationale(format!(
                "Reply drafted for a message assessed as {} urgency",
                scored.urgency
            ))
            .with_warnings(warnings)
            .requiring_approval();

        tracing::info!(
            urgency = %scored.urgency,
            escalation = draft.escalation_required,
            "patient message reply drafted"
        );

        Ok(AssistantResponse {
            request_id: request.request_id.clone(),
            assistant_type: AssistantType::PatientMessaging,
            suggestions: vec![suggestion],
            metadata: ResponseMetadata {
                model_version: self.model_version.clone(),
                prompt_template_id: "patient-messaging-reply-v1".into(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                phi_minimized: true,
            },
            requires_human_review: true,
            timestamp: Utc::now(),
        })
    }
}
