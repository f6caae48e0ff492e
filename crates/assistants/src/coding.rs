//! Coding assistant: ICD-10 and CPT code suggestions from encounter notes

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use careflow_types::{
    AssistantRequest, AssistantResponse, AssistantType, CodeSuggestion, CodeType, CodingInput,
    ResponseMetadata, Suggestion,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// A single code candidate with the model's confidence in it
#[derive(Clone, Debug)]
pub struct ScoredCode {
    pub code: CodeSuggestion,
    pub confidence: f64,
    pub rationale: String,
}

/// Model draft: the full candidate set for one encounter
#[derive(Clone, Debug)]
pub struct CodingDraft {
    pub codes: Vec<ScoredCode>,
}

/// Injected model interface for code extraction
#[async_trait]
pub trait CodingModel: Send + Sync {
    async fn suggest_codes(
        &self,
        input: &CodingInput,
        context: &HashMap<String, Value>,
    ) -> anyhow::Result<CodingDraft>;
}

/// Adapter producing one suggestion per candidate code
///
/// Every code suggestion is review-mandatory; a certified coder signs
/// off before billing.
pub struct CodingAssistant {
    model: Arc<dyn CodingModel>,
    model_version: String,
}

impl CodingAssistant {
    pub fn new(model: Arc<dyn CodingModel>) -> Self {
        Self {
            model,
            model_version: "coding-model-v1.0".into(),
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
        let input: CodingInput = serde_json::from_value(request.input.clone()).map_err(|e| {
            AssistantError::InvalidInput {
                assistant_type: AssistantType::Coding,
                reason: e.to_string(),
            }
        })?;

        let draft = self
            .model
            .suggest_codes(&input, &request.context)
            .await
            .map_err(|source| AssistantError::Model {
                assistant_type: AssistantType::Coding,
                source,
            })?;

        let mut suggestions = Vec::with_capacity(draft.codes.len());
        for scored in draft.codes {
            let kind = match scored.code.code_type {
                CodeType::Icd10 => "icd_code",
                CodeType::Cpt => "cpt_code",
            };
            let content = serde_json::to_value(&scored.code).map_err(|source| {
                AssistantError::Encoding {
                    assistant_type: AssistantType::Coding,
                    source,
                }
            })?;
            let mut warnings =
                vec!["Code requires certified coder review before billing".to_string()];
            if scored.confidence < 0.75 {
                warnings.push("Lower confidence code; verify against documentation".to_string());
            }
            suggestions.push(
                Suggestion::new(kind, content, scored.confidence)
                    .with_rationale(scored.rationale)
                    .with_warnings(warnings)
                    .requiring_approval(),
            );
        }

        tracing::info!(codes = suggestions.len(), "coding suggestions produced");

        Ok(AssistantResponse {
            request_id: request.request_id.clone(),
            assistant_type: AssistantType::Coding,
            suggestions,
            metadata: ResponseMetadata {
                model_version: self.model_version.clone(),
                prompt_template_id: "coding-extraction-v1".into(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                phi_minimized: true,
            },
            requires_human_review: true,
            timestamp: Utc::now(),
        })
    }
}
