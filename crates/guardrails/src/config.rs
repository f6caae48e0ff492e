//! Guardrail configuration

use crate::error::{GuardrailError, Result};
use careflow_types::AssistantType;
use std::collections::HashMap;

/// Tunable guardrail settings
#[derive(Clone, Debug)]
pub struct GuardrailConfig {
    /// Ceiling on the serialized input length, in characters
    pub max_input_length: usize,
    /// Whether string leaves are PHI-redacted during sanitization
    pub phi_minimization: bool,
    /// Per-assistant-type minimum confidence before a suggestion is flagged
    pub confidence_thresholds: HashMap<AssistantType, f64>,
}

impl GuardrailConfig {
    /// Confidence threshold for an assistant type
    pub fn confidence_threshold(&self, assistant_type: AssistantType) -> f64 {
        self.confidence_thresholds
            .get(&assistant_type)
            .copied()
            .unwrap_or(0.7)
    }

    /// Override a confidence threshold; must lie in [0, 1]
    pub fn set_confidence_threshold(
        &mut self,
        assistant_type: AssistantType,
        threshold: f64,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GuardrailError::InvalidConfig(format!(
                "confidence threshold {threshold} for {assistant_type} is outside [0, 1]"
            )));
        }
        self.confidence_thresholds.insert(assistant_type, threshold);
        Ok(())
    }
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        let confidence_thresholds = HashMap::from([
            (AssistantType::Documentation, 0.70),
            (AssistantType::Triage, 0.80),
            (AssistantType::Coding, 0.75),
            (AssistantType::MedicationSafety, 0.90),
            (AssistantType::PatientMessaging, 0.70),
        ]);
        Self {
            max_input_length: 50_000,
            phi_minimization: true,
            confidence_thresholds,
        }
    }
}
