//! Output guardrail
//!
//! Checks every assistant response for structural and safety requirements
//! before it reaches a human or a downstream workflow step, and computes
//! the final human-review decision. Suggestions are never rewritten; the
//! guardrail only filters the list or appends warnings.

use crate::config::GuardrailConfig;
use crate::error::{GuardrailError, Result};
use crate::rules::{Rule, RuleRegistry};
use careflow_types::{
    AssistantResponse, AssistantType, GuardrailResult, GuardrailViolation, Suggestion,
};
use regex::Regex;
use serde_json::Value;

/// Phrases an assistant response must never contain
const HARMFUL_PHRASES: &[&str] = &[
    "kill yourself",
    "end your life",
    "harm yourself",
    "you should die",
    "how to overdose",
];

/// Autonomous diagnostic phrasing; suggestions must stay advisory
const DIAGNOSTIC_CLAIMS: &[&str] = &[
    "you have",
    "i diagnose",
    "you are diagnosed with",
    "you definitely have",
];

/// Direct medical advice phrasing forbidden in patient message drafts
const MEDICAL_ADVICE_PHRASES: &[&str] = &[
    "you should take",
    "stop taking your",
    "increase your dose",
    "decrease your dose",
    "no need to see a doctor",
];

/// Dismissive phrasing that warrants a tone warning in patient messages
const DISMISSIVE_PHRASES: &[&str] = &["calm down", "don't worry", "it's nothing", "just relax"];

const TRIAGE_PRIORITIES: &[&str] = &["critical", "urgent", "semi_urgent", "non_urgent"];

/// Validates and enhances assistant responses
pub struct OutputGuardrail {
    registry: RuleRegistry<AssistantResponse>,
    config: GuardrailConfig,
}

impl OutputGuardrail {
    pub fn new(config: GuardrailConfig) -> Self {
        let mut registry = RuleRegistry::new();
        Self::register_universal_rules(&mut registry);
        Self::register_type_rules(&mut registry);
        Self { registry, config }
    }

    fn register_universal_rules(registry: &mut RuleRegistry<AssistantResponse>) {
        registry.add_universal(Rule::error(
            "has_suggestions",
            "response contains no suggestions",
            |response: &AssistantResponse| Ok(!response.suggestions.is_empty()),
        ));

        registry.add_universal(Rule::error(
            "valid_confidence_scores",
            "a suggestion confidence score lies outside [0, 1]",
            |response: &AssistantResponse| {
                Ok(response
                    .suggestions
                    .iter()
                    .all(|s| (0.0..=1.0).contains(&s.confidence_score)))
            },
        ));

        registry.add_universal(Rule::error(
            "no_harmful_content",
            "response contains harmful content",
            |response: &AssistantResponse| {
                let text = serialized_content(response)?;
                Ok(!HARMFUL_PHRASES.iter().any(|p| text.contains(p)))
            },
        ));

        registry.add_universal(Rule::error(
            "no_diagnostic_claims",
            "response phrases a diagnosis as fact rather than a suggestion",
            |response: &AssistantResponse| {
                let text = serialized_content(response)?;
                Ok(!DIAGNOSTIC_CLAIMS.iter().any(|p| text.contains(p)))
            },
        ));

        registry.add_universal(Rule::error(
            "valid_metadata",
            "response metadata is missing model or prompt identification",
            |response: &AssistantResponse| {
                Ok(!response.metadata.model_version.trim().is_empty()
                    && !response.metadata.prompt_template_id.trim().is_empty())
            },
        ));
    }

    fn register_type_rules(registry: &mut RuleRegistry<AssistantResponse>) {
        registry.add_for(
            AssistantType::Documentation,
            Rule::error(
                "valid_soap_structure",
                "a SOAP note suggestion has no populated section",
                |response: &AssistantResponse| {
                    Ok(suggestions_of_kind(response, "soap_note").all(|s| {
                        ["subjective", "objective", "assessment", "plan"]
                            .iter()
                            .any(|section| non_empty_field(&s.content, section))
                    }))
                },
            ),
        );

        registry.add_for(
            AssistantType::Triage,
            Rule::error(
                "valid_triage_priority",
                "triage priority is not a recognized value",
                |response: &AssistantResponse| {
                    Ok(suggestions_of_kind(response, "triage_assessment").all(|s| {
                        s.content
                            .get("priority")
                            .and_then(|p| p.as_str())
                            .map(|p| TRIAGE_PRIORITIES.contains(&p))
                            .unwrap_or(false)
                    }))
                },
            ),
        );
        registry.add_for(
            AssistantType::Triage,
            Rule::error(
                "critical_requires_immediate_review",
                "a critical triage assessment must require human review",
                |response: &AssistantResponse| {
                    let any_critical = response.suggestions.iter().any(|s| {
                        s.content.get("priority").and_then(|p| p.as_str()) == Some("critical")
                    });
                    Ok(!any_critical || response.requires_human_review)
                },
            ),
        );

        registry.add_for(
            AssistantType::MedicationSafety,
            Rule::error(
                "contraindication_requires_review",
                "a contraindicated medication must require human review",
                |response: &AssistantResponse| {
                    let any_contraindicated = response.suggestions.iter().any(|s| {
                        s.content.get("alert_type").and_then(|v| v.as_str())
                            == Some("contraindication")
                            || s.content.get("severity").and_then(|v| v.as_str())
                                == Some("contraindicated")
                    });
                    Ok(!any_contraindicated || response.requires_human_review)
                },
            ),
        );
        registry.add_for(
            AssistantType::MedicationSafety,
            Rule::warning(
                "has_recommended_action",
                "a safety alert lacks a recommended action",
                |response: &AssistantResponse| {
                    Ok(suggestions_of_kind(response, "safety_alert")
                        .all(|s| non_empty_field(&s.content, "recommended_action")))
                },
            ),
        );

        registry.add_for(
            AssistantType::Coding,
            Rule::error(
                "valid_code_format",
                "a suggested billing code does not match its format",
                |response: &AssistantResponse| {
                    let icd = Regex::new(r"^[A-Z]\d{2}(\.\d{1,4})?$").expect("valid pattern");
                    let cpt = Regex::new(r"^\d{5}$").expect("valid pattern");
                    Ok(response.suggestions.iter().all(|s| {
                        let code = s.content.get("code").and_then(|c| c.as_str());
                        match (s.kind.as_str(), code) {
                            ("icd_code", Some(code)) => icd.is_match(code),
                            ("cpt_code", Some(code)) => cpt.is_match(code),
                            ("icd_code" | "cpt_code", None) => false,
                            _ => true,
                        }
                    }))
                },
            ),
        );
        registry.add_for(
            AssistantType::Coding,
            Rule::error(
                "requires_coder_review",
                "coding suggestions always require certified coder review",
                |response: &AssistantResponse| Ok(response.requires_human_review),
            ),
        );

        registry.add_for(
            AssistantType::PatientMessaging,
            Rule::warning(
                "appropriate_tone",
                "message draft contains dismissive phrasing",
                |response: &AssistantResponse| {
                    let text = serialized_content(response)?;
                    Ok(!DISMISSIVE_PHRASES.iter().any(|p| text.contains(p)))
                },
            ),
        );
        registry.add_for(
            AssistantType::PatientMessaging,
            Rule::error(
                "no_medical_advice",
                "message draft gives direct medical advice",
                |response: &AssistantResponse| {
                    let text = serialized_content(response)?;
                    Ok(!MEDICAL_ADVICE_PHRASES.iter().any(|p| text.contains(p)))
                },
            ),
        );
        registry.add_for(
            AssistantType::PatientMessaging,
            Rule::error(
                "escalation_flag_check",
                "message drafts must carry an explicit escalation_required flag",
                |response: &AssistantResponse| {
                    Ok(suggestions_of_kind(response, "message_draft")
                        .all(|s| s.content.get("escalation_required").map(|v| v.is_boolean()).unwrap_or(false)))
                },
            ),
        );
    }

    /// Run the rule registry, then the per-type confidence threshold check
    pub fn validate(&self, response: &AssistantResponse) -> GuardrailResult {
        let mut violations = self.registry.evaluate(response.assistant_type, response).violations;

        let threshold = self.config.confidence_threshold(response.assistant_type);
        for suggestion in &response.suggestions {
            if suggestion.confidence_score < threshold {
                violations.push(
                    GuardrailViolation::warning(
                        "meets_confidence_threshold",
                        format!(
                            "suggestion {} confidence {:.2} is below the {} threshold {:.2}",
                            suggestion.id,
                            suggestion.confidence_score,
                            response.assistant_type,
                            threshold
                        ),
                    )
                    .with_field(suggestion.id.clone()),
                );
            }
        }

        let result = GuardrailResult::from_violations(violations);
        if !result.passed {
            tracing::warn!(
                assistant_type = %response.assistant_type,
                violations = result.violations.len(),
                "output guardrail rejected response"
            );
        }
        result
    }

    /// The orchestration-level human-review decision
    ///
    /// Coding, documentation, and patient messaging are always
    /// review-mandatory. Triage requires review on a critical priority,
    /// medication safety on any allergy, contraindication, or severe
    /// interaction. Any suggestion below its type's confidence threshold
    /// also mandates review.
    pub fn requires_human_review(&self, response: &AssistantResponse) -> bool {
        if response.requires_human_review {
            return true;
        }
        let threshold = self.config.confidence_threshold(response.assistant_type);
        if response
            .suggestions
            .iter()
            .any(|s| s.confidence_score < threshold)
        {
            return true;
        }
        match response.assistant_type {
            AssistantType::Documentation
            | AssistantType::Coding
            | AssistantType::PatientMessaging => true,
            AssistantType::Triage => response.suggestions.iter().any(|s| {
                s.content.get("priority").and_then(|p| p.as_str()) == Some("critical")
            }),
            AssistantType::MedicationSafety => {
                response.suggestions.iter().any(is_severe_safety_suggestion)
            }
        }
    }

    /// Append advisory warnings to low-confidence or high-severity
    /// suggestions without touching their content
    pub fn add_safety_warnings(&self, response: &AssistantResponse) -> AssistantResponse {
        let threshold = self.config.confidence_threshold(response.assistant_type);
        let mut enhanced = response.clone();
        for suggestion in &mut enhanced.suggestions {
            if suggestion.confidence_score < threshold {
                suggestion.warnings.push(format!(
                    "Confidence {:.2} is below the review threshold {:.2}; verify carefully",
                    suggestion.confidence_score, threshold
                ));
            }
            if is_severe_safety_suggestion(suggestion) {
                suggestion
                    .warnings
                    .push("High-severity safety finding; clinician review required".to_string());
            }
        }
        enhanced
    }

    /// Copy of the response keeping only suggestions at or above the
    /// threshold (the type default when none is given)
    ///
    /// Display-only helper; the audit trail always sees the full set.
    pub fn filter_by_confidence(
        &self,
        response: &AssistantResponse,
        threshold: Option<f64>,
    ) -> AssistantResponse {
        let threshold =
            threshold.unwrap_or_else(|| self.config.confidence_threshold(response.assistant_type));
        let mut filtered = response.clone();
        filtered
            .suggestions
            .retain(|s| s.confidence_score >= threshold);
        filtered
    }

    /// Validate (rejecting on any error-severity violation), annotate
    /// warnings, and recompute the review decision
    pub fn validate_and_enhance(&self, response: &AssistantResponse) -> Result<AssistantResponse> {
        let result = self.validate(response);
        if !result.passed {
            return Err(GuardrailError::OutputRejected {
                assistant_type: response.assistant_type,
                violations: result.violations,
            });
        }
        let mut enhanced = self.add_safety_warnings(response);
        enhanced.requires_human_review = self.requires_human_review(&enhanced);
        Ok(enhanced)
    }

    /// Override a per-type confidence threshold
    pub fn set_confidence_threshold(
        &mut self,
        assistant_type: AssistantType,
        threshold: f64,
    ) -> Result<()> {
        self.config.set_confidence_threshold(assistant_type, threshold)
    }

    /// Register a caller-supplied rule for one assistant type
    pub fn add_rule_for(&mut self, assistant_type: AssistantType, rule: Rule<AssistantResponse>) {
        self.registry.add_for(assistant_type, rule);
    }
}

impl Default for OutputGuardrail {
    fn default() -> Self {
        Self::new(GuardrailConfig::default())
    }
}

fn serialized_content(response: &AssistantResponse) -> std::result::Result<String, String> {
    serde_json::to_string(&response.suggestions)
        .map(|s| s.to_lowercase())
        .map_err(|e| e.to_string())
}

fn suggestions_of_kind<'a>(
    response: &'a AssistantResponse,
    kind: &'a str,
) -> impl Iterator<Item = &'a Suggestion> {
    response.suggestions.iter().filter(move |s| s.kind == kind)
}

fn non_empty_field(content: &Value, field: &str) -> bool {
    content
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

fn is_severe_safety_suggestion(suggestion: &Suggestion) -> bool {
    let alert_type = suggestion.content.get("alert_type").and_then(|v| v.as_str());
    let severity = suggestion.content.get("severity").and_then(|v| v.as_str());
    matches!(alert_type, Some("allergy") | Some("contraindication"))
        || matches!(severity, Some("contraindicated") | Some("major"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_types::ResponseMetadata;
    use chrono::Utc;
    use serde_json::json;

    fn response(
        assistant_type: AssistantType,
        suggestions: Vec<Suggestion>,
        requires_human_review: bool,
    ) -> AssistantResponse {
        AssistantResponse {
            request_id: "req-1".into(),
            assistant_type,
            suggestions,
            metadata: ResponseMetadata {
                model_version: "model-v1".into(),
                prompt_template_id: "prompt-v1".into(),
                processing_time_ms: 42,
                phi_minimized: true,
            },
            requires_human_review,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_suggestions_rejected() {
        let r = response(AssistantType::Documentation, vec![], true);
        let result = OutputGuardrail::default().validate(&r);
        assert!(!result.passed);
        assert!(result.violations.iter().any(|v| v.rule == "has_suggestions"));
    }

    #[test]
    fn test_out_of_range_confidence_is_hard_block() {
        let suggestion = Suggestion {
            confidence_score: 1.5,
            ..Suggestion::new("soap_note", json!({"plan": "rest"}), 0.9)
        };
        let r = response(AssistantType::Documentation, vec![suggestion], true);

        let guardrail = OutputGuardrail::default();
        let result = guardrail.validate(&r);
        assert!(!result.passed);
        assert!(result
            .violations
            .iter()
            .any(|v| v.rule == "valid_confidence_scores"));
        assert!(guardrail.validate_and_enhance(&r).is_err());
    }

    #[test]
    fn test_diagnostic_claims_rejected() {
        let suggestion = Suggestion::new(
            "message_draft",
            json!({"body": "You have diabetes.", "escalation_required": false}),
            0.9,
        );
        let r = response(AssistantType::PatientMessaging, vec![suggestion], true);
        let result = OutputGuardrail::default().validate(&r);
        assert!(!result.passed);
        assert!(result
            .violations
            .iter()
            .any(|v| v.rule == "no_diagnostic_claims"));
    }

    #[test]
    fn test_icd_code_format() {
        let guardrail = OutputGuardrail::default();

        // Letter, two digits, optional dotted extension
        let valid = Suggestion::new(
            "icd_code",
            json!({"code": "E11.9", "description": "x", "category": "y"}),
            0.9,
        );
        let r = response(AssistantType::Coding, vec![valid], true);
        assert!(guardrail.validate(&r).passed);

        // A fourth character only ever follows a dot
        let undotted = Suggestion::new(
            "icd_code",
            json!({"code": "E119", "description": "x", "category": "y"}),
            0.9,
        );
        let r = response(AssistantType::Coding, vec![undotted], true);
        let result = guardrail.validate(&r);
        assert!(!result.passed);
        assert!(result.violations.iter().any(|v| v.rule == "valid_code_format"));

        // Too many digits after the dot
        let invalid = Suggestion::new(
            "icd_code",
            json!({"code": "E11.999999", "description": "x", "category": "y"}),
            0.9,
        );
        let r = response(AssistantType::Coding, vec![invalid], true);
        let result = guardrail.validate(&r);
        assert!(!result.passed);
        assert!(result.violations.iter().any(|v| v.rule == "valid_code_format"));
    }

    #[test]
    fn test_coding_always_requires_review() {
        let suggestion = Suggestion::new(
            "cpt_code",
            json!({"code": "99213", "description": "office visit", "category": "E&M"}),
            0.9,
        );
        let guardrail = OutputGuardrail::default();

        let without_review = response(AssistantType::Coding, vec![suggestion.clone()], false);
        assert!(!guardrail.validate(&without_review).passed);
        assert!(guardrail.requires_human_review(&without_review));

        let with_review = response(AssistantType::Coding, vec![suggestion], true);
        assert!(guardrail.validate(&with_review).passed);
    }

    #[test]
    fn test_critical_triage_forces_review() {
        let suggestion = Suggestion::new(
            "triage_assessment",
            json!({"priority": "critical", "recommended_action": "immediate evaluation"}),
            0.95,
        );
        let guardrail = OutputGuardrail::default();

        let unflagged = response(AssistantType::Triage, vec![suggestion.clone()], false);
        let result = guardrail.validate(&unflagged);
        assert!(!result.passed);
        assert!(result
            .violations
            .iter()
            .any(|v| v.rule == "critical_requires_immediate_review"));
        assert!(guardrail.requires_human_review(&unflagged));
    }

    #[test]
    fn test_non_urgent_triage_skips_review() {
        let suggestion = Suggestion::new(
            "triage_assessment",
            json!({"priority": "non_urgent", "recommended_action": "routine appointment"}),
            0.92,
        );
        let guardrail = OutputGuardrail::default();
        let r = response(AssistantType::Triage, vec![suggestion], false);
        assert!(guardrail.validate(&r).passed);
        assert!(!guardrail.requires_human_review(&r));
    }

    #[test]
    fn test_low_confidence_warns_and_mandates_review() {
        let suggestion = Suggestion::new(
            "triage_assessment",
            json!({"priority": "urgent", "recommended_action": "see within the hour"}),
            0.55,
        );
        let guardrail = OutputGuardrail::default();
        let r = response(AssistantType::Triage, vec![suggestion], false);

        let result = guardrail.validate(&r);
        assert!(result.passed);
        assert!(result
            .violations
            .iter()
            .any(|v| v.rule == "meets_confidence_threshold"));
        assert!(guardrail.requires_human_review(&r));

        let enhanced = guardrail.add_safety_warnings(&r);
        assert!(!enhanced.suggestions[0].warnings.is_empty());
    }

    #[test]
    fn test_filter_by_confidence() {
        let high = Suggestion::new(
            "triage_assessment",
            json!({"priority": "urgent", "recommended_action": "x"}),
            0.9,
        );
        let low = Suggestion::new(
            "triage_assessment",
            json!({"priority": "urgent", "recommended_action": "x"}),
            0.5,
        );
        let guardrail = OutputGuardrail::default();
        let r = response(AssistantType::Triage, vec![high, low], true);

        let filtered = guardrail.filter_by_confidence(&r, None);
        assert_eq!(filtered.suggestions.len(), 1);

        let all = guardrail.filter_by_confidence(&r, Some(0.0));
        assert_eq!(all.suggestions.len(), 2);
    }

    #[test]
    fn test_message_draft_needs_escalation_flag() {
        let missing_flag = Suggestion::new(
            "message_draft",
            json!({"body": "Thanks for reaching out; a nurse will follow up.", "tone": "warm"}),
            0.9,
        );
        let guardrail = OutputGuardrail::default();
        let r = response(AssistantType::PatientMessaging, vec![missing_flag], true);
        let result = guardrail.validate(&r);
        assert!(!result.passed);
        assert!(result
            .violations
            .iter()
            .any(|v| v.rule == "escalation_flag_check"));
    }

    #[test]
    fn test_validate_and_enhance_recomputes_review() {
        let suggestion = Suggestion::new(
            "soap_note",
            json!({"subjective": "cough", "objective": "", "assessment": "", "plan": ""}),
            0.95,
        );
        let guardrail = OutputGuardrail::default();
        // Documentation is always review-mandatory even when the model
        // did not flag it
        let r = response(AssistantType::Documentation, vec![suggestion], false);
        let enhanced = guardrail.validate_and_enhance(&r).unwrap();
        assert!(enhanced.requires_human_review);
    }

    #[test]
    fn test_threshold_override_changes_warning() {
        let suggestion = Suggestion::new(
            "triage_assessment",
            json!({"priority": "urgent", "recommended_action": "x"}),
            0.75,
        );
        let mut guardrail = OutputGuardrail::default();
        let r = response(AssistantType::Triage, vec![suggestion], false);

        assert!(guardrail
            .validate(&r)
            .violations
            .iter()
            .any(|v| v.rule == "meets_confidence_threshold"));

        guardrail
            .set_confidence_threshold(AssistantType::Triage, 0.7)
            .unwrap();
        assert!(guardrail.validate(&r).violations.is_empty());
    }
}
