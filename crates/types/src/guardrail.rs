//! Guardrail verdicts and redaction records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Rule severity. Only `Error` violations block; warnings annotate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

/// One rule violation recorded during validation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuardrailViolation {
    /// Name of the rule that fired
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl GuardrailViolation {
    pub fn error(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity: ViolationSeverity::Error,
            message: message.into(),
            field: None,
        }
    }

    pub fn warning(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity: ViolationSeverity::Warning,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Outcome of a validation pass
///
/// `passed` is true iff no violation carries error severity; warnings never
/// block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<GuardrailViolation>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl GuardrailResult {
    /// Build a result from collected violations, deriving `passed`
    pub fn from_violations(violations: Vec<GuardrailViolation>) -> Self {
        let passed = !violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);
        Self {
            passed,
            violations,
            metadata: HashMap::new(),
        }
    }

    /// A clean pass with no violations
    pub fn passing() -> Self {
        Self::from_violations(Vec::new())
    }

    /// Violations at error severity only
    pub fn errors(&self) -> impl Iterator<Item = &GuardrailViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
    }

    /// Violations at warning severity only
    pub fn warnings(&self) -> impl Iterator<Item = &GuardrailViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Warning)
    }
}

/// Categories of protected health information the redactor detects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhiType {
    Ssn,
    Mrn,
    Phone,
    Email,
    Date,
}

impl PhiType {
    /// Placeholder token prefix, e.g. `SSN` in `[SSN_1]`
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Self::Ssn => "SSN",
            Self::Mrn => "MRN",
            Self::Phone => "PHONE",
            Self::Email => "EMAIL",
            Self::Date => "DATE",
        }
    }
}

impl fmt::Display for PhiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token_prefix())
    }
}

/// One redacted span: what was found, what replaced it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedactedField {
    pub phi_type: PhiType,
    pub original: String,
    pub token: String,
}

/// Result of redacting a text fragment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhiRedaction {
    pub redacted_text: String,
    pub phi_detected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redacted_fields: Vec<RedactedField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passed_derivation() {
        let warnings_only = GuardrailResult::from_violations(vec![GuardrailViolation::warning(
            "valid_vitals",
            "temperature outside typical range",
        )]);
        assert!(warnings_only.passed);
        assert_eq!(warnings_only.warnings().count(), 1);
        assert_eq!(warnings_only.errors().count(), 0);

        let with_error = GuardrailResult::from_violations(vec![
            GuardrailViolation::warning("valid_vitals", "odd heart rate"),
            GuardrailViolation::error("no_null_input", "input is null"),
        ]);
        assert!(!with_error.passed);
        assert_eq!(with_error.errors().count(), 1);
    }

    #[test]
    fn test_empty_result_passes() {
        assert!(GuardrailResult::passing().passed);
    }

    #[test]
    fn test_token_prefixes() {
        assert_eq!(PhiType::Ssn.token_prefix(), "SSN");
        assert_eq!(PhiType::Email.to_string(), "EMAIL");
    }
}
