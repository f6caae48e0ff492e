//! PHI detection and redaction
//!
//! Detectors run sequentially in a fixed order (SSN, MRN, phone, email,
//! date). Each match is replaced with a positional placeholder token such as
//! `[SSN_1]`, and the original span is recorded for the audit trail.
//! Placeholder tokens themselves never match a detector, so redaction is
//! idempotent.

use careflow_types::{PhiRedaction, PhiType, RedactedField};
use regex::Regex;

/// Regex-based PHI redactor
pub struct PhiRedactor {
    detectors: Vec<(PhiType, Regex)>,
}

impl PhiRedactor {
    pub fn new() -> Self {
        let patterns: [(PhiType, &str); 5] = [
            (PhiType::Ssn, r"\b\d{3}-\d{2}-\d{4}\b"),
            (PhiType::Mrn, r"(?i)\bMRN[:#\s]*\d{6,10}\b"),
            (PhiType::Phone, r"\b\(?\d{3}\)?[-.\s]\d{3}[-.\s]?\d{4}\b"),
            (
                PhiType::Email,
                r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            ),
            (
                PhiType::Date,
                r"\b(0?[1-9]|1[0-2])[/-](0?[1-9]|[12]\d|3[01])[/-]\d{4}\b",
            ),
        ];
        let detectors = patterns
            .into_iter()
            .map(|(phi_type, pattern)| {
                // Hard-coded patterns; compilation cannot fail at runtime
                (phi_type, Regex::new(pattern).expect("valid PHI pattern"))
            })
            .collect();
        Self { detectors }
    }

    /// Redact all detected PHI from a text fragment
    pub fn redact(&self, text: &str) -> PhiRedaction {
        let mut redacted = text.to_string();
        let mut redacted_fields = Vec::new();

        for (phi_type, regex) in &self.detectors {
            let mut counter = 0usize;
            redacted = regex
                .replace_all(&redacted, |caps: &regex::Captures<'_>| {
                    counter += 1;
                    let token = format!("[{}_{}]", phi_type.token_prefix(), counter);
                    redacted_fields.push(RedactedField {
                        phi_type: *phi_type,
                        original: caps[0].to_string(),
                        token: token.clone(),
                    });
                    token
                })
                .into_owned();
        }

        PhiRedaction {
            redacted_text: redacted,
            phi_detected: !redacted_fields.is_empty(),
            redacted_fields,
        }
    }
}

impl Default for PhiRedactor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssn_redaction() {
        let redactor = PhiRedactor::new();
        let result = redactor.redact("Patient SSN is 123-45-6789, confirmed.");
        assert_eq!(result.redacted_text, "Patient SSN is [SSN_1], confirmed.");
        assert!(result.phi_detected);
        assert_eq!(result.redacted_fields[0].original, "123-45-6789");
        assert_eq!(result.redacted_fields[0].phi_type, PhiType::Ssn);
    }

    #[test]
    fn test_positional_tokens_count_per_type() {
        let redactor = PhiRedactor::new();
        let result = redactor.redact("Contact a@b.com or c@d.org");
        assert_eq!(result.redacted_text, "Contact [EMAIL_1] or [EMAIL_2]");
        assert_eq!(result.redacted_fields.len(), 2);
    }

    #[test]
    fn test_mrn_label_required() {
        let redactor = PhiRedactor::new();
        let result = redactor.redact("MRN: 12345678 on file");
        assert!(result.redacted_text.contains("[MRN_1]"));

        // A bare number without the label is not an MRN match
        let result = redactor.redact("value 12345678 recorded");
        assert!(!result
            .redacted_fields
            .iter()
            .any(|f| f.phi_type == PhiType::Mrn));
    }

    #[test]
    fn test_phone_and_date() {
        let redactor = PhiRedactor::new();
        let result = redactor.redact("Call (555) 123-4567 before 03/14/2026.");
        assert!(result.redacted_text.contains("[PHONE_1]"));
        assert!(result.redacted_text.contains("[DATE_1]"));
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let redactor = PhiRedactor::new();
        let first = redactor.redact("SSN 123-45-6789, email a@b.com, DOB 01/02/1980");
        let second = redactor.redact(&first.redacted_text);
        assert!(!second.phi_detected);
        assert_eq!(second.redacted_text, first.redacted_text);
    }

    #[test]
    fn test_clean_text_untouched() {
        let redactor = PhiRedactor::new();
        let result = redactor.redact("Chief complaint: persistent cough for two weeks");
        assert!(!result.phi_detected);
        assert_eq!(
            result.redacted_text,
            "Chief complaint: persistent cough for two weeks"
        );
    }
}
