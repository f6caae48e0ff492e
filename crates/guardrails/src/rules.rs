//! Two-tier rule registry
//!
//! Rules are plain named predicates. The registry keeps two lookup tiers:
//! universal rules that apply to every assistant type, and per-type rule
//! sets. Evaluation order is universal first, then type-specific, in
//! registration order.

use careflow_types::{AssistantType, GuardrailResult, GuardrailViolation, ViolationSeverity};
use std::collections::HashMap;

/// Outcome of one predicate call: `Ok(true)` passes, `Ok(false)` records
/// the rule's violation, `Err` records an error-severity violation with the
/// predicate's own message
pub type PredicateResult = std::result::Result<bool, String>;

/// A named validation rule over `T`
pub struct Rule<T> {
    name: String,
    severity: ViolationSeverity,
    message: String,
    predicate: Box<dyn Fn(&T) -> PredicateResult + Send + Sync>,
}

impl<T> Rule<T> {
    pub fn new(
        name: impl Into<String>,
        severity: ViolationSeverity,
        message: impl Into<String>,
        predicate: impl Fn(&T) -> PredicateResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            severity,
            message: message.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Error-severity rule
    pub fn error(
        name: impl Into<String>,
        message: impl Into<String>,
        predicate: impl Fn(&T) -> PredicateResult + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, ViolationSeverity::Error, message, predicate)
    }

    /// Warning-severity rule
    pub fn warning(
        name: impl Into<String>,
        message: impl Into<String>,
        predicate: impl Fn(&T) -> PredicateResult + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, ViolationSeverity::Warning, message, predicate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn severity(&self) -> ViolationSeverity {
        self.severity
    }

    /// Run the predicate; a predicate error is itself a violation, at error
    /// severity, so validation never crashes the caller
    pub fn check(&self, subject: &T) -> Option<GuardrailViolation> {
        match (self.predicate)(subject) {
            Ok(true) => None,
            Ok(false) => Some(GuardrailViolation {
                rule: self.name.clone(),
                severity: self.severity,
                message: self.message.clone(),
                field: None,
            }),
            Err(err) => Some(GuardrailViolation {
                rule: self.name.clone(),
                severity: ViolationSeverity::Error,
                message: format!("rule evaluation failed: {err}"),
                field: None,
            }),
        }
    }
}

impl<T> std::fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

/// Registry of universal and per-assistant-type rules
#[derive(Debug, Default)]
pub struct RuleRegistry<T> {
    universal: Vec<Rule<T>>,
    by_type: HashMap<AssistantType, Vec<Rule<T>>>,
}

impl<T> RuleRegistry<T> {
    pub fn new() -> Self {
        Self {
            universal: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// Register a rule applied to every assistant type
    pub fn add_universal(&mut self, rule: Rule<T>) {
        self.universal.push(rule);
    }

    /// Register a rule applied only to one assistant type
    pub fn add_for(&mut self, assistant_type: AssistantType, rule: Rule<T>) {
        self.by_type.entry(assistant_type).or_default().push(rule);
    }

    /// All rules applicable to an assistant type, universal tier first
    pub fn rules_for(&self, assistant_type: AssistantType) -> impl Iterator<Item = &Rule<T>> {
        self.universal.iter().chain(
            self.by_type
                .get(&assistant_type)
                .map(|rules| rules.as_slice())
                .unwrap_or(&[])
                .iter(),
        )
    }

    /// Run every applicable rule and collect the verdict
    pub fn evaluate(&self, assistant_type: AssistantType, subject: &T) -> GuardrailResult {
        let violations: Vec<GuardrailViolation> = self
            .rules_for(assistant_type)
            .filter_map(|rule| rule.check(subject))
            .collect();
        GuardrailResult::from_violations(violations)
    }

    /// Number of rules that would run for an assistant type
    pub fn rule_count(&self, assistant_type: AssistantType) -> usize {
        self.universal.len()
            + self
                .by_type
                .get(&assistant_type)
                .map(|r| r.len())
                .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_tier_lookup() {
        let mut registry: RuleRegistry<i64> = RuleRegistry::new();
        registry.add_universal(Rule::error("non_negative", "value is negative", |v| {
            Ok(*v >= 0)
        }));
        registry.add_for(
            AssistantType::Triage,
            Rule::warning("small", "value is large", |v| Ok(*v < 100)),
        );

        assert_eq!(registry.rule_count(AssistantType::Triage), 2);
        assert_eq!(registry.rule_count(AssistantType::Coding), 1);

        let result = registry.evaluate(AssistantType::Triage, &150);
        assert!(result.passed);
        assert_eq!(result.warnings().count(), 1);

        let result = registry.evaluate(AssistantType::Triage, &-1);
        assert!(!result.passed);
    }

    #[test]
    fn test_predicate_error_becomes_error_violation() {
        let mut registry: RuleRegistry<i64> = RuleRegistry::new();
        registry.add_universal(Rule::warning("explodes", "unused", |_| {
            Err("boom".to_string())
        }));

        let result = registry.evaluate(AssistantType::Documentation, &1);
        assert!(!result.passed);
        let violation = &result.violations[0];
        assert_eq!(violation.rule, "explodes");
        assert_eq!(violation.severity, ViolationSeverity::Error);
        assert!(violation.message.contains("boom"));
    }

    #[test]
    fn test_universal_tier_runs_first() {
        let mut registry: RuleRegistry<i64> = RuleRegistry::new();
        registry.add_for(
            AssistantType::Coding,
            Rule::error("typed", "typed rule", |_| Ok(false)),
        );
        registry.add_universal(Rule::error("universal", "universal rule", |_| Ok(false)));

        let result = registry.evaluate(AssistantType::Coding, &0);
        assert_eq!(result.violations[0].rule, "universal");
        assert_eq!(result.violations[1].rule, "typed");
    }
}
