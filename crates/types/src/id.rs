//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a workflow definition
///
/// Definition ids are human-chosen slugs (e.g. `encounter-documentation-v1`)
/// so templates can be referenced stably across versions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowDefinitionId(String);

impl WorkflowDefinitionId {
    /// Create a definition id from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkflowDefinitionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Unique identifier for a workflow execution
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generate a fresh random execution id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create an execution id from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique() {
        let a = ExecutionId::generate();
        let b = ExecutionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_prefix() {
        let id = ExecutionId::new("abcdefghij");
        assert_eq!(id.short(), "abcdefgh");

        let tiny = ExecutionId::new("ab");
        assert_eq!(tiny.short(), "ab");
    }

    #[test]
    fn test_definition_id_display() {
        let id = WorkflowDefinitionId::new("lab-result-triage-v1");
        assert_eq!(id.to_string(), "lab-result-triage-v1");
    }
}
